use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};
use crate::store::StoreError;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user. A taken username yields `StoreError::Conflict`.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tx = self.db.begin().await?;
        // a unique violation drops `tx` uncommitted, which rolls it back
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, bio, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, bio, image_url
            "#,
        )
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.bio)
        .bind(&new.image_url)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, bio, image_url
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, bio, image_url
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_pool;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$stub".into(),
            bio: Some(String::new()),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict_and_leaves_one_row() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgUserRepo::new(pool.clone());
        let username = format!("dup_{}", rand::random::<u32>());

        let first = repo.create(new_user(&username)).await.unwrap();
        let err = repo.create(new_user(&username)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict), "{err:?}");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1")
            .bind(&username)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let found = repo.find_by_username(&username).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.password_hash, "$argon2id$stub");
        assert_eq!(repo.find_by_id(first.id).await.unwrap().unwrap().username, username);
    }

    #[tokio::test]
    async fn missing_users_are_none() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgUserRepo::new(pool);
        assert!(repo.find_by_username("no-such-user-anywhere").await.unwrap().is_none());
        assert!(repo.find_by_id(-1).await.unwrap().is_none());
    }
}
