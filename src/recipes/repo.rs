use async_trait::async_trait;
use sqlx::PgPool;

use crate::recipes::repo_types::{NewRecipe, RecipeRow};
use crate::store::StoreError;

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    /// Every recipe, oldest first.
    async fn list_all(&self) -> Result<Vec<RecipeRow>, StoreError>;
    async fn create(&self, new: NewRecipe) -> Result<RecipeRow, StoreError>;
}

#[derive(Clone)]
pub struct PgRecipeRepo {
    db: PgPool,
}

impl PgRecipeRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipeRepo for PgRecipeRepo {
    async fn list_all(&self) -> Result<Vec<RecipeRow>, StoreError> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT r.id, r.title, r.instructions, r.minutes_to_complete, r.user_id, r.created_at,
                   u.username, u.bio, u.image_url
              FROM recipes r
              JOIN users u ON u.id = r.user_id
             ORDER BY r.id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, new: NewRecipe) -> Result<RecipeRow, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            WITH inserted AS (
                INSERT INTO recipes (title, instructions, minutes_to_complete, user_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title, instructions, minutes_to_complete, user_id, created_at
            )
            SELECT i.id, i.title, i.instructions, i.minutes_to_complete, i.user_id, i.created_at,
                   u.username, u.bio, u.image_url
              FROM inserted i
              JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(&new.title)
        .bind(&new.instructions)
        .bind(new.minutes_to_complete)
        .bind(new.user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{PgUserRepo, UserRepo};
    use crate::auth::repo_types::NewUser;
    use crate::store::test_pool;

    #[tokio::test]
    async fn created_recipes_come_back_joined_with_owner() {
        let Some(pool) = test_pool().await else { return };
        let owner = PgUserRepo::new(pool.clone())
            .create(NewUser {
                username: format!("cook_{}", rand::random::<u32>()),
                password_hash: "$argon2id$stub".into(),
                bio: Some("weekend baker".into()),
                image_url: Some(String::new()),
            })
            .await
            .unwrap();
        let repo = PgRecipeRepo::new(pool);

        let first = repo
            .create(NewRecipe {
                title: "Bread".into(),
                instructions: "Knead and bake".into(),
                minutes_to_complete: Some(90),
                user_id: owner.id,
            })
            .await
            .unwrap();
        let second = repo
            .create(NewRecipe {
                title: "Butter".into(),
                instructions: "Churn".into(),
                minutes_to_complete: None,
                user_id: owner.id,
            })
            .await
            .unwrap();
        assert_eq!(first.username, owner.username);
        assert_eq!(first.bio.as_deref(), Some("weekend baker"));
        assert!(second.id > first.id);

        let listed: Vec<RecipeRow> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.user_id == owner.id)
            .collect();
        let titles: Vec<&str> = listed.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Bread", "Butter"]);
        assert_eq!(listed[1].minutes_to_complete, None);
    }
}
