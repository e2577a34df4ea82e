//! Process-local store used when no `DATABASE_URL` is configured, and by the
//! router tests. Mirrors the Postgres schema: serial ids, a unique username and
//! recipes that must reference an existing user.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::StoreError;
use crate::auth::{
    repo::UserRepo,
    repo_types::{NewUser, User},
};
use crate::recipes::{
    repo::RecipeRepo,
    repo_types::{NewRecipe, RecipeRow},
};

struct StoredRecipe {
    id: i64,
    title: String,
    instructions: String,
    minutes_to_complete: Option<i32>,
    user_id: i64,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    recipes: Vec<StoredRecipe>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("in-memory store lock poisoned")))
    }
}

fn joined(recipe: &StoredRecipe, owner: &User) -> RecipeRow {
    RecipeRow {
        id: recipe.id,
        title: recipe.title.clone(),
        instructions: recipe.instructions.clone(),
        minutes_to_complete: recipe.minutes_to_complete,
        user_id: recipe.user_id,
        created_at: recipe.created_at,
        username: owner.username.clone(),
        bio: owner.bio.clone(),
        image_url: owner.image_url.clone(),
    }
}

#[async_trait]
impl UserRepo for InMemoryStore {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut t = self.lock()?;
        if t.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: t.users.len() as i64 + 1,
            username: new.username,
            password_hash: new.password_hash,
            bio: new.bio,
            image_url: new.image_url,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl RecipeRepo for InMemoryStore {
    async fn list_all(&self) -> Result<Vec<RecipeRow>, StoreError> {
        let t = self.lock()?;
        t.recipes
            .iter()
            .map(|r| -> Result<RecipeRow, StoreError> {
                let owner = t
                    .users
                    .iter()
                    .find(|u| u.id == r.user_id)
                    .ok_or_else(|| anyhow::anyhow!("recipe {} has no owner", r.id))?;
                Ok(joined(r, owner))
            })
            .collect()
    }

    async fn create(&self, new: NewRecipe) -> Result<RecipeRow, StoreError> {
        let mut t = self.lock()?;
        let Some(owner) = t.users.iter().find(|u| u.id == new.user_id).cloned() else {
            return Err(anyhow::anyhow!("user {} does not exist", new.user_id).into());
        };
        let recipe = StoredRecipe {
            id: t.recipes.len() as i64 + 1,
            title: new.title,
            instructions: new.instructions,
            minutes_to_complete: new.minutes_to_complete,
            user_id: new.user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        let row = joined(&recipe, &owner);
        t.recipes.push(recipe);
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.into(),
            password_hash: "$argon2id$fake".into(),
            bio: None,
            image_url: None,
        }
    }

    fn new_recipe(title: &str, user_id: i64) -> NewRecipe {
        NewRecipe {
            title: title.into(),
            instructions: "do it".into(),
            minutes_to_complete: Some(5),
            user_id,
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_and_is_not_stored() {
        let store = InMemoryStore::new();
        let alice = UserRepo::create(&store, new_user("alice")).await.unwrap();
        assert_eq!(alice.id, 1);

        let err = UserRepo::create(&store, new_user("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let bob = UserRepo::create(&store, new_user("bob")).await.unwrap();
        assert_eq!(bob.id, 2);
        assert_eq!(store.find_by_username("alice").await.unwrap().unwrap().id, 1);
        assert!(store.find_by_id(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recipes_list_in_creation_order_with_owner() {
        let store = InMemoryStore::new();
        let alice = UserRepo::create(&store, new_user("alice")).await.unwrap();
        let bob = UserRepo::create(&store, new_user("bob")).await.unwrap();

        RecipeRepo::create(&store, new_recipe("Toast", alice.id)).await.unwrap();
        RecipeRepo::create(&store, new_recipe("Eggs", bob.id)).await.unwrap();
        RecipeRepo::create(&store, new_recipe("Tea", alice.id)).await.unwrap();

        let rows = store.list_all().await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Toast", "Eggs", "Tea"]);
        assert_eq!(rows[1].username, "bob");
        assert_eq!(rows[2].user_id, alice.id);
    }

    #[tokio::test]
    async fn recipe_for_unknown_user_is_rejected() {
        let store = InMemoryStore::new();
        let err = RecipeRepo::create(&store, new_recipe("Toast", 42)).await.unwrap_err();
        assert!(matches!(err, StoreError::Other(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
