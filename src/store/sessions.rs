use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tower_sessions::{
    session::{Id, Record},
    session_store, SessionStore,
};

/// Session records kept in the `sessions` table, so logins survive restarts
/// and are shared between instances behind the same database.
///
/// | column      | type        |                                   |
/// |-------------|-------------|-----------------------------------|
/// | id          | TEXT (PK)   | session id as rendered in the cookie |
/// | data        | BYTEA       | JSON-encoded session map          |
/// | expiry_date | TIMESTAMPTZ | rows past this are never loaded   |
#[derive(Clone, Debug)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Remove every expired row, returning how many went.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM sessions WHERE expiry_date < now()")
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected())
    }

    /// Purge expired rows every `period` until the runtime shuts down.
    pub fn spawn_cleanup(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            loop {
                ticks.tick().await;
                match store.delete_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!(deleted = n, "expired sessions removed"),
                    Err(e) => tracing::warn!(error = %e, "expired session cleanup failed"),
                }
            }
        })
    }
}

fn backend(err: sqlx::Error) -> session_store::Error {
    session_store::Error::Backend(err.to_string())
}

fn encode(record: &Record) -> session_store::Result<Vec<u8>> {
    serde_json::to_vec(&record.data).map_err(|e| session_store::Error::Encode(e.to_string()))
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let data = encode(record)?;
        // a colliding id is regenerated rather than overwriting someone else's row
        loop {
            let inserted = sqlx::query(
                r#"
                INSERT INTO sessions (id, data, expiry_date)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(record.id.to_string())
            .bind(&data)
            .bind(record.expiry_date)
            .execute(&self.db)
            .await
            .map_err(backend)?;

            if inserted.rows_affected() == 1 {
                return Ok(());
            }
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expiry_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
               SET data = EXCLUDED.data,
                   expiry_date = EXCLUDED.expiry_date
            "#,
        )
        .bind(record.id.to_string())
        .bind(encode(record)?)
        .bind(record.expiry_date)
        .execute(&self.db)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let row: Option<(Vec<u8>, OffsetDateTime)> = sqlx::query_as(
            r#"
            SELECT data, expiry_date
              FROM sessions
             WHERE id = $1 AND expiry_date > now()
            "#,
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;

        let Some((data, expiry_date)) = row else {
            return Ok(None);
        };
        let data: HashMap<String, serde_json::Value> =
            serde_json::from_slice(&data).map_err(|e| session_store::Error::Decode(e.to_string()))?;
        Ok(Some(Record {
            id: *session_id,
            data,
            expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id.to_string())
            .execute(&self.db)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_pool;

    fn record(expiry_date: OffsetDateTime) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::from([("user_id".to_string(), serde_json::json!(7))]),
            expiry_date,
        }
    }

    #[tokio::test]
    async fn saved_session_loads_until_deleted() {
        let Some(pool) = test_pool().await else { return };
        let store = PgSessionStore::new(pool);

        let mut rec = record(OffsetDateTime::now_utc() + time::Duration::minutes(5));
        store.create(&mut rec).await.unwrap();

        let loaded = store.load(&rec.id).await.unwrap().expect("session row");
        assert_eq!(loaded.data["user_id"], 7);

        rec.data.insert("theme".into(), serde_json::json!("dark"));
        store.save(&rec).await.unwrap();
        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.data["theme"], "dark");

        store.delete(&rec.id).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_hidden_and_purged() {
        let Some(pool) = test_pool().await else { return };
        let store = PgSessionStore::new(pool.clone());

        let rec = record(OffsetDateTime::now_utc() - time::Duration::minutes(1));
        store.save(&rec).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().is_none());

        assert!(store.delete_expired().await.unwrap() >= 1);
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE id = $1")
            .bind(rec.id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }
}
