pub mod memory;
pub mod sessions;

use thiserror::Error;

/// Failures surfaced by the user and recipe repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique column already holds the value.
    #[error("unique constraint violated")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            StoreError::Conflict
        } else {
            StoreError::Database(err)
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Pool for the Postgres-backed tests, migrated. `None` when `DATABASE_URL`
/// is unset, in which case those tests return early.
#[cfg(test)]
pub(crate) async fn test_pool() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty())?;
    let cfg = crate::config::AppConfig::for_tests();
    Some(crate::db::connect(&cfg, &url).await.expect("connect test database"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};

    #[derive(Debug)]
    struct FakeDbError {
        unique: bool,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("fake database error")
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(if self.unique { "23505" } else { "23503" }))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::ForeignKeyViolation
            }
        }
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = sqlx::Error::Database(Box::new(FakeDbError { unique: true }));
        assert!(is_unique_violation(&err));
        assert!(matches!(StoreError::from(err), StoreError::Conflict));
    }

    #[test]
    fn other_database_errors_stay_generic() {
        let err = sqlx::Error::Database(Box::new(FakeDbError { unique: false }));
        assert!(!is_unique_violation(&err));
        assert!(matches!(StoreError::from(err), StoreError::Database(_)));

        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
