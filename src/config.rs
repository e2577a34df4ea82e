use anyhow::Context;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
    pub secure_cookie: bool,
    /// How often expired rows are purged from the Postgres session table.
    pub cleanup_interval_secs: u64,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
    pub password: PasswordConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = PasswordConfig::default();
        let session = SessionConfig {
            ttl_minutes: session_ttl(parse_or(&get, "SESSION_TTL_MINUTES", 60 * 24)?)?,
            secure_cookie: parse_or(&get, "SESSION_COOKIE_SECURE", false)?,
            cleanup_interval_secs: parse_or(&get, "SESSION_CLEANUP_INTERVAL_SECS", 60)?,
        };
        anyhow::ensure!(
            session.cleanup_interval_secs > 0,
            "invalid value for SESSION_CLEANUP_INTERVAL_SECS: must be at least 1"
        );
        let password = PasswordConfig {
            memory_kib: parse_or(&get, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&get, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&get, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };
        Ok(Self {
            database_url: get("DATABASE_URL").filter(|v| !v.is_empty()),
            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: get("APP_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port: parse_or(&get, "APP_PORT", 5555)?,
            session,
            password,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            session: SessionConfig {
                ttl_minutes: 5,
                secure_cookie: false,
                cleanup_interval_secs: 60,
            },
            // cheapest parameters argon2 accepts, keeps the router tests fast
            password: PasswordConfig {
                memory_kib: argon2::Params::MIN_M_COST,
                iterations: 1,
                parallelism: 1,
            },
        }
    }
}

/// Session lifetime must be positive and representable as `time::Duration`
/// seconds, which `Duration::minutes` would otherwise panic on.
fn session_ttl(minutes: i64) -> anyhow::Result<i64> {
    anyhow::ensure!(
        minutes >= 1,
        "invalid value for SESSION_TTL_MINUTES: {minutes} (must be at least 1)"
    );
    anyhow::ensure!(
        minutes.checked_mul(60).is_some(),
        "invalid value for SESSION_TTL_MINUTES: {minutes} (too large)"
    );
    Ok(minutes)
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
