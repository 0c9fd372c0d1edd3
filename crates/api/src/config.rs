use homestead_core::leaderboard::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Upper bound on any single store call in seconds (default: `5`).
    pub store_timeout_secs: u64,
    /// Leaderboard size when the client does not ask for one (default: `10`).
    pub leaderboard_default_limit: i64,
    /// Largest leaderboard a client may request (default: `100`).
    pub leaderboard_max_limit: i64,
    /// Interval between stats reconciliation runs in seconds (default: `3600`).
    pub reconcile_interval_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                       |
    /// | `STORE_TIMEOUT_SECS`        | `5`                        |
    /// | `LEADERBOARD_DEFAULT_LIMIT` | `10`                       |
    /// | `LEADERBOARD_MAX_LIMIT`     | `100`                      |
    /// | `RECONCILE_INTERVAL_SECS`   | `3600`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let store_timeout_secs: u64 = std::env::var("STORE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("STORE_TIMEOUT_SECS must be a valid u64");

        let leaderboard_default_limit: i64 = std::env::var("LEADERBOARD_DEFAULT_LIMIT")
            .map(|v| v.parse().expect("LEADERBOARD_DEFAULT_LIMIT must be a valid i64"))
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT);

        let leaderboard_max_limit: i64 = std::env::var("LEADERBOARD_MAX_LIMIT")
            .map(|v| v.parse().expect("LEADERBOARD_MAX_LIMIT must be a valid i64"))
            .unwrap_or(MAX_LEADERBOARD_LIMIT);

        assert!(
            (1..=leaderboard_max_limit).contains(&leaderboard_default_limit),
            "LEADERBOARD_DEFAULT_LIMIT must be between 1 and LEADERBOARD_MAX_LIMIT"
        );

        let reconcile_interval_secs: u64 = std::env::var("RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("RECONCILE_INTERVAL_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store_timeout_secs,
            leaderboard_default_limit,
            leaderboard_max_limit,
            reconcile_interval_secs,
            jwt,
        }
    }
}
