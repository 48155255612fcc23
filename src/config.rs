use std::{fmt, time::Duration};

use clap::{builder::NonEmptyStringValueParser, Parser};
use sqlx::postgres::PgConnectOptions;

/// Placeholder shared secret used when `API_TOKEN` is unset. Not safe for any
/// real deployment; startup logs a warning while it is in effect.
pub const INSECURE_DEFAULT_API_TOKEN: &str = "insecure-placeholder-token-change-me";

/// Process configuration, read once at startup from the environment (and
/// `.env`), with command line flags taking precedence.
#[derive(Clone, Parser)]
#[command(name = "postpago_api", about = "Postpago public purchases API", long_about = None)]
pub struct Config {
    /// Database role
    #[arg(long, env = "DB_USER", value_parser = NonEmptyStringValueParser::new())]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Database host
    #[arg(long, env = "DB_HOST", value_parser = NonEmptyStringValueParser::new())]
    pub db_host: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database name
    #[arg(long, env = "DB_NAME", value_parser = NonEmptyStringValueParser::new())]
    pub db_name: String,

    /// Shared secret expected in the x-api-key header
    #[arg(
        long,
        env = "API_TOKEN",
        default_value = INSECURE_DEFAULT_API_TOKEN,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub api_token: String,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Connection pool size
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Pool acquire and statement timeout, in seconds
    #[arg(long, env = "DB_TIMEOUT_SECS", default_value_t = 5)]
    pub db_timeout_secs: u64,
}

impl Config {
    /// Loads `.env` if present, then parses the environment and arguments.
    pub fn load() -> Result<Self, clap::Error> {
        dotenvy::dotenv().ok();

        Self::try_parse().map(Self::with_token_fallback)
    }

    // an exported but empty API_TOKEN behaves like an unset one
    fn with_token_fallback(mut self) -> Self {
        if self.api_token.is_empty() {
            self.api_token = INSECURE_DEFAULT_API_TOKEN.to_string();
        }
        self
    }

    pub fn uses_insecure_token(&self) -> bool {
        self.api_token == INSECURE_DEFAULT_API_TOKEN
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .password(&self.db_password)
            .database(&self.db_name)
    }

    /// Connection target with the password masked, for logs.
    pub fn database_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.db_user, self.db_host, self.db_port, self.db_name
        )
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database", &self.database_url())
            .field("api_token", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_timeout", &self.db_timeout())
            .finish()
    }
}
