//! Process configuration.
//!
//! Layers, later wins: built-in defaults, `todo.toml` (optional), environment
//! variables `TODO_<SECTION>__<KEY>` (e.g. `TODO_SERVER__PORT=9000`), then CLI
//! flags collected into `CliOverrides`.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::tasks::DEFAULT_MAX_INSERT_ATTEMPTS;

pub const DEFAULT_CONFIG_FILE: &str = "todo.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
    /// Mark the session cookie `Secure`. Only turn off for plain-HTTP local runs.
    pub secure_cookie: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 8000, request_timeout_ms: 10_000, secure_cookie: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseSettings {
    /// libpq-style key/value string or `postgres://` URL.
    pub url: String,
    pub pool_size: usize,
    /// Use the in-process engine instead of PostgreSQL. Nothing survives a restart.
    pub memory: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "host=localhost port=5432 user=postgres password=rx dbname=todo-multi sslmode=disable".into(),
            pool_size: 16,
            memory: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub ttl_secs: i64,
}

impl Default for SessionSettings {
    fn default() -> Self { Self { ttl_secs: 60 * 60 } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaskSettings {
    pub max_insert_attempts: u32,
}

impl Default for TaskSettings {
    fn default() -> Self { Self { max_insert_attempts: DEFAULT_MAX_INSERT_ATTEMPTS } }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub tasks: TaskSettings,
    pub log: LogSettings,
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub memory: Option<bool>,
}

impl Settings {
    pub fn load(cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::load_from(cli, Environment::with_prefix("TODO").prefix_separator("_").separator("__").try_parsing(true))
    }

    fn load_from(cli: &CliOverrides, env: Environment) -> Result<Self, ConfigError> {
        let file = cli.config_file.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);
        let builder = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(file).format(FileFormat::Toml).required(cli.config_file.is_some()))
            .add_source(env)
            .set_override_option("server.host", cli.host.clone())?
            .set_override_option("server.port", cli.port.map(i64::from))?
            .set_override_option("database.url", cli.database_url.clone())?
            .set_override_option("database.memory", cli.memory)?;

        builder.build()?.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.server.request_timeout_ms) }

    pub fn session_ttl(&self) -> chrono::Duration { chrono::Duration::seconds(self.session.ttl_secs) }
}
