//! Configuration file structures for the Savepoint bot.
//!
//! The configuration is read from a YAML file and can be overridden with
//! environment variables prefixed by `SAVEPOINT_`, nested keys being separated
//! by a double underscore.
//!
//! # Configuration File Format
//!
//! ```yaml
//! matrix:
//!   user_id: "@savepoint:matrix.org"
//!   password: "secret-password"
//!
//! catalog:
//!   api_key: "steam-web-api-key"
//!   # Optional, shown with their defaults
//!   api_url: "https://api.steampowered.com"
//!   store_url: "https://store.steampowered.com"
//!   timeout: 10
//!   cache_ttl: 3600
//!
//! bot:
//!   prefix: "s!"
//!
//! poll:
//!   # Minutes before a poll closes by itself, omit to keep polls open
//!   duration: 1440
//!   # Who may use `endPoll`: anyone, creator or disabled
//!   end_scope: anyone
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```bash
//! export SAVEPOINT_MATRIX__PASSWORD="secret-from-env"
//! export SAVEPOINT_CATALOG__API_KEY="key-from-env"
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use std::time::Duration;

use serde::Deserialize;

/// Prefix of the environment variables overriding the configuration file.
const ENV_PREFIX: &str = "SAVEPOINT_";

/// Root configuration structure for the Savepoint bot.
#[derive(Deserialize, Debug)]
pub struct Config {
    /// Matrix account configuration
    pub matrix: Matrix,
    /// Game catalog API configuration
    pub catalog: Catalog,
    /// Command surface configuration
    #[serde(default)]
    pub bot: Bot,
    /// Poll behavior configuration
    #[serde(default)]
    pub poll: Poll,
}

impl Config {
    /// Loads the configuration from a YAML file, applying `SAVEPOINT_*`
    /// environment overrides on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or if a required value
    /// is missing from both the file and the environment.
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

/// Matrix account configuration.
#[derive(Deserialize, Debug)]
pub struct Matrix {
    /// Fully qualified Matrix user ID, e.g. `@savepoint:matrix.org`.
    pub user_id: String,

    /// Matrix account password.
    ///
    /// Only used for the first login, the session is restored from the data
    /// directory afterwards.
    pub password: String,
}

/// Game catalog API configuration.
#[derive(Deserialize, Debug)]
pub struct Catalog {
    /// Base URL of the Steam Web API serving the application list.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the Steam store serving application details.
    #[serde(default = "default_store_url")]
    pub store_url: String,

    /// Steam Web API key.
    pub api_key: String,

    /// Maximum wait for a catalog request, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How long the application list is kept before being fetched again, in
    /// seconds. `0` fetches the list for every lookup.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
}

/// Command surface configuration.
#[derive(Deserialize, Debug)]
pub struct Bot {
    /// Prefix a message must start with to be treated as a command.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for Bot {
    fn default() -> Self {
        Bot {
            prefix: default_prefix(),
        }
    }
}

/// Poll behavior configuration.
#[derive(Deserialize, Debug, Default)]
pub struct Poll {
    /// Minutes a poll stays open. Polls never expire when absent.
    pub duration: Option<u64>,

    /// Who is allowed to end a poll with the `endPoll` command.
    #[serde(default)]
    pub end_scope: EndScope,
}

impl Poll {
    /// Time window of a poll, `None` when polls only end manually.
    ///
    /// A duration of `0` disables expiry.
    pub fn window(&self) -> Option<Duration> {
        self.duration
            .filter(|minutes| *minutes > 0)
            .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }
}

/// Scope of the manual `endPoll` command.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndScope {
    /// Any room member can end the latest poll
    #[default]
    Anyone,
    /// Only the author of the poll can end it
    Creator,
    /// Polls can only end by expiring
    Disabled,
}

fn default_api_url() -> String {
    "https://api.steampowered.com".to_owned()
}

fn default_store_url() -> String {
    "https://store.steampowered.com".to_owned()
}

fn default_timeout() -> u64 {
    10
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_prefix() -> String {
    "s!".to_owned()
}
