use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default evaluator cadence; doubles as the exact-time match tolerance.
pub const DEFAULT_TICK_SECS: u64 = 60;
/// Default minutes before an unresolved pending claim is reported as stuck.
pub const DEFAULT_STUCK_GRACE_MINUTES: u64 = 30;

/// Top-level config (herald.toml + HERALD_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Evaluator subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between evaluator ticks.
    ///
    /// Doubles as the tolerance for weekly / 3-day exact-time matching, so a
    /// campaign firing at 09:00:00 is considered due for the whole tick that
    /// straddles it. Override with env var: HERALD_ENGINE_TICK_SECS.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Minutes after which a claimed-but-unresolved step is reported as stuck.
    #[serde(default = "default_stuck_grace_minutes")]
    pub stuck_grace_minutes: u64,
    /// Path to the TOML campaign roster.
    #[serde(default = "default_roster_path")]
    pub roster: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
            stuck_grace_minutes: DEFAULT_STUCK_GRACE_MINUTES,
            roster: default_roster_path(),
        }
    }
}

fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}
fn default_stuck_grace_minutes() -> u64 {
    DEFAULT_STUCK_GRACE_MINUTES
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/herald.db", home)
}
fn default_roster_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/campaigns.toml", home)
}

impl HeraldConfig {
    /// Load config from a TOML file with HERALD_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.herald/herald.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: HeraldConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("HERALD_").split("_"))
            .extract()
            .map_err(|e| crate::error::HeraldError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/herald.toml", home)
}
