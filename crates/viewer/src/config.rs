use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "GAMETALK_";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub subject: SubjectSettings,
    pub identity: Option<IdentitySettings>,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub feed_capacity: usize,
}

#[derive(Deserialize, Clone)]
pub struct SubjectSettings {
    pub id: String,
}

/// Who the viewer acts as. Without it the thread is read-only.
#[derive(Deserialize, Clone)]
pub struct IdentitySettings {
    pub user_id: String,
    pub username: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::build(&run_mode, collect_env_vars(std::env::vars()))
    }

    fn build(run_mode: &str, env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let env_json = serde_json::to_string(&env_map)
            .map_err(|e| ConfigError::Message(format!("environment overrides: {e}")))?;

        let s = config::Config::builder()
            .set_default("database.url", "sqlite://data/gametalk.db")?
            .set_default("database.feed_capacity", 100)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }
}

fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
