use crate::cutoff::{default_cutoff, parse_cutoff};
use crate::ledger::DEFAULT_FOOD_NAME;
use chrono::NaiveTime;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ROLLOVER_CUTOFF must be HH:MM, got {0:?}")]
    InvalidCutoff(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub cutoff: NaiveTime,
    pub default_food_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cutoff = match lookup("ROLLOVER_CUTOFF") {
            Some(value) => parse_cutoff(&value).ok_or(ConfigError::InvalidCutoff(value))?,
            None => default_cutoff(),
        };

        Ok(Self {
            data_dir: lookup("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            port: lookup("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(8080),
            cutoff,
            default_food_name: lookup("DEFAULT_FOOD_NAME")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FOOD_NAME.into()),
        })
    }
}
