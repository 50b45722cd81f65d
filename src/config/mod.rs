mod basic;
mod data;

pub use basic::BasicConfig;
pub use data::DataConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Database population settings (see `data` table in config.toml).
    #[serde(default)]
    pub data: DataConfig,
}

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and the given TOML file when it exists.
    pub fn figment(path: &Path) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment.merge(Toml::file(path))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `path` if present.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }
}
