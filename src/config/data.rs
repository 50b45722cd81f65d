use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Database population settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Apply pending migrations when the database actor starts.
    /// TOML: `data.auto_migrate`. Default: `true`.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,

    /// Default reagent list (CSV) used by `platelab seed` without an argument.
    /// TOML: `data.seed_csv`. Default: unset.
    #[serde(default)]
    pub seed_csv: Option<PathBuf>,

    /// Import `seed_csv` every time the server starts. Import is an upsert by
    /// reagent name, so repeated runs do not duplicate rows.
    /// TOML: `data.seed_on_start`. Default: `false`.
    #[serde(default)]
    pub seed_on_start: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            auto_migrate: true,
            seed_csv: None,
            seed_on_start: false,
        }
    }
}

fn default_true() -> bool {
    true
}
