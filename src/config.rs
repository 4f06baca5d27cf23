use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::warn;

use crate::cost::{ModelRates, PriceTable};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Directory saved reports are written into.
    pub report_dir: Option<PathBuf>,
    /// Per-model rate overrides, merged over the built-in table.
    pub pricing: Option<HashMap<String, ModelRates>>,
}

impl Config {
    /// Effective price table: built-in defaults plus config overrides.
    /// Entries with negative rates are skipped.
    pub fn price_table(&self) -> PriceTable {
        let mut table = PriceTable::builtin();

        let Some(ref pricing) = self.pricing else {
            return table;
        };

        for (model, rates) in pricing {
            if rates.input_per_1k < 0.0 || rates.output_per_1k < 0.0 {
                warn!(model = %model, "ignoring pricing override with negative rate");
                continue;
            }
            table.insert(model.clone(), *rates);
        }
        table
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("reports/output"))
    }
}

/// Load config from `explicit` when given, otherwise from the platform
/// config directory. Missing or invalid config falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Config {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let Some(dirs) = ProjectDirs::from("", "", "reqmeter") else {
                return Config::default();
            };
            dirs.config_dir().join("config.toml")
        }
    };

    let Ok(data) = fs::read_to_string(&path) else {
        if explicit.is_some() {
            eprintln!("Warning: cannot read config at {}", path.display());
        }
        return Config::default();
    };

    match toml::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: invalid config at {}: {}", path.display(), e);
            Config::default()
        }
    }
}
