use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::forward::ForwardDefaults;
use crate::menu::MenuDefaults;

/// Settings file consulted when `FUNLETS_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "funlets.toml";

/// Process-wide settings, loaded once and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    /// Compiled defaults of the Forward Funlet
    pub forward: ForwardDefaults,
    /// Compiled defaults of the Simple Menu Funlet
    pub menu: MenuDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Settings {
    /// Optional TOML file, then `FUNLETS_*` variables (`__` between sections),
    /// over the compiled defaults.
    pub fn load() -> Result<Self, ServerError> {
        let path = std::env::var("FUNLETS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ServerError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("FUNLETS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
