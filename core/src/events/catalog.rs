//! Event catalog loading
//!
//! Catalog files declare events in TOML so the standalone binary can build
//! a registry without any code. Each `[[event]]` entry names an ID, a bit
//! cost, a cooldown, and a behavior variant. Embedders that register
//! closures directly never touch this module.
//!
//! ```toml
//! [[event]]
//! id = "Laser"
//! bit_cost = 100
//! cooldown_secs = 5.0
//! announce = "{user} fired the laser!"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::CatalogError;

/// Behavior variant for a catalog entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogVariant {
    #[default]
    Simple,
    Timed,
    DataBound,
}

/// One `[[event]]` entry in a catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,

    /// 0 = name-only, never selected by a bits amount
    #[serde(default)]
    pub bit_cost: u32,

    #[serde(default)]
    pub cooldown_secs: f32,

    #[serde(default)]
    pub variant: CatalogVariant,

    /// Running period for timed events
    #[serde(default)]
    pub effect_secs: f32,

    /// Chat line sent when the event fires. `{event}` and `{user}` are
    /// substituted; data-bound events also get `{text}`.
    #[serde(default)]
    pub announce: Option<String>,

    /// Chat line sent when a timed event's running period ends
    #[serde(default)]
    pub expire_announce: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "event")]
    events: Vec<CatalogEntry>,
}

/// Parse catalog TOML from an in-memory string.
pub fn parse_catalog(content: &str) -> Result<Vec<CatalogEntry>, toml::de::Error> {
    let file: CatalogFile = toml::from_str(content)?;
    Ok(file.events)
}

/// Load and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = parse_catalog(&content).map_err(|source| CatalogError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;

    for entry in &entries {
        if let Some(reason) = validate_entry(entry) {
            return Err(CatalogError::InvalidDefinition {
                path: path.to_path_buf(),
                reason,
            });
        }
    }

    Ok(entries)
}

fn validate_entry(entry: &CatalogEntry) -> Option<String> {
    if entry.id.trim().is_empty() {
        return Some("event id must not be empty".to_string());
    }
    if entry.cooldown_secs < 0.0 {
        return Some(format!("event '{}' has a negative cooldown", entry.id));
    }
    if entry.variant == CatalogVariant::Timed && entry.effect_secs <= 0.0 {
        return Some(format!(
            "timed event '{}' needs effect_secs > 0",
            entry.id
        ));
    }
    None
}
