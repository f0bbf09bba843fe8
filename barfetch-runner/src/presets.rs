//! Named symbol presets: JSON save/load across runs.
//!
//! The file maps preset name to a comma-separated symbol list, e.g.
//! `{"majors": "EURUSD,GBPUSD,USDJPY"}`. A missing or corrupt file loads as
//! empty rather than failing the caller.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default preset file, kept next to the working directory.
pub const DEFAULT_PRESET_FILE: &str = "symbol_presets.json";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetStore {
    #[serde(flatten)]
    presets: BTreeMap<String, String>,
}

impl PresetStore {
    /// Load presets from disk. Returns an empty store if the file is missing
    /// or corrupt.
    pub fn load(path: &Path) -> PresetStore {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => PresetStore::default(),
        }
    }

    /// Save presets to disk as pretty JSON, creating parent directories if
    /// needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Insert or replace a preset.
    pub fn set(&mut self, name: &str, symbols: &str) {
        self.presets.insert(name.to_string(), symbols.to_string());
    }

    /// The raw comma-separated list for a preset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.presets.get(name).map(String::as_str)
    }

    /// Remove a preset; returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.presets.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    /// A preset's symbols, split on commas, trimmed, empties dropped.
    pub fn symbols(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(split_symbols)
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// Split a comma-separated symbol list the way user input is split.
pub fn split_symbols(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
