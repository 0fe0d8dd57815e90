//! # Printer Preference Store
//!
//! Persists a single last-used printer identifier across process
//! restarts. The store is a capability injected into the dispatcher, not
//! ambient process state, so selection logic stays testable without a
//! real persistence layer.
//!
//! The on-disk format is one JSON object with a single key:
//!
//! ```json
//! {"saved_printer_mac": "00:11:62:AA:BB:CC"}
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::BoletaError;

/// Single-slot storage for the last-used printer identifier.
pub trait PreferenceStore {
    /// Read the saved identifier, if any.
    fn get(&self) -> Option<String>;

    /// Overwrite the slot with a new identifier.
    fn set(&self, identifier: &str) -> Result<(), BoletaError>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Arc<T> {
    fn get(&self) -> Option<String> {
        (**self).get()
    }

    fn set(&self, identifier: &str) -> Result<(), BoletaError> {
        (**self).set(identifier)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(rename = "saved_printer_mac", skip_serializing_if = "Option::is_none")]
    saved_printer_mac: Option<String>,
}

/// File-backed preference store.
///
/// Reads tolerate a missing or malformed file (treated as "no saved
/// printer"); writes create the parent directory as needed.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default per-installation location: `~/.config/boleta/printer.json`.
    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".config/boleta/printer.json"),
            None => PathBuf::from("boleta-printer.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> PreferenceFile {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }
}

impl Default for JsonPreferenceStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get(&self) -> Option<String> {
        self.load().saved_printer_mac
    }

    fn set(&self, identifier: &str) -> Result<(), BoletaError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                BoletaError::Preference(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = PreferenceFile {
            saved_printer_mac: Some(identifier.to_string()),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| BoletaError::Preference(e.to_string()))?;

        fs::write(&self.path, json).map_err(|e| {
            BoletaError::Preference(format!("cannot write {}: {}", self.path.display(), e))
        })
    }
}

/// In-memory preference store for tests and ephemeral setups.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    slot: Mutex<Option<String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(identifier: &str) -> Self {
        Self {
            slot: Mutex::new(Some(identifier.to_string())),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self) -> Option<String> {
        match self.slot.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, identifier: &str) -> Result<(), BoletaError> {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(identifier.to_string());
        Ok(())
    }
}
