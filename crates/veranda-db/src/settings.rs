//! # Local Settings Store
//!
//! A small JSON file next to the database holding the client-side
//! receipt numbering fallback.
//!
//! ## Why a fallback at all
//! The authoritative counter lives in the database. If the primary
//! numbering path fails mid-sale (disk error, busy timeout that outlasts
//! the retry window), the terminal can still issue a receipt using the
//! locally tracked next number and recycled-code list, rather than
//! turning away a guest standing at the desk. The fallback is only ever
//! consulted after the primary path has errored; when the database is
//! unreachable outright, the error propagates instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

// =============================================================================
// Settings Schema
// =============================================================================

/// Persisted terminal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    /// Receipt code prefix, mirrored from the database counter row.
    pub receipt_prefix: String,

    /// Next sequential number to issue when falling back.
    pub next_number: i64,

    /// Recycled receipt codes waiting for reuse, oldest first.
    #[serde(default)]
    pub recycled_codes: Vec<String>,
}

impl Default for LocalSettings {
    fn default() -> Self {
        LocalSettings {
            receipt_prefix: "RV".to_string(),
            next_number: 1,
            recycled_codes: Vec::new(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Loads and saves [`LocalSettings`] as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings from disk. A missing file yields defaults; a
    /// corrupt file is an error (silently resetting would reissue
    /// numbers).
    pub fn load(&self) -> DbResult<LocalSettings> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Settings file missing, using defaults");
            return Ok(LocalSettings::default());
        }

        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| DbError::SettingsFailed(format!("read {}: {}", self.path.display(), e)))?;

        serde_json::from_str(&raw)
            .map_err(|e| DbError::SettingsFailed(format!("parse {}: {}", self.path.display(), e)))
    }

    /// Writes settings atomically (temp file + rename) so a crash
    /// mid-write never leaves a truncated file.
    pub fn save(&self, settings: &LocalSettings) -> DbResult<()> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| DbError::SettingsFailed(format!("serialize: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| DbError::SettingsFailed(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| DbError::SettingsFailed(format!("rename {}: {}", tmp.display(), e)))?;

        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Issues the next receipt code from the fallback store: recycled
    /// codes first (oldest first), then the sequential counter.
    pub fn next_fallback_code(&self) -> DbResult<String> {
        let mut settings = self.load()?;

        let code = if let Some(recycled) = settings.recycled_codes.first().cloned() {
            settings.recycled_codes.remove(0);
            warn!(code = %recycled, "Issuing recycled receipt code from local fallback");
            recycled
        } else {
            let code =
                veranda_core::format_receipt_code(&settings.receipt_prefix, settings.next_number);
            settings.next_number += 1;
            warn!(code = %code, "Issuing sequential receipt code from local fallback");
            code
        };

        self.save(&settings)?;
        Ok(code)
    }

    /// Records a recycled code in the fallback store. Duplicates are
    /// ignored.
    pub fn push_recycled(&self, code: &str) -> DbResult<()> {
        let mut settings = self.load()?;
        if !settings.recycled_codes.iter().any(|c| c == code) {
            settings.recycled_codes.push(code.to_string());
            self.save(&settings)?;
        }
        Ok(())
    }

    /// Mirrors the database counter into the fallback store so a later
    /// fallback picks up where the database left off.
    pub fn sync_counter(&self, prefix: &str, next_number: i64) -> DbResult<()> {
        let mut settings = self.load()?;
        settings.receipt_prefix = prefix.to_string();
        // Never move the fallback counter backwards
        if next_number > settings.next_number {
            settings.next_number = next_number;
        }
        self.save(&settings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> SettingsStore {
        let path = std::env::temp_dir().join(format!("veranda-settings-{}.json", uuid::Uuid::new_v4()));
        SettingsStore::new(path)
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let store = temp_store();
        let settings = store.load().unwrap();
        assert_eq!(settings.receipt_prefix, "RV");
        assert_eq!(settings.next_number, 1);
        assert!(settings.recycled_codes.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let store = temp_store();
        let settings = LocalSettings {
            receipt_prefix: "VX".to_string(),
            next_number: 42,
            recycled_codes: vec!["VX000007".to_string()],
        };
        store.save(&settings).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.receipt_prefix, "VX");
        assert_eq!(loaded.next_number, 42);
        assert_eq!(loaded.recycled_codes, vec!["VX000007".to_string()]);

        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn test_fallback_prefers_recycled_codes() {
        let store = temp_store();
        store
            .save(&LocalSettings {
                receipt_prefix: "RV".to_string(),
                next_number: 10,
                recycled_codes: vec!["RV000003".to_string(), "RV000005".to_string()],
            })
            .unwrap();

        assert_eq!(store.next_fallback_code().unwrap(), "RV000003");
        assert_eq!(store.next_fallback_code().unwrap(), "RV000005");
        // Recycled list drained, counter takes over
        assert_eq!(store.next_fallback_code().unwrap(), "RV000010");
        assert_eq!(store.next_fallback_code().unwrap(), "RV000011");

        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn test_push_recycled_is_idempotent() {
        let store = temp_store();
        store.push_recycled("RV000009").unwrap();
        store.push_recycled("RV000009").unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.recycled_codes.len(), 1);

        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn test_sync_counter_never_moves_backwards() {
        let store = temp_store();
        store.sync_counter("RV", 100).unwrap();
        store.sync_counter("RV", 50).unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.next_number, 100);

        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let store = temp_store();
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load(), Err(DbError::SettingsFailed(_))));

        std::fs::remove_file(store.path()).ok();
    }
}
