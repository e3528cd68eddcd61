//! Persisted account records: a single JSON document keyed by username
//! (spec.md §6.2), grounded on `original_source/server/Sessions/Auth/AuthService.cpp`'s
//! `loadAccounts`/`saveAccounts` pair. Unlike the original's hand-rolled
//! nlohmann::json field-by-field copy, unknown fields round-trip for free via
//! serde's `#[serde(flatten)]` into a `serde_json::Map`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AuthResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: u64,
    #[serde(default)]
    pub last_login: u64,
    /// Fields neither this crate nor the original writes but that a hand-edited
    /// or externally-migrated document might carry; preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountDocument {
    version: u32,
    accounts: HashMap<String, Account>,
}

const CURRENT_VERSION: u32 = 1;

/// Loads and atomically rewrites `accounts.json`-shaped documents.
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns an empty map if the file does not exist yet; a fresh server
    /// has no accounts and guest/anonymous flows don't need one (spec.md §6.2).
    pub fn load(&self) -> AuthResult<HashMap<String, Account>> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no accounts file found, starting empty");
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let doc: AccountDocument = serde_json::from_str(&contents)?;
        tracing::info!(count = doc.accounts.len(), path = %self.path.display(), "loaded accounts");
        Ok(doc.accounts)
    }

    /// Serializes the full account map and atomically replaces the file
    /// (write to a sibling temp file, then rename) so a crash mid-write never
    /// leaves a truncated document.
    pub fn save(&self, accounts: &HashMap<String, Account>) -> AuthResult<()> {
        let doc = AccountDocument {
            version: CURRENT_VERSION,
            accounts: accounts.clone(),
        };
        let serialized = serde_json::to_string_pretty(&doc)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("accounts.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("accounts.json"));
        let mut accounts = HashMap::new();
        accounts.insert(
            "nova".to_string(),
            Account {
                username: "nova".to_string(),
                password_hash: "$argon2id$...".to_string(),
                email: Some("nova@example.com".to_string()),
                created_at: 1_700_000_000,
                last_login: 0,
                extra: serde_json::Map::new(),
            },
        );
        store.save(&accounts).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.get("nova").unwrap().username, "nova");
        assert_eq!(loaded.get("nova").unwrap().email.as_deref(), Some("nova@example.com"));
    }

    #[test]
    fn unknown_fields_round_trip_through_extra() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"{"version":1,"accounts":{"nova":{"username":"nova","password_hash":"h","created_at":1,"banned":true}}}"#,
        )
        .unwrap();
        let store = AccountStore::new(path);
        let accounts = store.load().unwrap();
        let nova = accounts.get("nova").unwrap();
        assert_eq!(nova.extra.get("banned").and_then(|v| v.as_bool()), Some(true));
        store.save(&accounts).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.get("nova").unwrap().extra.get("banned").and_then(|v| v.as_bool()), Some(true));
    }
}
