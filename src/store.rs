// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Snapshot persistence.
//!
//! The ledger treats storage as an opaque key-value store of strings. The
//! value written under the store key is a versioned JSON envelope:
//!
//! ```json
//! {"state": {"totalPoints": 0, "usablePoints": 0, "expiringSoonPoints": 0, "transactions": []}, "version": 0}
//! ```

use crate::error::{StoreError, StoreResult};
use crate::state::LedgerState;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default key the ledger snapshot is stored under.
pub const DEFAULT_STORE_KEY: &str = "point-storage";

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 0;

/// Key-value storage for serialized snapshots.
///
/// Writes are last-write-wins; implementations do no locking across
/// processes.
pub trait SnapshotStore {
    /// Returns `Ok(None)` if nothing is stored under `key`.
    fn load(&self, key: &str) -> StoreResult<Option<String>>;

    fn save(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes the value under `key`. Returns `true` if it existed.
    fn remove(&self, key: &str) -> StoreResult<bool>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for &S {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        (**self).remove(key)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a LedgerState,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    state: LedgerState,
    version: u32,
}

/// Serializes `state` into the snapshot envelope.
pub fn encode_snapshot(state: &LedgerState) -> StoreResult<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        state,
        version: SNAPSHOT_VERSION,
    })?)
}

/// Parses a snapshot envelope.
///
/// # Errors
///
/// - [`StoreError::Serialization`] - Value is not a valid envelope, or a
///   transaction amount has the wrong sign for its kind.
/// - [`StoreError::UnsupportedVersion`] - Envelope was written by a newer format.
/// - [`StoreError::InconsistentSnapshot`] - Usable points exceed the total, or
///   the log is not strictly newest first.
pub fn decode_snapshot(raw: &str) -> StoreResult<LedgerState> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion(envelope.version));
    }
    envelope.state.validate()?;
    Ok(envelope.state)
}

/// Checks that `key` is usable as a plain file name.
///
/// Rejects empty keys, `.` and `..`, and anything with a path separator or NUL.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// In-memory store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.values.lock().remove(key).is_some())
    }
}

/// Directory-backed store: each key lives in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`. Fails for keys that would escape
    /// the directory.
    pub fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileStore {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves a half-written snapshot.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;

    #[test]
    fn memory_store_load_save_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.load("k").unwrap(), None);

        store.save("k", "v1").unwrap();
        store.save("k", "v2").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
    }

    #[test]
    fn envelope_round_trip() {
        let state = LedgerState::demo();
        let raw = encode_snapshot(&state).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["totalPoints"], 15_000);

        assert_eq!(decode_snapshot(&raw).unwrap(), state);
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let raw = r#"{"state":{"totalPoints":0,"usablePoints":0,"expiringSoonPoints":0,"transactions":[]},"version":7}"#;
        assert!(matches!(
            decode_snapshot(raw),
            Err(StoreError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_snapshot("not json"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn decode_rejects_usable_above_total() {
        let raw = r#"{"state":{"totalPoints":100,"usablePoints":500,"expiringSoonPoints":0,"transactions":[]},"version":0}"#;
        assert!(matches!(
            decode_snapshot(raw),
            Err(StoreError::InconsistentSnapshot(StateError::UsableExceedsTotal {
                usable: 500,
                total: 100
            }))
        ));
    }

    #[test]
    fn decode_rejects_out_of_order_ids() {
        let raw = r#"{"state":{"totalPoints":2,"usablePoints":2,"expiringSoonPoints":0,"transactions":[
            {"id":5,"type":"earn","amount":1,"description":"a","createdAt":"2024-04-01T09:00:00Z"},
            {"id":1711962000000,"type":"earn","amount":1,"description":"b","createdAt":"2024-04-01T09:00:00Z"}
        ]},"version":0}"#;
        assert!(matches!(
            decode_snapshot(raw),
            Err(StoreError::InconsistentSnapshot(StateError::IdsOutOfOrder(_)))
        ));
    }

    #[test]
    fn decode_rejects_sign_mismatch() {
        let raw = r#"{"state":{"totalPoints":0,"usablePoints":0,"expiringSoonPoints":0,"transactions":[
            {"id":1,"type":"earn","amount":-50,"description":"a","createdAt":"2024-04-01T09:00:00Z"}
        ]},"version":0}"#;
        assert!(matches!(
            decode_snapshot(raw),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn file_store_paths() {
        let store = FileStore::new("/tmp/ledger");
        assert_eq!(
            store.path_for("point-storage").unwrap(),
            PathBuf::from("/tmp/ledger/point-storage.json")
        );
    }

    #[test]
    fn keys_with_separators_are_rejected() {
        for key in ["", ".", "..", "../x", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_key(key), Err(StoreError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
        assert!(validate_key("point-storage").is_ok());
        assert!(validate_key("profile.v2").is_ok());

        let store = FileStore::new("/tmp/ledger");
        assert!(matches!(store.path_for("../x"), Err(StoreError::InvalidKey(_))));
    }
}
