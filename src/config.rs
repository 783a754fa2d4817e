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

//! Ledger configuration.
//!
//! Read from an optional TOML file. Every field has a default, so an empty
//! file (or no file) is a valid configuration:
//!
//! ```toml
//! data_dir = ".point-ledger"
//! store_key = "point-storage"
//! seed_demo_data = true
//! log_filter = "info"
//! ```

use crate::clock::SystemClock;
use crate::error::{ConfigError, StoreResult};
use crate::service::LedgerService;
use crate::state::LedgerState;
use crate::store::{self, DEFAULT_STORE_KEY, FileStore};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Directory holding snapshot files.
    pub data_dir: PathBuf,
    /// Key the snapshot is stored under. Must be a plain file name.
    pub store_key: String,
    /// Seed a new ledger with sample history instead of starting empty.
    pub seed_demo_data: bool,
    /// Fallback `tracing` filter when `POINT_LEDGER_LOG` is unset.
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".point-ledger"),
            store_key: DEFAULT_STORE_KEY.to_string(),
            seed_demo_data: true,
            log_filter: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a `store_key` that would resolve outside `data_dir`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        store::validate_key(&self.store_key)
            .map_err(|_| ConfigError::InvalidStoreKey(self.store_key.clone()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Initial state for a ledger that has never been saved.
    pub fn seed_state(&self) -> LedgerState {
        if self.seed_demo_data {
            LedgerState::demo()
        } else {
            LedgerState::default()
        }
    }

    /// Opens the file-backed ledger this configuration describes.
    pub fn open_ledger(&self) -> StoreResult<LedgerService<FileStore, SystemClock>> {
        LedgerService::open_with(
            FileStore::new(&self.data_dir),
            SystemClock,
            self.store_key.clone(),
            || self.seed_state(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.store_key, "point-storage");
        assert!(config.seed_demo_data);
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config = LedgerConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/points"
            seed_demo_data = false
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/points"));
        assert!(!config.seed_demo_data);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.seed_state(), LedgerState::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = LedgerConfig::from_toml_str("accrual_rate = 0.05");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn store_key_with_path_separator_is_rejected() {
        for raw in [
            r#"store_key = "../x""#,
            r#"store_key = "nested/points""#,
            r#"store_key = """#,
        ] {
            let result = LedgerConfig::from_toml_str(raw);
            assert!(
                matches!(result, Err(ConfigError::InvalidStoreKey(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = LedgerConfig::load(Path::new("/nonexistent/point-ledger.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
