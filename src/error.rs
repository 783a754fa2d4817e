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

//! Error types for ledger operations, persistence, and configuration.

use crate::base::{Points, TransactionId};
use crate::transaction::TransactionKind;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Redemption or expiry would exceed the usable balance
    #[error("insufficient usable points (requested {requested}, usable {usable})")]
    InsufficientBalance { requested: Points, usable: Points },

    /// Amount is zero where a positive amount is required
    #[error("invalid amount (must be positive)")]
    InvalidAmount,
}

/// A ledger state or transaction that breaks the ledger invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Usable balance above the lifetime total
    #[error("usable points {usable} exceed total points {total}")]
    UsableExceedsTotal { usable: Points, total: Points },

    /// Log is not strictly newest first
    #[error("transaction id {0} is not older than the entry before it")]
    IdsOutOfOrder(TransactionId),

    /// Amount sign disagrees with the transaction kind
    #[error("transaction {id}: {kind} amount {amount} has the wrong sign")]
    SignMismatch {
        id: TransactionId,
        kind: TransactionKind,
        amount: i64,
    },
}

/// Snapshot store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot envelope carries a version this build cannot read
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    /// Snapshot decoded but its state breaks the ledger invariants
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(#[from] StateError),

    /// Key cannot be used as a storage name
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid store_key {0:?} (must be a plain file name)")]
    InvalidStoreKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            LedgerError::InsufficientBalance {
                requested: 500,
                usable: 200
            }
            .to_string(),
            "insufficient usable points (requested 500, usable 200)"
        );
        assert_eq!(
            LedgerError::InvalidAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(
            StoreError::UnsupportedVersion(3).to_string(),
            "unsupported snapshot version 3"
        );
        assert_eq!(
            StoreError::from(StateError::UsableExceedsTotal {
                usable: 500,
                total: 100
            })
            .to_string(),
            "inconsistent snapshot: usable points 500 exceed total points 100"
        );
        assert_eq!(
            StateError::SignMismatch {
                id: TransactionId(9),
                kind: TransactionKind::Earn,
                amount: -50
            }
            .to_string(),
            "transaction 9: earn amount -50 has the wrong sign"
        );
        assert_eq!(
            StoreError::InvalidKey("../x".to_string()).to_string(),
            "invalid store key \"../x\""
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = LedgerError::InsufficientBalance {
            requested: 1,
            usable: 0,
        };
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }

    #[test]
    fn store_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: StoreError = io.into();
        assert!(matches!(error, StoreError::Io(_)));
        assert!(error.to_string().starts_with("storage I/O error"));
    }
}
