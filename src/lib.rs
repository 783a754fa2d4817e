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

//! # Point Ledger
//!
//! This library provides a loyalty point ledger for a storefront: points are
//! earned on settled orders, redeemed at checkout, and occasionally expired.
//!
//! ## Core Components
//!
//! - [`LedgerService`]: Applies earn/use/expire and persists a snapshot after each
//! - [`LedgerState`]: Balances plus the newest-first transaction log
//! - [`PointTransaction`]: One history entry, with a sign fixed by its [`TransactionKind`]
//! - [`SnapshotStore`]: Key-value persistence ([`MemoryStore`], [`FileStore`])
//! - [`PointGrade`]: Cosmetic tier derived from the lifetime total
//! - [`LedgerError`]: Errors for rejected operations
//!
//! ## Example
//!
//! ```
//! use point_ledger::{LedgerService, LedgerState, MemoryStore, SystemClock};
//!
//! let mut ledger =
//!     LedgerService::open_with(MemoryStore::new(), SystemClock, "points", LedgerState::default)
//!         .unwrap();
//!
//! // Settle an order worth 20,000
//! let earned = ledger.calculate_earned_points(20_000);
//! ledger.earn(earned, "Order reward", Some("ORD-1".to_string()));
//! assert_eq!(ledger.usable_points(), 200);
//!
//! // Redeem against the next order, capped at half its value
//! let cap = ledger.max_usable_points(300);
//! ledger.use_points(cap, "Redeemed at checkout", None).unwrap();
//! assert_eq!(ledger.usable_points(), 50);
//! assert_eq!(ledger.total_points(), 200);
//! ```
//!
//! ## Threading
//!
//! A ledger is a single-owner value: mutations take `&mut self` and there is
//! no coordination between two ledgers sharing a store key.

mod base;
pub mod clock;
pub mod config;
pub mod error;
pub mod grade;
pub mod rules;
mod service;
mod state;
pub mod store;
mod transaction;
mod transaction_log;

pub use base::{Points, TransactionId};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LedgerConfig;
pub use error::{ConfigError, LedgerError, StateError, StoreError, StoreResult};
pub use grade::{PointGrade, format_points};
pub use rules::{calculate_earned_points, max_usable_points};
pub use service::{LedgerService, PointSummary};
pub use state::LedgerState;
pub use store::{FileStore, MemoryStore, SnapshotStore};
pub use transaction::{PointTransaction, TransactionKind};
pub use transaction_log::TransactionLog;
