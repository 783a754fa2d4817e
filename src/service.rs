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

//! Loyalty ledger service.
//!
//! The [`LedgerService`] owns a [`LedgerState`] and writes a snapshot to its
//! [`SnapshotStore`] after every mutation.
//!
//! # Operations
//!
//! - **Earn**: Credit points to the total and usable balances.
//! - **Use**: Debit points from the usable balance (fails if insufficient).
//! - **Expire**: Remove points from both balances.
//!
//! # Persistence
//!
//! Saving is fire-and-forget. A failed write is logged and the in-memory
//! state stays authoritative; the operation itself still succeeds. Callers
//! that must know the ledger is on disk call [`LedgerService::flush`].

use crate::base::Points;
use crate::clock::Clock;
use crate::error::{LedgerError, StoreResult};
use crate::grade::{PointGrade, format_points};
use crate::rules;
use crate::state::LedgerState;
use crate::store::{self, SnapshotStore};
use crate::transaction::PointTransaction;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Read-only projection of the ledger for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointSummary {
    pub total_points: Points,
    pub usable_points: Points,
    pub expiring_soon_points: Points,
    /// Window the expiring-soon figure refers to.
    pub expiry_horizon_days: u32,
    pub total_display: String,
    pub usable_display: String,
    pub expiring_soon_display: String,
    pub grade: PointGrade,
    pub rate_hint: String,
}

/// Point ledger bound to a snapshot store and a clock.
///
/// # Invariants
///
/// - `usable_points` never goes negative; a redemption that would overdraw
///   is rejected without touching state.
/// - The transaction log is newest first and only ever prepended to.
/// - Use lowers `usable_points` only; `total_points` tracks lifetime
///   earned minus expired.
pub struct LedgerService<S, C> {
    state: LedgerState,
    store: S,
    clock: C,
    key: String,
}

impl<S: SnapshotStore, C: Clock> LedgerService<S, C> {
    /// Opens the ledger stored under [`DEFAULT_STORE_KEY`](store::DEFAULT_STORE_KEY),
    /// seeding it with [`LedgerState::demo`] on first load.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`](crate::StoreError) if the stored snapshot
    /// cannot be read, decoded, or breaks the ledger invariants.
    pub fn open(store: S, clock: C) -> StoreResult<Self> {
        Self::open_with(store, clock, store::DEFAULT_STORE_KEY, LedgerState::demo)
    }

    /// Opens the ledger under `key`, calling `seed` when nothing is stored yet.
    ///
    /// A freshly seeded state is validated, then persisted immediately.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open); an invalid seed is reported as
    /// [`StoreError::InconsistentSnapshot`](crate::StoreError::InconsistentSnapshot).
    pub fn open_with(
        store: S,
        clock: C,
        key: impl Into<String>,
        seed: impl FnOnce() -> LedgerState,
    ) -> StoreResult<Self> {
        let key = key.into();
        let loaded = store.load(&key)?;
        let service = match loaded {
            Some(raw) => {
                let state = store::decode_snapshot(&raw)?;
                debug!(
                    key = %key,
                    transactions = state.transactions().len(),
                    "loaded point ledger snapshot"
                );
                Self { state, store, clock, key }
            }
            None => {
                let state = seed();
                state.validate()?;
                info!(key = %key, total = state.total_points(), "seeding new point ledger");
                let service = Self { state, store, clock, key };
                service.persist();
                service
            }
        };
        Ok(service)
    }

    /// Credits `points` to the ledger.
    ///
    /// Always succeeds; zero-point earns are recorded as well.
    pub fn earn(
        &mut self,
        points: Points,
        description: impl Into<String>,
        order_reference: Option<String>,
    ) -> &PointTransaction {
        let now = self.clock.now();
        let tx = self.state.earn(points, description, order_reference, now);
        debug!(id = %tx.id(), points, "earned points");
        self.persist();
        self.latest()
    }

    /// Redeems `points` from the usable balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `points` is zero.
    /// - [`LedgerError::InsufficientBalance`] - `points` exceeds the usable balance.
    ///
    /// On error nothing is recorded or persisted.
    pub fn use_points(
        &mut self,
        points: Points,
        description: impl Into<String>,
        order_reference: Option<String>,
    ) -> Result<&PointTransaction, LedgerError> {
        let now = self.clock.now();
        let usable = self.state.usable_points();
        match self.state.redeem(points, description, order_reference, now) {
            Ok(tx) => debug!(id = %tx.id(), points, "used points"),
            Err(e) => {
                warn!(points, usable, "rejected point use: {}", e);
                return Err(e);
            }
        }
        self.persist();
        Ok(self.latest())
    }

    /// Expires `points`, lowering both balances.
    ///
    /// # Errors
    ///
    /// Same as [`use_points`](Self::use_points).
    pub fn expire(
        &mut self,
        points: Points,
        description: impl Into<String>,
    ) -> Result<&PointTransaction, LedgerError> {
        let now = self.clock.now();
        let usable = self.state.usable_points();
        match self.state.expire(points, description, now) {
            Ok(tx) => debug!(id = %tx.id(), points, "expired points"),
            Err(e) => {
                warn!(points, usable, "rejected point expiry: {}", e);
                return Err(e);
            }
        }
        self.persist();
        Ok(self.latest())
    }

    /// Points an order of `order_amount` would earn.
    pub fn calculate_earned_points(&self, order_amount: u64) -> Points {
        rules::calculate_earned_points(order_amount)
    }

    /// Most points redeemable against an order of `order_amount`.
    pub fn max_usable_points(&self, order_amount: u64) -> Points {
        rules::max_usable_points(order_amount, self.state.usable_points())
    }

    /// Full history, newest first.
    pub fn history(&self) -> &[PointTransaction] {
        self.state.transactions()
    }

    /// Points expiring within `days`.
    ///
    /// Reports the stored expiring-soon figure, which covers
    /// [`EXPIRY_HORIZON_DAYS`](rules::EXPIRY_HORIZON_DAYS); `days` does not
    /// change the result.
    pub fn points_expiring_in_days(&self, _days: u32) -> Points {
        self.state.expiring_soon_points()
    }

    pub fn grade(&self) -> PointGrade {
        PointGrade::for_total(self.state.total_points())
    }

    pub fn total_points(&self) -> Points {
        self.state.total_points()
    }

    pub fn usable_points(&self) -> Points {
        self.state.usable_points()
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn store_key(&self) -> &str {
        &self.key
    }

    pub fn summary(&self) -> PointSummary {
        let grade = self.grade();
        PointSummary {
            total_points: self.state.total_points(),
            usable_points: self.state.usable_points(),
            expiring_soon_points: self.points_expiring_in_days(rules::EXPIRY_HORIZON_DAYS),
            expiry_horizon_days: rules::EXPIRY_HORIZON_DAYS,
            total_display: format_points(self.state.total_points()),
            usable_display: format_points(self.state.usable_points()),
            expiring_soon_display: format_points(self.state.expiring_soon_points()),
            grade,
            rate_hint: grade.rate_hint_text(),
        }
    }

    fn latest(&self) -> &PointTransaction {
        &self.state.transactions()[0]
    }

    /// Writes the current snapshot, reporting failure to the caller.
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`](crate::StoreError) from encoding or saving.
    pub fn flush(&self) -> StoreResult<()> {
        let raw = store::encode_snapshot(&self.state)?;
        self.store.save(&self.key, &raw)
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            error!(key = %self.key, "failed to persist point ledger: {}", e);
        }
    }
}
