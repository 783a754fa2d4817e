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

//! Ledger state.
//!
//! # Example
//!
//! ```
//! use point_ledger::LedgerState;
//!
//! let state = LedgerState::default();
//! assert_eq!(state.usable_points(), 0);
//! assert!(state.transactions().is_empty());
//! ```

use crate::base::{Points, TransactionId};
use crate::error::{LedgerError, StateError};
use crate::transaction::PointTransaction;
use crate::transaction_log::TransactionLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Balances plus the full point history.
///
/// `total_points` is lifetime earned minus expired, so redemptions only
/// touch `usable_points`:
///
//  earn   ──► total += n, usable += n
//  use    ──► usable -= n
//  expire ──► total -= n, usable -= n, expiring_soon -= n (saturating)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    total_points: Points,
    usable_points: Points,
    /// Stored figure for the 30-day horizon, not derived from the log.
    expiring_soon_points: Points,
    transactions: TransactionLog,
}

impl LedgerState {
    /// Builds a state from explicit parts. `transactions` must be newest first.
    ///
    /// # Errors
    ///
    /// - [`StateError::UsableExceedsTotal`] - `usable_points > total_points`.
    /// - [`StateError::IdsOutOfOrder`] - `transactions` is not strictly newest first.
    pub fn new(
        total_points: Points,
        usable_points: Points,
        expiring_soon_points: Points,
        transactions: Vec<PointTransaction>,
    ) -> Result<Self, StateError> {
        let state = Self {
            total_points,
            usable_points,
            expiring_soon_points,
            transactions: TransactionLog::from_newest_first(transactions)?,
        };
        state.validate()?;
        Ok(state)
    }

    /// Sample profile used to seed a ledger on first load.
    pub fn demo() -> Self {
        let welcome = seed_time(1_706_778_000);
        let order = seed_time(1_709_289_000);
        let review = seed_time(1_709_661_600);
        let checkout = seed_time(1_710_080_400);

        // Oldest first; push prepends.
        let mut transactions = TransactionLog::new();
        transactions.push(PointTransaction::earn(
            seed_id(welcome),
            5_000,
            "Welcome bonus",
            None,
            welcome,
        ));
        transactions.push(PointTransaction::earn(
            seed_id(order),
            8_000,
            "Order reward",
            Some("ORD-20240301-0001".to_string()),
            order,
        ));
        transactions.push(PointTransaction::earn(
            seed_id(review),
            2_000,
            "Review reward",
            None,
            review,
        ));
        transactions.push(PointTransaction::redeem(
            seed_id(checkout),
            2_500,
            "Redeemed at checkout",
            Some("ORD-20240310-0003".to_string()),
            checkout,
        ));

        Self {
            total_points: 15_000,
            usable_points: 12_500,
            expiring_soon_points: 2_500,
            transactions,
        }
    }

    /// Checks the invariants every operation relies on.
    ///
    /// Amount signs are already enforced when a transaction is built or
    /// deserialized.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.usable_points > self.total_points {
            return Err(StateError::UsableExceedsTotal {
                usable: self.usable_points,
                total: self.total_points,
            });
        }
        self.transactions.check_order()
    }

    pub fn total_points(&self) -> Points {
        self.total_points
    }

    pub fn usable_points(&self) -> Points {
        self.usable_points
    }

    pub fn expiring_soon_points(&self) -> Points {
        self.expiring_soon_points
    }

    /// Full history, newest first.
    pub fn transactions(&self) -> &[PointTransaction] {
        self.transactions.as_slice()
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.usable_points <= self.total_points,
            "Invariant violated: usable {} exceeds total {}",
            self.usable_points,
            self.total_points
        );
        debug_assert!(
            self.transactions.latest().is_none_or(PointTransaction::is_well_formed),
            "Invariant violated: transaction amount sign does not match its kind"
        );
    }

    /// Credits `points` to both balances.
    pub(crate) fn earn(
        &mut self,
        points: Points,
        description: impl Into<String>,
        order_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> &PointTransaction {
        let id = self.transactions.next_id(now);
        self.transactions
            .push(PointTransaction::earn(id, points, description, order_reference, now));
        self.total_points = self.total_points.saturating_add(points);
        self.usable_points = self.usable_points.saturating_add(points);
        self.assert_invariants();
        self.head()
    }

    /// Debits `points` from the usable balance only.
    pub(crate) fn redeem(
        &mut self,
        points: Points,
        description: impl Into<String>,
        order_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&PointTransaction, LedgerError> {
        self.check_debit(points)?;
        let id = self.transactions.next_id(now);
        self.transactions
            .push(PointTransaction::redeem(id, points, description, order_reference, now));
        self.usable_points -= points;
        self.assert_invariants();
        Ok(self.head())
    }

    /// Removes `points` from both balances and the expiring-soon figure.
    pub(crate) fn expire(
        &mut self,
        points: Points,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<&PointTransaction, LedgerError> {
        self.check_debit(points)?;
        let id = self.transactions.next_id(now);
        self.transactions
            .push(PointTransaction::expire(id, points, description, now));
        self.usable_points -= points;
        self.total_points = self.total_points.saturating_sub(points);
        self.expiring_soon_points = self.expiring_soon_points.saturating_sub(points);
        self.assert_invariants();
        Ok(self.head())
    }

    fn check_debit(&self, points: Points) -> Result<(), LedgerError> {
        if points == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if points > self.usable_points {
            return Err(LedgerError::InsufficientBalance {
                requested: points,
                usable: self.usable_points,
            });
        }
        Ok(())
    }

    fn head(&self) -> &PointTransaction {
        &self.transactions.as_slice()[0]
    }
}

fn seed_time(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn seed_id(at: DateTime<Utc>) -> TransactionId {
    TransactionId(u64::try_from(at.timestamp_millis()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionKind;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    // === Balance Mutation Tests ===

    #[test]
    fn earn_credits_both_balances() {
        let mut state = LedgerState::default();
        let tx = state.earn(1_000, "seed", None, now()).clone();
        assert_eq!(tx.kind(), TransactionKind::Earn);
        assert_eq!(tx.amount(), 1_000);
        assert_eq!(state.total_points(), 1_000);
        assert_eq!(state.usable_points(), 1_000);
    }

    #[test]
    fn redeem_leaves_total_untouched() {
        let mut state = LedgerState::default();
        state.earn(1_000, "seed", None, now());
        state.redeem(400, "redeem", None, now()).unwrap();
        assert_eq!(state.total_points(), 1_000);
        assert_eq!(state.usable_points(), 600);
        assert_eq!(state.transactions()[0].amount(), -400);
    }

    #[test]
    fn redeem_insufficient_returns_error() {
        let mut state = LedgerState::default();
        state.earn(100, "seed", None, now());
        let before = state.clone();

        let result = state.redeem(101, "too much", None, now()).map(|tx| tx.clone());
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                requested: 101,
                usable: 100
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn redeem_zero_is_invalid() {
        let mut state = LedgerState::default();
        state.earn(100, "seed", None, now());
        let result = state.redeem(0, "nothing", None, now()).map(|tx| tx.clone());
        assert_eq!(result, Err(LedgerError::InvalidAmount));
        assert_eq!(state.transactions().len(), 1);
    }

    #[test]
    fn expire_reduces_total_usable_and_expiring() {
        let mut state = LedgerState::new(1_000, 800, 150, Vec::new()).unwrap();
        state.expire(200, "Expired", now()).unwrap();
        assert_eq!(state.total_points(), 800);
        assert_eq!(state.usable_points(), 600);
        assert_eq!(state.expiring_soon_points(), 0);
        assert_eq!(state.transactions()[0].kind(), TransactionKind::Expire);
        assert_eq!(state.transactions()[0].amount(), -200);
    }

    #[test]
    fn expire_insufficient_returns_error() {
        let mut state = LedgerState::new(1_000, 50, 50, Vec::new()).unwrap();
        let result = state.expire(60, "Expired", now()).map(|tx| tx.clone());
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                requested: 60,
                usable: 50
            })
        );
    }

    // === Demo Seed Tests ===

    #[test]
    fn demo_seed_is_consistent() {
        let state = LedgerState::demo();
        assert_eq!(state.total_points(), 15_000);
        assert_eq!(state.usable_points(), 12_500);
        assert_eq!(state.expiring_soon_points(), 2_500);
        assert_eq!(state.transactions().len(), 4);

        let earned: i64 = state
            .transactions()
            .iter()
            .filter(|tx| tx.kind() == TransactionKind::Earn)
            .map(PointTransaction::amount)
            .sum();
        let net: i64 = state.transactions().iter().map(PointTransaction::amount).sum();
        assert_eq!(earned, 15_000);
        assert_eq!(net, 12_500);
        assert!(state.transactions.ids_strictly_descending());
    }

    #[test]
    fn transactions_after_demo_get_newer_ids() {
        let mut state = LedgerState::demo();
        let head_before = state.transactions()[0].id();
        let id = state.earn(10, "later", None, now()).id();
        assert!(id > head_before);
    }

    #[test]
    fn new_rejects_usable_above_total() {
        assert_eq!(
            LedgerState::new(0, 100, 0, Vec::new()),
            Err(StateError::UsableExceedsTotal {
                usable: 100,
                total: 0
            })
        );
    }

    #[test]
    fn new_rejects_out_of_order_log() {
        let entries = vec![
            PointTransaction::earn(TransactionId(1), 10, "newest", None, now()),
            PointTransaction::earn(TransactionId(2), 10, "oldest", None, now()),
        ];
        assert_eq!(
            LedgerState::new(20, 20, 0, entries),
            Err(StateError::IdsOutOfOrder(TransactionId(2)))
        );
    }

    #[test]
    fn demo_seed_validates() {
        assert_eq!(LedgerState::demo().validate(), Ok(()));
    }

    // === Serialization Tests ===

    #[test]
    fn serializes_with_snapshot_field_names() {
        let state = LedgerState::demo();
        let value: serde_json::Value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["totalPoints"], 15_000);
        assert_eq!(value["usablePoints"], 12_500);
        assert_eq!(value["expiringSoonPoints"], 2_500);
        assert_eq!(value["transactions"].as_array().unwrap().len(), 4);
        assert_eq!(value["transactions"][0]["type"], "use");
    }

    #[test]
    fn round_trip_preserves_order_and_balances() {
        let mut state = LedgerState::default();
        state.earn(1_000, "seed", None, now());
        state.redeem(400, "redeem", Some("ORD-1".to_string()), now()).unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let back: LedgerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
