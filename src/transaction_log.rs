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

//! Append-only point history.
//!
//! Entries are kept newest first. The log only grows at its head; historical
//! entries are never edited or removed.

use crate::base::TransactionId;
use crate::error::StateError;
use crate::transaction::PointTransaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newest-first transaction log with monotonic id allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionLog {
    entries: Vec<PointTransaction>,
}

impl TransactionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from entries already ordered newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::IdsOutOfOrder`] if ids do not strictly decrease.
    pub fn from_newest_first(entries: Vec<PointTransaction>) -> Result<Self, StateError> {
        let log = Self { entries };
        log.check_order()?;
        Ok(log)
    }

    /// Allocates an id for a transaction created at `now`.
    ///
    /// Uses the clock in milliseconds, bumped past the newest entry when the
    /// clock has not advanced (or went backwards).
    pub fn next_id(&self, now: DateTime<Utc>) -> TransactionId {
        let candidate = TransactionId(u64::try_from(now.timestamp_millis()).unwrap_or(0));
        match self.latest() {
            Some(latest) if latest.id() >= candidate => latest.id().next(),
            _ => candidate,
        }
    }

    /// Prepends a transaction.
    pub fn push(&mut self, transaction: PointTransaction) {
        debug_assert!(
            self.latest().is_none_or(|latest| latest.id() < transaction.id()),
            "Invariant violated: transaction id {} is not newer than the log head",
            transaction.id()
        );
        self.entries.insert(0, transaction);
    }

    /// The most recent transaction.
    pub fn latest(&self) -> Option<&PointTransaction> {
        self.entries.first()
    }

    pub fn as_slice(&self) -> &[PointTransaction] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointTransaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether ids strictly decrease from head to tail.
    pub fn ids_strictly_descending(&self) -> bool {
        self.check_order().is_ok()
    }

    /// Fails on the first entry whose id is not older than its predecessor.
    ///
    /// A log that passes has its largest id at the head, which is what
    /// [`next_id`](Self::next_id) relies on.
    pub fn check_order(&self) -> Result<(), StateError> {
        match self.entries.windows(2).find(|pair| pair[0].id() <= pair[1].id()) {
            Some(pair) => Err(StateError::IdsOutOfOrder(pair[1].id())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn next_id_uses_clock_millis_on_empty_log() {
        let log = TransactionLog::new();
        assert_eq!(log.next_id(at(1_700_000_000_123)), TransactionId(1_700_000_000_123));
    }

    #[test]
    fn next_id_bumps_past_head_when_clock_stalls() {
        let mut log = TransactionLog::new();
        let now = at(1_000);
        let first = log.next_id(now);
        log.push(PointTransaction::earn(first, 10, "a", None, now));

        let second = log.next_id(now);
        assert_eq!(second, TransactionId(1_001));
        log.push(PointTransaction::earn(second, 10, "b", None, now));

        // Clock moved backwards
        assert_eq!(log.next_id(at(500)), TransactionId(1_002));
    }

    #[test]
    fn push_prepends() {
        let mut log = TransactionLog::new();
        log.push(PointTransaction::earn(TransactionId(1), 10, "first", None, at(0)));
        log.push(PointTransaction::redeem(TransactionId(2), 5, "second", None, at(0)));

        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().unwrap().description(), "second");
        assert_eq!(log.as_slice()[1].description(), "first");
        assert!(log.ids_strictly_descending());
    }

    #[test]
    fn from_newest_first_rejects_out_of_order_ids() {
        let entries = vec![
            PointTransaction::earn(TransactionId(5), 1, "head", None, at(0)),
            PointTransaction::earn(TransactionId(1_711_962_000_000), 1, "older", None, at(0)),
        ];
        assert_eq!(
            TransactionLog::from_newest_first(entries),
            Err(StateError::IdsOutOfOrder(TransactionId(1_711_962_000_000)))
        );
    }

    #[test]
    fn from_newest_first_rejects_duplicate_ids() {
        let entries = vec![
            PointTransaction::earn(TransactionId(7), 1, "a", None, at(0)),
            PointTransaction::earn(TransactionId(7), 1, "b", None, at(0)),
        ];
        assert!(TransactionLog::from_newest_first(entries).is_err());
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut log = TransactionLog::new();
        log.push(PointTransaction::earn(TransactionId(1), 10, "first", None, at(0)));
        let value = serde_json::to_value(&log).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 1);
    }
}
