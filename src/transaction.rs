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

//! Point transactions.
//!
//! Every balance change is recorded as a [`PointTransaction`]. The sign of
//! the amount is fixed by the [`TransactionKind`]:
//! - [`Earn`](TransactionKind::Earn) → positive
//! - [`Use`](TransactionKind::Use) and [`Expire`](TransactionKind::Expire) → negative

use crate::base::{Points, TransactionId};
use crate::error::StateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Earn,
    Use,
    Expire,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Use => "use",
            Self::Expire => "expire",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the point history.
///
/// Fields are private so the amount sign cannot drift from the kind;
/// build entries with [`earn`](Self::earn), [`redeem`](Self::redeem) or
/// [`expire`](Self::expire). Deserialized entries are checked the same way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "StoredTransaction")]
pub struct PointTransaction {
    id: TransactionId,
    #[serde(rename = "type")]
    kind: TransactionKind,
    amount: i64,
    description: String,
    #[serde(rename = "orderId", default, skip_serializing_if = "Option::is_none")]
    order_reference: Option<String>,
    #[serde(rename = "createdAt")]
    timestamp: DateTime<Utc>,
}

/// Wire shape of a transaction before the sign check.
#[derive(Deserialize)]
struct StoredTransaction {
    id: TransactionId,
    #[serde(rename = "type")]
    kind: TransactionKind,
    amount: i64,
    description: String,
    #[serde(rename = "orderId", default)]
    order_reference: Option<String>,
    #[serde(rename = "createdAt")]
    timestamp: DateTime<Utc>,
}

impl TryFrom<StoredTransaction> for PointTransaction {
    type Error = StateError;

    fn try_from(stored: StoredTransaction) -> Result<Self, Self::Error> {
        let tx = PointTransaction {
            id: stored.id,
            kind: stored.kind,
            amount: stored.amount,
            description: stored.description,
            order_reference: stored.order_reference,
            timestamp: stored.timestamp,
        };
        if !tx.is_well_formed() {
            return Err(StateError::SignMismatch {
                id: tx.id,
                kind: tx.kind,
                amount: tx.amount,
            });
        }
        Ok(tx)
    }
}

impl PointTransaction {
    pub fn earn(
        id: TransactionId,
        points: Points,
        description: impl Into<String>,
        order_reference: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(id, TransactionKind::Earn, signed(points), description, order_reference, timestamp)
    }

    pub fn redeem(
        id: TransactionId,
        points: Points,
        description: impl Into<String>,
        order_reference: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(id, TransactionKind::Use, -signed(points), description, order_reference, timestamp)
    }

    pub fn expire(
        id: TransactionId,
        points: Points,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(id, TransactionKind::Expire, -signed(points), description, None, timestamp)
    }

    fn new(
        id: TransactionId,
        kind: TransactionKind,
        amount: i64,
        description: impl Into<String>,
        order_reference: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            amount,
            description: description.into(),
            order_reference,
            timestamp: truncate_to_seconds(timestamp),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Signed amount: positive for earn, negative for use and expire.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Absolute number of points moved.
    pub fn points(&self) -> Points {
        self.amount.unsigned_abs()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn order_reference(&self) -> Option<&str> {
        self.order_reference.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the amount sign agrees with the kind.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            TransactionKind::Earn => self.amount >= 0,
            TransactionKind::Use | TransactionKind::Expire => self.amount <= 0,
        }
    }
}

// Balances never approach i64::MAX in practice; saturate rather than wrap.
fn signed(points: Points) -> i64 {
    i64::try_from(points).unwrap_or(i64::MAX)
}

fn truncate_to_seconds(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.timestamp(), 0).unwrap_or(timestamp)
}
