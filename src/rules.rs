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

//! Accrual and redemption rules.
//!
//! Rates are [`Decimal`] so that `floor(amount × rate)` is exact for any
//! order amount.

use crate::base::Points;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

/// Flat accrual rate applied to every settled order.
pub const ACCRUAL_RATE: Decimal = dec!(0.01);

/// Largest share of an order that may be paid with points.
pub const MAX_REDEMPTION_RATIO: Decimal = dec!(0.5);

/// Horizon reported by the expiring-soon figure.
pub const EXPIRY_HORIZON_DAYS: u32 = 30;

/// Points earned for an order: `floor(order_amount × 1%)`.
///
/// Grade tiers do not affect this.
pub fn calculate_earned_points(order_amount: u64) -> Points {
    floor_share(order_amount, ACCRUAL_RATE)
}

/// Redemption cap for an order: `min(floor(order_amount × 50%), usable)`.
pub fn max_usable_points(order_amount: u64, usable_points: Points) -> Points {
    floor_share(order_amount, MAX_REDEMPTION_RATIO).min(usable_points)
}

fn floor_share(amount: u64, rate: Decimal) -> Points {
    (Decimal::from(amount) * rate).floor().to_u64().unwrap_or(0)
}
