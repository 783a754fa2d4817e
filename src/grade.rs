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

//! Grade tiers and point formatting for display.
//!
//! Grades are cosmetic: the accrual hint shown next to a grade is never used
//! by [`calculate_earned_points`](crate::rules::calculate_earned_points).

use crate::base::Points;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PointGrade {
    Bronze,
    Silver,
    Gold,
    Vip,
}

impl PointGrade {
    /// Tier for a lifetime point total. Thresholds are inclusive.
    pub fn for_total(total_points: Points) -> Self {
        match total_points {
            100_000.. => Self::Vip,
            50_000.. => Self::Gold,
            20_000.. => Self::Silver,
            _ => Self::Bronze,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Vip => "VIP",
            Self::Gold => "GOLD",
            Self::Silver => "SILVER",
            Self::Bronze => "BRONZE",
        }
    }

    /// Advertised accrual rate, in percent.
    pub fn rate_hint(&self) -> Decimal {
        match self {
            Self::Vip => dec!(3),
            Self::Gold => dec!(2),
            Self::Silver => dec!(1.5),
            Self::Bronze => dec!(1),
        }
    }

    /// Rate hint as display text, e.g. `"1.5%"`.
    pub fn rate_hint_text(&self) -> String {
        format!("{}%", self.rate_hint().normalize())
    }
}

impl fmt::Display for PointGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Formats points with thousands separators and a `P` suffix: `15,000P`.
pub fn format_points(points: Points) -> String {
    let digits = points.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push('P');
    out
}
