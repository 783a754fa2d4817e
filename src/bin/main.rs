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

use clap::{Parser, Subcommand};
use csv::WriterBuilder;
use point_ledger::{
    Clock, ConfigError, LedgerConfig, LedgerError, LedgerService, Points, PointTransaction,
    SnapshotStore, StoreError, format_points,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Point Ledger - Manage a storefront loyalty point balance
///
/// Keeps a file-backed point ledger and applies earn, use, and expire
/// operations to it. History is written as CSV to stdout.
#[derive(Parser, Debug)]
#[command(name = "point-ledger")]
#[command(about = "A loyalty point ledger for storefront orders", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the ledger snapshot (overrides the config file)
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show balances and grade
    Summary,
    /// Credit points
    Earn {
        points: Points,
        #[arg(short, long, default_value = "Manual credit")]
        description: String,
        #[arg(long)]
        order: Option<String>,
    },
    /// Redeem points from the usable balance
    Use {
        points: Points,
        #[arg(short, long, default_value = "Redeemed")]
        description: String,
        #[arg(long)]
        order: Option<String>,
    },
    /// Expire points
    Expire {
        points: Points,
        #[arg(short, long, default_value = "Points expired")]
        description: String,
    },
    /// Write the transaction history as CSV
    History,
    /// Show points earned by, and redeemable against, an order amount
    Quote { order_amount: u64 },
    /// Simulate checkout: redeem points, then earn on the amount paid
    Settle {
        order_amount: u64,
        #[arg(long, default_value_t = 0)]
        redeem: Points,
        #[arg(long)]
        order: Option<String>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("cannot write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot write history: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot redeem {requested} points on this order (limit {limit})")]
    RedemptionLimit { requested: Points, limit: Points },
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match LedgerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => LedgerConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    init_tracing(&config.log_filter);

    if let Err(e) = run(&config, args.command, std::io::stdout()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Installs the stderr subscriber, filtered by `POINT_LEDGER_LOG` when set.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("POINT_LEDGER_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run<W: Write>(config: &LedgerConfig, command: Command, mut out: W) -> Result<(), CliError> {
    let mut ledger = config.open_ledger()?;

    match command {
        Command::Summary => {
            let summary = ledger.summary();
            writeln!(out, "grade:         {} ({} accrual)", summary.grade, summary.rate_hint)?;
            writeln!(out, "total:         {}", summary.total_display)?;
            writeln!(out, "usable:        {}", summary.usable_display)?;
            writeln!(out, "expiring soon: {}", summary.expiring_soon_display)?;
        }
        Command::Earn {
            points,
            description,
            order,
        } => {
            let tx = ledger.earn(points, description, order);
            info!(id = %tx.id(), "credited {}", format_points(points));
            ledger.flush()?;
        }
        Command::Use {
            points,
            description,
            order,
        } => {
            let tx = ledger.use_points(points, description, order)?;
            info!(id = %tx.id(), "redeemed {}", format_points(points));
            ledger.flush()?;
        }
        Command::Expire {
            points,
            description,
        } => {
            let tx = ledger.expire(points, description)?;
            info!(id = %tx.id(), "expired {}", format_points(points));
            ledger.flush()?;
        }
        Command::History => write_history(ledger.history(), out)?,
        Command::Quote { order_amount } => {
            writeln!(
                out,
                "earn: {}\nmax usable: {}",
                format_points(ledger.calculate_earned_points(order_amount)),
                format_points(ledger.max_usable_points(order_amount)),
            )?;
        }
        Command::Settle {
            order_amount,
            redeem,
            order,
        } => {
            let settlement = settle_order(&mut ledger, order_amount, redeem, order)?;
            ledger.flush()?;
            writeln!(
                out,
                "paid: {}\nredeemed: {}\nearned: {}",
                settlement.paid,
                format_points(settlement.redeemed),
                format_points(settlement.earned),
            )?;
        }
    }

    Ok(())
}

/// Outcome of a simulated checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Settlement {
    redeemed: Points,
    paid: u64,
    earned: Points,
}

/// Redeems `redeem` points against the order, then credits points on the
/// amount actually paid.
///
/// # Errors
///
/// Returns [`CliError::RedemptionLimit`] if `redeem` exceeds the order's
/// redemption limit. Nothing is recorded in that case.
fn settle_order<S: SnapshotStore, C: Clock>(
    ledger: &mut LedgerService<S, C>,
    order_amount: u64,
    redeem: Points,
    order: Option<String>,
) -> Result<Settlement, CliError> {
    let limit = ledger.max_usable_points(order_amount);
    if redeem > limit {
        return Err(CliError::RedemptionLimit {
            requested: redeem,
            limit,
        });
    }

    if redeem > 0 {
        ledger.use_points(redeem, "Redeemed at checkout", order.clone())?;
    }

    let paid = order_amount - redeem;
    let earned = ledger.calculate_earned_points(paid);
    ledger.earn(earned, "Order reward", order);

    Ok(Settlement {
        redeemed: redeem,
        paid,
        earned,
    })
}

const HISTORY_HEADER: [&str; 6] = ["id", "type", "amount", "description", "order", "created_at"];

/// One CSV row of the history export.
#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    id: u64,
    #[serde(rename = "type")]
    kind: &'static str,
    amount: i64,
    description: &'a str,
    order: &'a str,
    created_at: String,
}

/// Write the transaction history, newest first.
///
/// The header row is always written, even for an empty history.
///
/// # CSV Format
///
/// Columns: `id, type, amount, description, order, created_at`
///
/// ```csv
/// id,type,amount,description,order,created_at
/// 1710080400000,use,-2500,Redeemed at checkout,ORD-20240310-0003,2024-03-10T14:20:00+00:00
/// ```
fn write_history<W: Write>(history: &[PointTransaction], writer: W) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HISTORY_HEADER)?;

    for tx in history {
        wtr.serialize(HistoryRow {
            id: tx.id().0,
            kind: tx.kind().as_str(),
            amount: tx.amount(),
            description: tx.description(),
            order: tx.order_reference().unwrap_or(""),
            created_at: tx.timestamp().to_rfc3339(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
