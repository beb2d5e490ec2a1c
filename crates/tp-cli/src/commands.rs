//! Subcommands

use chrono::NaiveDate;
use clap::Subcommand;
use tracing::info;

use tp_core::error::TpError;
use tp_core::traits::Id;
use tp_core::types::{weeks_in_month, Week};
use tp_db::Store;
use tp_services::Services;

#[derive(Subcommand)]
pub enum Command {
    /// Append billing windows to every active repeat period
    UpdateWindows {
        /// Last date a new window may start on (default today)
        #[arg(long)]
        boundary: Option<NaiveDate>,
    },
    /// Resolve and store a person's allocation blocks for one week
    Allocate {
        #[arg(long)]
        contact: Id,
        /// Any day of the week (YYYY-MM-DD)
        #[arg(long)]
        week: NaiveDate,
    },
    /// Print the weekly and average commitment of an assignment
    Commitment {
        #[arg(long)]
        assignment: Id,
        /// Any day of the week (default today)
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// Print a person's overtime for one month
    Overtime {
        #[arg(long)]
        contact: Id,
        /// Month as YYYY-MM
        #[arg(long, value_parser = parse_month)]
        month: NaiveDate,
    },
    /// Print a person's hours between two dates as JSON
    Summary {
        #[arg(long)]
        contact: Id,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::UpdateWindows { .. } => "update-windows",
            Command::Allocate { .. } => "allocate",
            Command::Commitment { .. } => "commitment",
            Command::Overtime { .. } => "overtime",
            Command::Summary { .. } => "summary",
        }
    }

    pub async fn run<S: Store>(&self, services: &Services<S>) -> anyhow::Result<()> {
        match *self {
            Command::UpdateWindows { boundary } => {
                let created = services.billing.update_active_periods(boundary).await?;
                for window in &created {
                    println!("period {}: {}", window.period_id, window);
                }
                info!(created = created.len(), "Billing windows updated");
            }
            Command::Allocate { contact, week } => {
                let blocks = services.allocator.allocate_week(contact, week).await?;
                for block in &blocks {
                    println!("assignment {}: {} hours ({})", block.assignment_id, block.hours, block.week());
                }
                info!(contact, blocks = blocks.len(), "Week allocated");
            }
            Command::Commitment { assignment, week } => {
                let day = week.unwrap_or_else(|| services.today());
                let weekly = services.allocator.weekly_commitment(assignment, day).await?;
                println!("{}: {} hours", Week::containing(day), weekly);

                match services.allocator.average_weekly_commitment(assignment).await {
                    Ok(average) => println!("average per remaining week: {} hours", average),
                    Err(TpError::NoWeeksRemaining { .. }) => println!("no weeks remaining on the contract"),
                    Err(err) => return Err(err.into()),
                }
            }
            Command::Overtime { contact, month } => {
                for week in weeks_in_month(month) {
                    let overtime = services.overtime.overtime_hours_in_week(contact, week.start()).await?;
                    println!("{}: {} hours", week, overtime);
                }
                let total = services.overtime.total_monthly_overtime(contact, month).await?;
                println!("total: {} hours", total);
            }
            Command::Summary { contact, from, to } => {
                let summary = services.ledger.summary(contact, from, to).await?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Ok(())
    }
}

/// `YYYY-MM` to the first day of that month
fn parse_month(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|_| format!("expected a month as YYYY-MM, got {}", value))
}
