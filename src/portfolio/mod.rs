// src/portfolio/mod.rs
//! Portfolio-level aggregation over current records and value history.

mod models;

pub use models::*;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::models::{HistoryEntry, PropertyRecord, PropertyStatus};

/// Roll up every record's current state into one snapshot.
///
/// Value, loan and net totals cover all records, with absent fields counting
/// as zero. Rental income, loan repayments and expenses only count toward
/// the totals for investment properties.
pub fn summarize(records: &[PropertyRecord]) -> PortfolioStats {
    let mut active = 0;
    let mut pending = 0;
    let mut errored = 0;
    let mut total_value = Decimal::ZERO;
    let mut total_loans = Decimal::ZERO;
    let mut total_rent = Decimal::ZERO;
    let mut total_repayments = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    let mut change_sum = Decimal::ZERO;
    let mut change_count = 0u32;

    for record in records {
        match record.status {
            PropertyStatus::Active => active += 1,
            PropertyStatus::Pending => pending += 1,
            PropertyStatus::Error => errored += 1,
        }

        total_value += record.current_value.unwrap_or(Decimal::ZERO);
        total_loans += record.outstanding_loan.unwrap_or(Decimal::ZERO);

        if record.is_investment() {
            total_rent += record.annual_rental_income.unwrap_or(Decimal::ZERO);
            total_repayments += record.annual_loan_repayments.unwrap_or(Decimal::ZERO);
            total_expenses += record.yearly_expenses.unwrap_or(Decimal::ZERO);
        }

        if let Some(change) = record.daily_change_percent {
            change_sum += change;
            change_count += 1;
        }
    }

    let cash_flow = total_rent - (total_repayments + total_expenses);
    let average_daily_change_percent = if change_count > 0 {
        Some((change_sum / Decimal::from(change_count)).round_dp(2))
    } else {
        None
    };

    PortfolioStats {
        total_properties: records.len(),
        active,
        pending,
        errored,
        total_property_value: total_value,
        total_outstanding_loans: total_loans,
        // Subtracting the totals keeps net consistent with them even when a
        // record carries a loan without a value.
        total_net_value: total_value - total_loans,
        total_annual_rental_income: total_rent,
        total_annual_loan_repayments: total_repayments,
        total_yearly_expenses: total_expenses,
        overall_yearly_cash_flow: cash_flow,
        overall_yearly_shortage: -cash_flow,
        is_cash_flow_positive: cash_flow >= Decimal::ZERO,
        average_daily_change_percent,
    }
}

/// Aggregate history entries into a daily series over the trailing window.
///
/// Entries older than `window_days` before `now`, or stamped after `now`,
/// are dropped; the rest are bucketed by UTC calendar date and summed.
/// Dates without entries are omitted rather than zero-filled.
pub fn timeseries(
    entries: &[HistoryEntry],
    window_days: u32,
    now: DateTime<Utc>,
) -> Vec<ValuePoint> {
    let cutoff = now - Duration::days(i64::from(window_days));

    let mut buckets: BTreeMap<NaiveDate, (Decimal, Decimal, Decimal)> = BTreeMap::new();

    for entry in entries {
        if entry.recorded_at < cutoff || entry.recorded_at > now {
            continue;
        }
        let bucket = buckets.entry(entry.recorded_at.date_naive()).or_default();
        bucket.0 += entry.value;
        bucket.1 += entry.loan.unwrap_or(Decimal::ZERO);
        bucket.2 += entry.net_value.unwrap_or(Decimal::ZERO);
    }

    buckets
        .into_iter()
        .map(|(date, (total_value, total_loan, total_net))| ValuePoint {
            date,
            total_value,
            total_loan,
            total_net,
        })
        .collect()
}
