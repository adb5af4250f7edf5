//! Provides the monthly aggregation of recurring entries.
//!
//! Every amount is converted into the base currency through the reference
//! currency of the rate provider: entry currency to reference using the
//! entry's rate for the month, then reference to base using the base
//! currency's rate for the same month.
use crate::core::entry::{Cadence, Entry};
use crate::core::month::MonthRef;
use crate::core::rates::MonthlyRateProvider;
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Contribution of a single entry to one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseBreakdown {
    pub entry_id: String,
    pub name: String,
    pub currency: String,
    pub cadence: Cadence,
    /// Per-month amount in the entry's own currency.
    pub amount: f64,
    pub base_value: f64,
}

/// Aggregate of all active entries for one month, in the base currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub month: MonthRef,
    pub total_base: f64,
    pub breakdown: Vec<ExpenseBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBalance {
    pub month: MonthRef,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Computes the breakdown and total of `entries` for a single month.
///
/// Invalid and inactive entries are skipped. Rate lookups cannot fail, so
/// neither can this function.
pub async fn calculate_month_total(
    entries: &[Entry],
    month: &MonthRef,
    base_currency: &str,
    rates: &(dyn MonthlyRateProvider + Send + Sync),
) -> MonthlyTotal {
    let base_currency = base_currency.trim().to_uppercase();
    let base_is_reference = base_currency == rates.reference_currency().to_uppercase();
    let base_rate = rates.rate_for_month(month, &base_currency).await;

    let mut breakdown = Vec::new();
    let mut total_base = 0.0;

    for entry in entries {
        if !entry.is_valid() {
            debug!("Skipping invalid entry {} ({:?})", entry.id, entry.name);
            continue;
        }
        if !entry.is_active(month) {
            continue;
        }

        let currency = entry.currency_code();
        let amount = entry.monthly_amount();
        let entry_rate = rates.rate_for_month(month, &currency).await;
        let reference_value = amount * entry_rate;
        let base_value = if base_is_reference {
            reference_value
        } else {
            reference_value / base_rate
        };
        debug!(
            "{} {}: {amount} {currency} at {entry_rate} -> {base_value} {base_currency}",
            month, entry.name
        );

        total_base += base_value;
        breakdown.push(ExpenseBreakdown {
            entry_id: entry.id.clone(),
            name: entry.name.clone(),
            currency,
            cadence: entry.cadence,
            amount,
            base_value,
        });
    }

    MonthlyTotal {
        month: *month,
        total_base,
        breakdown,
    }
}

/// Computes one [`MonthlyTotal`] per month, in the order the months are given.
///
/// Months are evaluated concurrently; the rate provider is responsible for
/// not fetching a month twice. `update_callback` is invoked once per month.
pub async fn calculate_monthly_totals(
    entries: &[Entry],
    months: &[MonthRef],
    base_currency: &str,
    rates: &(dyn MonthlyRateProvider + Send + Sync),
    update_callback: &(dyn Fn() + Send + Sync),
) -> Vec<MonthlyTotal> {
    let futures = months.iter().map(|month| async move {
        let total = calculate_month_total(entries, month, base_currency, rates).await;
        update_callback();
        total
    });
    join_all(futures).await
}

/// Pairs income and expense totals by month key, following the month order
/// of `expenses`. Months missing on one side count as zero there.
pub fn monthly_balance(incomes: &[MonthlyTotal], expenses: &[MonthlyTotal]) -> Vec<MonthlyBalance> {
    let income_by_month: HashMap<String, f64> = incomes
        .iter()
        .map(|t| (t.month.key(), t.total_base))
        .collect();

    let mut seen = Vec::new();
    let mut balances = Vec::new();
    for total in expenses {
        let income = income_by_month
            .get(&total.month.key())
            .copied()
            .unwrap_or(0.0);
        seen.push(total.month);
        balances.push(MonthlyBalance {
            month: total.month,
            income,
            expense: total.total_base,
            balance: income - total.total_base,
        });
    }
    for total in incomes.iter().filter(|t| !seen.contains(&t.month)) {
        balances.push(MonthlyBalance {
            month: total.month,
            income: total.total_base,
            expense: 0.0,
            balance: total.total_base,
        });
    }
    balances
}

/// Keeps only the breakdown rows matching `predicate` and recomputes totals.
pub fn filter_totals(
    totals: &[MonthlyTotal],
    predicate: impl Fn(&ExpenseBreakdown) -> bool,
) -> Vec<MonthlyTotal> {
    totals
        .iter()
        .map(|total| {
            let breakdown: Vec<ExpenseBreakdown> = total
                .breakdown
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect();
            let total_base = breakdown.iter().map(|row| row.base_value).sum();
            MonthlyTotal {
                month: total.month,
                total_base,
                breakdown,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Cadence,
    Amount,
    BaseValue,
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "name" => Ok(SortKey::Name),
            "cadence" => Ok(SortKey::Cadence),
            "amount" => Ok(SortKey::Amount),
            "base-value" | "base" => Ok(SortKey::BaseValue),
            _ => Err(anyhow::anyhow!("Invalid sort key: {}", s)),
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SortKey::Name => "name",
                SortKey::Cadence => "cadence",
                SortKey::Amount => "amount",
                SortKey::BaseValue => "base-value",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Sorted copy of `rows`. Ties keep their input order.
pub fn sort_breakdown(
    rows: &[ExpenseBreakdown],
    key: SortKey,
    direction: SortDirection,
) -> Vec<ExpenseBreakdown> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Cadence => a.cadence.to_string().cmp(&b.cadence.to_string()),
            SortKey::Amount => a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal),
            SortKey::BaseValue => a
                .base_value
                .partial_cmp(&b.base_value)
                .unwrap_or(Ordering::Equal),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    sorted
}
