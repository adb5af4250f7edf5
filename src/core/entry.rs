//! Recurring expense and income entries

use crate::core::month::MonthRef;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    #[default]
    Monthly,
    Yearly,
}

impl Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Cadence::Monthly => "monthly",
                Cadence::Yearly => "yearly",
            }
        )
    }
}

impl FromStr for Cadence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Cadence::Monthly),
            "yearly" => Ok(Cadence::Yearly),
            _ => Err(anyhow!("Invalid cadence: {}", s)),
        }
    }
}

/// Category an entry belongs to. Name uniqueness is scoped to a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Expense,
    Income,
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EntryKind::Expense => "expense",
                EntryKind::Income => "income",
            }
        )
    }
}

impl FromStr for EntryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "expenses" => Ok(EntryKind::Expense),
            "income" | "incomes" => Ok(EntryKind::Income),
            _ => Err(anyhow!("Invalid entry kind: {}", s)),
        }
    }
}

/// A recurring financial item.
///
/// Entries are deserialized leniently so that a hand-edited config with a
/// broken entry still loads; [`Entry::is_valid`] decides whether the entry
/// takes part in aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub cadence: Cadence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_month: Option<String>,
}

impl Entry {
    /// Creates an entry with a freshly assigned id.
    pub fn new(
        name: &str,
        amount: f64,
        currency: &str,
        cadence: Cadence,
        start_month: Option<&str>,
    ) -> Self {
        Entry {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            amount,
            currency: currency.trim().to_uppercase(),
            cadence,
            start_month: start_month
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }

    pub fn currency_code(&self) -> String {
        self.currency.trim().to_uppercase()
    }

    /// Key used for duplicate name detection within a kind.
    pub fn name_key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && self.amount.is_finite()
            && self.amount > 0.0
            && !self.currency.trim().is_empty()
    }

    /// Stricter than [`Entry::is_valid`]: also requires a well formed start month.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Entry name must not be empty"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(anyhow!(
                "Entry amount must be a positive number, got {}",
                self.amount
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(anyhow!("Entry currency must not be empty"));
        }
        if let Some(start) = self.start_month() {
            MonthRef::from_key(start)?;
        }
        Ok(())
    }

    /// Start month, with an empty string treated as unset.
    pub fn start_month(&self) -> Option<&str> {
        self.start_month
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// An entry contributes to `month` once its start month is reached.
    ///
    /// Keys are fixed width `YYYY-MM`, so string order is chronological order.
    pub fn is_active(&self, month: &MonthRef) -> bool {
        match self.start_month() {
            None => true,
            Some(start) => start <= month.key().as_str(),
        }
    }

    /// Per-month equivalent of `amount` in the entry's own currency.
    pub fn monthly_amount(&self) -> f64 {
        match self.cadence {
            Cadence::Monthly => self.amount,
            Cadence::Yearly => self.amount / 12.0,
        }
    }
}
