//! Exchange rate abstractions

use crate::core::month::MonthRef;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value of one unit of each currency in the reference currency, as of a
/// single day. The reference currency is always present at rate 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    reference: String,
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(reference: &str) -> Self {
        let reference = reference.to_uppercase();
        let mut rates = HashMap::new();
        rates.insert(reference.clone(), 1.0);
        RateTable { reference, rates }
    }

    /// Adds a quote given as `value` reference units per `nominal` units of
    /// `currency`. Non-positive or non-finite quotes are ignored.
    pub fn insert_quote(&mut self, currency: &str, value: f64, nominal: f64) {
        let code = currency.to_uppercase();
        if code == self.reference {
            return;
        }
        let rate = value / nominal;
        if rate.is_finite() && rate > 0.0 {
            self.rates.insert(code, rate);
        }
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.rates.get(&currency.to_uppercase()).copied()
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Transport to a daily rate archive.
///
/// `None` means the table is unavailable for that request and the caller
/// should keep trying other days.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn reference_currency(&self) -> &str;

    /// Fetches the table for `date`, or the latest published table for `None`.
    async fn fetch_rates(&self, date: Option<NaiveDate>) -> Option<RateTable>;
}

/// Answers "what is one unit of a currency worth in the reference currency
/// during a month". Lookups never fail; unknown rates resolve to 1.
#[async_trait]
pub trait MonthlyRateProvider: Send + Sync {
    fn reference_currency(&self) -> &str;

    async fn rate_for_month(&self, month: &MonthRef, currency: &str) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_has_reference() {
        let table = RateTable::new("rub");
        assert_eq!(table.reference(), "RUB");
        assert_eq!(table.get("RUB"), Some(1.0));
        assert_eq!(table.get("rub"), Some(1.0));
        assert_eq!(table.get("USD"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_quote_divides_by_nominal() {
        let mut table = RateTable::new("RUB");
        table.insert_quote("usd", 92.5, 1.0);
        table.insert_quote("AMD", 23.0, 100.0);
        assert_eq!(table.get("USD"), Some(92.5));
        assert!((table.get("AMD").unwrap() - 0.23).abs() < 1e-12);
    }

    #[test]
    fn test_insert_quote_ignores_bad_values() {
        let mut table = RateTable::new("RUB");
        table.insert_quote("USD", 92.5, 0.0);
        table.insert_quote("EUR", -1.0, 1.0);
        table.insert_quote("RUB", 5.0, 1.0);
        assert_eq!(table.get("USD"), None);
        assert_eq!(table.get("EUR"), None);
        assert_eq!(table.get("RUB"), Some(1.0));
    }
}
