//! Month scoped rate resolution over a daily rate archive.
//!
//! A month's table is taken from the first of days 1 to 5 that the archive
//! can serve, since the first days of a month are often weekends or holidays
//! without a published table. When none of them is available the latest
//! table is used, and when that also fails only the reference currency is
//! known. Whatever is resolved is kept for the lifetime of the resolver.

use crate::core::month::MonthRef;
use crate::core::rates::{MonthlyRateProvider, RateSource, RateTable};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, instrument, warn};

const PROBE_DAYS: u32 = 5;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RateResolver<S: RateSource> {
    source: S,
    attempt_timeout: Duration,
    // One cell per month key; the cell guarantees a single in-flight fetch.
    months: Mutex<HashMap<String, Arc<OnceCell<RateTable>>>>,
}

impl<S: RateSource> RateResolver<S> {
    pub fn new(source: S) -> Self {
        Self::with_timeout(source, DEFAULT_ATTEMPT_TIMEOUT)
    }

    pub fn with_timeout(source: S, attempt_timeout: Duration) -> Self {
        RateResolver {
            source,
            attempt_timeout,
            months: Mutex::new(HashMap::new()),
        }
    }

    /// Table for `month`, fetching it on first use.
    pub async fn table_for_month(&self, month: &MonthRef) -> RateTable {
        let cell = {
            let mut months = self.months.lock().await;
            Arc::clone(months.entry(month.key()).or_default())
        };
        if cell.initialized() {
            debug!("Rate table cache HIT for {}", month);
        }
        cell.get_or_init(|| self.fetch_month_rates(*month))
            .await
            .clone()
    }

    #[instrument(name = "MonthRatesFetch", skip(self), fields(month = %month))]
    async fn fetch_month_rates(&self, month: MonthRef) -> RateTable {
        debug!("Rate table cache MISS for {}", month);
        for day in 1..=PROBE_DAYS {
            let Some(date) = month.day(day) else {
                continue;
            };
            if let Some(table) = self.attempt(Some(date)).await {
                debug!("Resolved rates for {} from archive day {}", month, date);
                return table;
            }
        }

        warn!(
            "No archived rates for the first {} days of {}, falling back to latest rates",
            PROBE_DAYS, month
        );
        if let Some(table) = self.attempt(None).await {
            return table;
        }

        warn!(
            "Latest rates unavailable, using only {} for {}",
            self.source.reference_currency(),
            month
        );
        RateTable::new(self.source.reference_currency())
    }

    async fn attempt(&self, date: Option<chrono::NaiveDate>) -> Option<RateTable> {
        match tokio::time::timeout(self.attempt_timeout, self.source.fetch_rates(date)).await {
            Ok(table) => table,
            Err(_) => {
                warn!(
                    "Rate fetch for {} timed out after {:?}",
                    date.map_or("latest".to_string(), |d| d.to_string()),
                    self.attempt_timeout
                );
                None
            }
        }
    }
}

#[async_trait]
impl<S: RateSource> MonthlyRateProvider for RateResolver<S> {
    fn reference_currency(&self) -> &str {
        self.source.reference_currency()
    }

    async fn rate_for_month(&self, month: &MonthRef, currency: &str) -> f64 {
        let code = currency.trim().to_uppercase();
        if code == self.source.reference_currency().to_uppercase() {
            return 1.0;
        }

        let table = self.table_for_month(month).await;
        table.get(&code).unwrap_or_else(|| {
            warn!("No rate for {} in {}, defaulting to 1", code, month);
            1.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves tables only for the listed days; `None` in `available` stands
    /// for the latest endpoint.
    struct MockSource {
        available: Vec<Option<u32>>,
        usd: f64,
        delay: Option<Duration>,
        calls: AtomicUsize,
        requested: std::sync::Mutex<Vec<Option<NaiveDate>>>,
    }

    impl MockSource {
        fn new(available: Vec<Option<u32>>) -> Self {
            MockSource {
                available,
                usd: 90.0,
                delay: None,
                calls: AtomicUsize::new(0),
                requested: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<'a> RateSource for &'a MockSource {
        fn reference_currency(&self) -> &str {
            "RUB"
        }

        async fn fetch_rates(&self, date: Option<NaiveDate>) -> Option<RateTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(date);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let day = date.map(|d| d.day());
            if !self.available.contains(&day) {
                return None;
            }
            let mut table = RateTable::new("RUB");
            // Encode the day in the rate so tests can tell which table won
            let bump = day.map_or(0.5, |d| d as f64 / 100.0);
            table.insert_quote("USD", self.usd + bump, 1.0);
            table.insert_quote("EUR", 100.0, 1.0);
            Some(table)
        }
    }

    fn month(key: &str) -> MonthRef {
        MonthRef::from_key(key).unwrap()
    }

    #[tokio::test]
    async fn test_reference_currency_needs_no_fetch() {
        let source = MockSource::new(vec![Some(1)]);
        let resolver = RateResolver::new(&source);

        assert_eq!(resolver.rate_for_month(&month("2025-01"), "RUB").await, 1.0);
        assert_eq!(resolver.rate_for_month(&month("2024-07"), "rub").await, 1.0);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_day_hit() {
        let source = MockSource::new(vec![Some(1)]);
        let resolver = RateResolver::new(&source);

        let rate = resolver.rate_for_month(&month("2025-01"), "usd").await;
        assert!((rate - 90.01).abs() < 1e-9);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_walks_forward_over_missing_days() {
        let source = MockSource::new(vec![Some(3), Some(4)]);
        let resolver = RateResolver::new(&source);

        let rate = resolver.rate_for_month(&month("2025-02"), "USD").await;
        assert!((rate - 90.03).abs() < 1e-9);
        assert_eq!(source.calls(), 3);

        let requested = source.requested.lock().unwrap().clone();
        let days: Vec<u32> = requested.iter().map(|d| d.unwrap().day()).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert!(requested.iter().all(|d| d.unwrap().month() == 2));
    }

    #[tokio::test]
    async fn test_falls_back_to_latest() {
        let source = MockSource::new(vec![None]);
        let resolver = RateResolver::new(&source);

        let rate = resolver.rate_for_month(&month("2025-02"), "USD").await;
        assert!((rate - 90.5).abs() < 1e-9);
        assert_eq!(source.calls(), 6);
        assert_eq!(source.requested.lock().unwrap().last(), Some(&None));
    }

    #[tokio::test]
    async fn test_degrades_to_one_when_everything_fails() {
        let source = MockSource::new(vec![]);
        let resolver = RateResolver::new(&source);

        assert_eq!(resolver.rate_for_month(&month("2025-02"), "USD").await, 1.0);
        assert_eq!(source.calls(), 6);

        // The defaulted table is cached as well
        assert_eq!(resolver.rate_for_month(&month("2025-02"), "EUR").await, 1.0);
        assert_eq!(source.calls(), 6);
    }

    #[tokio::test]
    async fn test_unknown_currency_defaults_to_one() {
        let source = MockSource::new(vec![Some(1)]);
        let resolver = RateResolver::new(&source);

        assert_eq!(resolver.rate_for_month(&month("2025-02"), "XYZ").await, 1.0);
    }

    #[tokio::test]
    async fn test_month_table_fetched_once() {
        let source = MockSource::new(vec![Some(2)]);
        let resolver = RateResolver::new(&source);
        let jan = month("2025-01");

        let usd = resolver.rate_for_month(&jan, "USD").await;
        let calls_after_first = source.calls();
        let eur = resolver.rate_for_month(&jan, "EUR").await;

        assert!((usd - 90.02).abs() < 1e-9);
        assert_eq!(eur, 100.0);
        assert_eq!(calls_after_first, 2);
        assert_eq!(source.calls(), 2);

        // A different month triggers its own sequence
        resolver.rate_for_month(&month("2025-02"), "USD").await;
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let mut source = MockSource::new(vec![Some(1)]);
        source.delay = Some(Duration::from_millis(20));
        let resolver = RateResolver::new(&source);
        let jan = month("2025-01");

        let lookups = (0..10).map(|i| {
            let resolver = &resolver;
            let code = if i % 2 == 0 { "USD" } else { "EUR" };
            async move { resolver.rate_for_month(&jan, code).await }
        });
        let rates = join_all(lookups).await;

        assert_eq!(rates.len(), 10);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_attempt_counts_as_miss() {
        let mut source = MockSource::new(vec![Some(1)]);
        source.delay = Some(Duration::from_millis(500));
        let resolver = RateResolver::with_timeout(&source, Duration::from_millis(20));

        let rate = resolver.rate_for_month(&month("2025-01"), "USD").await;
        assert_eq!(rate, 1.0);
        assert_eq!(source.calls(), 6);
    }
}
