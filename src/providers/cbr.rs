//! Daily exchange rates published by the Central Bank of Russia, as served by
//! the cbr-xml-daily JSON mirror. All quotes are in RUB.

use crate::core::rates::{RateSource, RateTable};
use crate::providers::util::with_retry;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

pub const CBR_BASE_URL: &str = "https://www.cbr-xml-daily.ru";
pub const CBR_REFERENCE_CURRENCY: &str = "RUB";

pub struct CbrRateSource {
    base_url: String,
    retries: usize,
}

impl CbrRateSource {
    pub fn new(base_url: &str) -> Self {
        CbrRateSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            retries: 1,
        }
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    fn url_for(&self, date: Option<NaiveDate>) -> String {
        match date {
            Some(date) => format!(
                "{}/archive/{}/daily_json.js",
                self.base_url,
                date.format("%Y/%m/%d")
            ),
            None => format!("{}/daily_json.js", self.base_url),
        }
    }

    async fn fetch_table(&self, url: &str) -> Result<RateTable> {
        let client = reqwest::Client::builder().user_agent("xpense/1.0").build()?;
        let response = with_retry(|| async { client.get(url).send().await }, self.retries, 250)
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for URL: {}", response.status(), url));
        }

        let text = response.text().await?;
        parse_daily_rates(&text).map_err(|e| anyhow!("Failed to parse rates from {}: {}", url, e))
    }
}

#[derive(Debug, Deserialize)]
struct DailyRatesResponse {
    #[serde(rename = "Valute", default)]
    valute: HashMap<String, Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "Nominal")]
    nominal: f64,
}

/// Parses a daily JSON document into a table of RUB per unit.
///
/// A document without the `Valute` map is still a valid (reference only)
/// table.
pub fn parse_daily_rates(text: &str) -> Result<RateTable> {
    let data: DailyRatesResponse = serde_json::from_str(text)?;
    let mut table = RateTable::new(CBR_REFERENCE_CURRENCY);
    for (code, quote) in data.valute {
        table.insert_quote(&code, quote.value, quote.nominal);
    }
    Ok(table)
}

#[async_trait]
impl RateSource for CbrRateSource {
    fn reference_currency(&self) -> &str {
        CBR_REFERENCE_CURRENCY
    }

    #[instrument(name = "CbrRatesFetch", skip(self))]
    async fn fetch_rates(&self, date: Option<NaiveDate>) -> Option<RateTable> {
        let url = self.url_for(date);
        debug!("Requesting rates from {}", url);
        match self.fetch_table(&url).await {
            Ok(table) => {
                debug!("Fetched {} rates from {}", table.len(), url);
                Some(table)
            }
            Err(e) => {
                warn!("Failed to fetch CBR rates: {}", e);
                None
            }
        }
    }
}
