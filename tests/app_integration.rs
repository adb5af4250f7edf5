use std::fs;
use tracing::info;
use xpense::core::config::AppConfig;
use xpense::core::entry::{Cadence, Entry, EntryKind};

const DAILY_RATES: &str = r#"{
    "Date": "2025-03-03T11:30:00+03:00",
    "Valute": {
        "USD": {"CharCode": "USD", "Nominal": 1, "Value": 90.5},
        "EUR": {"CharCode": "EUR", "Nominal": 1, "Value": 100.0},
        "JPY": {"CharCode": "JPY", "Nominal": 100, "Value": 60.0}
    }
}"#;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves `body` for every archive day and for the latest table.
    pub async fn create_cbr_mock_server(body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/archive/\d{4}/\d{2}/\d{2}/daily_json\.js$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/daily_json.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(dir: &std::path::Path, base_url: &str) -> std::path::PathBuf {
        let config_path = dir.join("config.yaml");
        let data_path = dir.join("data");
        let config_content = format!(
            r#"
base_currency: "USD"
months_to_show: 3
fetch_timeout_secs: 5
data_path: "{}"
providers:
  cbr:
    base_url: "{}"
expenses:
  - id: "rent-1"
    name: "Rent"
    amount: 45000
    currency: "RUB"
  - id: "domain-1"
    name: "Domain"
    amount: 24
    currency: "USD"
    cadence: yearly
incomes:
  - id: "salary-1"
    name: "Salary"
    amount: 3000
    currency: "EUR"
"#,
            data_path.display(),
            base_url
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path
    }
}

#[test_log::test(tokio::test)]
async fn test_report_with_mock_rates() {
    let mock_server = test_utils::create_cbr_mock_server(DAILY_RATES).await;

    // Separate data directories so each run opens its own cache
    for json in [false, true] {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri());
        let result = xpense::run_command(
            xpense::AppCommand::Report {
                months: None,
                base_currency: None,
                options: xpense::cli::report::ReportOptions {
                    json,
                    ..Default::default()
                },
            },
            Some(config_path.to_str().unwrap()),
        )
        .await;
        assert!(
            result.is_ok(),
            "Report failed with: {:?}",
            result.err()
        );
        assert!(temp_dir.path().join("data").join("cache").exists());
    }

    let requests = mock_server.received_requests().await.unwrap_or_default();
    info!(count = requests.len(), "Rate archive requests");
    assert!(!requests.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_report_survives_unavailable_rates() {
    // Nothing mounted: every archive day and the latest table answer 404
    let mock_server = wiremock::MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri());

    let result = xpense::run_command(
        xpense::AppCommand::Report {
            months: Some(2),
            base_currency: Some("eur".to_string()),
            options: Default::default(),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;

    assert!(result.is_ok(), "Report failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_entry_commands_persist_changes() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), "http://127.0.0.1:9");
    let config_arg = Some(config_path.to_str().unwrap());

    xpense::run_command(
        xpense::AppCommand::Add {
            kind: EntryKind::Expense,
            entry: Entry::new("Gym", 30.0, "eur", Cadence::Monthly, Some("2025-01")),
        },
        config_arg,
    )
    .await
    .expect("Add failed");

    let duplicate = xpense::run_command(
        xpense::AppCommand::Add {
            kind: EntryKind::Expense,
            entry: Entry::new("gym", 10.0, "EUR", Cadence::Monthly, None),
        },
        config_arg,
    )
    .await;
    assert!(duplicate.is_err());

    xpense::run_command(
        xpense::AppCommand::Edit {
            kind: EntryKind::Expense,
            id: "rent".to_string(),
            changes: xpense::cli::entries::EntryChanges {
                amount: Some(50000.0),
                ..Default::default()
            },
        },
        config_arg,
    )
    .await
    .expect("Edit failed");

    xpense::run_command(
        xpense::AppCommand::Remove {
            kind: EntryKind::Income,
            id: "salary-1".to_string(),
        },
        config_arg,
    )
    .await
    .expect("Remove failed");

    xpense::run_command(xpense::AppCommand::List, config_arg)
        .await
        .expect("List failed");

    let saved = AppConfig::load_from_path(&config_path).expect("Failed to reload config");
    assert_eq!(saved.expenses.len(), 3);
    assert_eq!(saved.expenses[0].amount, 50000.0);
    assert_eq!(saved.expenses[2].name, "Gym");
    assert_eq!(saved.expenses[2].currency, "EUR");
    assert!(saved.incomes.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_settings_command() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), "http://127.0.0.1:9");
    let config_arg = Some(config_path.to_str().unwrap());

    xpense::run_command(
        xpense::AppCommand::Settings(xpense::cli::settings::SettingsChanges {
            base_currency: Some("rub".to_string()),
            months_to_show: Some(12),
        }),
        config_arg,
    )
    .await
    .expect("Settings failed");

    let invalid = xpense::run_command(
        xpense::AppCommand::Settings(xpense::cli::settings::SettingsChanges {
            months_to_show: Some(0),
            ..Default::default()
        }),
        config_arg,
    )
    .await;
    assert!(invalid.is_err());

    let saved = AppConfig::load_from_path(&config_path).expect("Failed to reload config");
    assert_eq!(saved.base_currency, "RUB");
    assert_eq!(saved.months_to_show, 12);
    assert_eq!(saved.expenses.len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_missing_config_starts_from_defaults() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("fresh").join("config.yaml");

    xpense::run_command(
        xpense::AppCommand::Add {
            kind: EntryKind::Income,
            entry: Entry::new("Freelance", 500.0, "USD", Cadence::Monthly, None),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await
    .expect("Add failed");

    let saved = fs::read_to_string(&config_path).expect("Config was not written");
    assert!(saved.contains("Freelance"));
    assert!(saved.contains("base_currency: RUB"));
}

#[test_log::test(tokio::test)]
async fn test_resolver_walks_forward_and_caches_archive_days() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use xpense::core::month::MonthRef;
    use xpense::core::rates::MonthlyRateProvider;
    use xpense::core::resolver::RateResolver;
    use xpense::providers::caching::CachingRateSource;
    use xpense::providers::cbr::CbrRateSource;
    use xpense::store::KeyValueStore;

    // Days 1 and 2 are unpublished and answer 404
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archive/2025/03/03/daily_json.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DAILY_RATES))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = KeyValueStore::open(temp_dir.path());
    let month = MonthRef::new(2025, 3).expect("valid month");

    let resolver = RateResolver::new(CachingRateSource::new(
        CbrRateSource::new(&mock_server.uri()).with_retries(0),
        &store,
    ));
    assert_eq!(resolver.rate_for_month(&month, "USD").await, 90.5);
    assert_eq!(resolver.rate_for_month(&month, "jpy").await, 0.6);

    // A fresh resolver finds day 3 in the store without asking the server
    let resolver = RateResolver::new(CachingRateSource::new(
        CbrRateSource::new(&mock_server.uri()).with_retries(0),
        &store,
    ));
    assert_eq!(resolver.rate_for_month(&month, "EUR").await, 100.0);

    let requests = mock_server.received_requests().await.unwrap_or_default();
    // Two misses and a hit for the first resolver, then two misses again
    assert_eq!(requests.len(), 5);
}
