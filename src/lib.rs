pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::entries::EntryChanges;
use crate::cli::report::ReportOptions;
use crate::cli::settings::SettingsChanges;
use crate::core::config::AppConfig;
use crate::core::entry::{Entry, EntryKind};
use crate::core::month::recent_months;
use crate::core::resolver::RateResolver;
use crate::core::state::AppState;
use crate::providers::caching::CachingRateSource;
use crate::providers::cbr::CbrRateSource;
use crate::store::KeyValueStore;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Report {
        /// Overrides `months_to_show` from the config.
        months: Option<usize>,
        /// Overrides `base_currency` from the config.
        base_currency: Option<String>,
        options: ReportOptions,
    },
    List,
    Add {
        kind: EntryKind,
        entry: Entry,
    },
    Edit {
        kind: EntryKind,
        id: String,
        changes: EntryChanges,
    },
    Remove {
        kind: EntryKind,
        id: String,
    },
    Settings(SettingsChanges),
}

fn load_state(config_path: Option<&str>) -> Result<AppState> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_config_path()?,
    };
    let config = if path.exists() {
        AppConfig::load_from_path(&path)?
    } else {
        info!(
            "No configuration at {}, starting from defaults",
            path.display()
        );
        AppConfig::default()
    };
    debug!("Loaded config: {config:#?}");
    Ok(AppState::new(config, &path))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xpense starting...");
    let mut state = load_state(config_path)?;

    match command {
        AppCommand::Report {
            months,
            base_currency,
            options,
        } => {
            let config = state.config();
            let count = months.unwrap_or(config.months_to_show).max(1);
            let base_currency = base_currency
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| config.base_currency());
            let months = recent_months(count, chrono::Local::now().date_naive());

            let store = KeyValueStore::open(&config.default_data_path()?);
            let source = CachingRateSource::new(CbrRateSource::new(config.cbr_base_url()), &store);
            let resolver = RateResolver::with_timeout(source, config.fetch_timeout());

            cli::report::run(config, &resolver, &months, &base_currency, &options).await
        }
        AppCommand::List => {
            cli::entries::list(&state);
            Ok(())
        }
        AppCommand::Add { kind, entry } => {
            let entry = cli::entries::add(&mut state, kind, entry)?;
            println!("Added {} '{}' ({})", kind, entry.name, entry.id);
            Ok(())
        }
        AppCommand::Edit { kind, id, changes } => {
            let entry = cli::entries::edit(&mut state, kind, &id, changes)?;
            println!("Updated {} '{}' ({})", kind, entry.name, entry.id);
            Ok(())
        }
        AppCommand::Remove { kind, id } => {
            let entry = cli::entries::remove(&mut state, kind, &id)?;
            println!("Removed {} '{}' ({})", kind, entry.name, entry.id);
            Ok(())
        }
        AppCommand::Settings(changes) => cli::settings::run(&mut state, changes),
    }
}
