//! Application state shared by the commands.
//!
//! Holds the loaded configuration and publishes every saved change to
//! subscribers, so that views holding a receiver can refresh themselves.

use crate::core::config::AppConfig;
use crate::core::entry::{Entry, EntryKind};
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info};

/// Minimal persistence interface for recurring entries.
pub trait EntryRepository {
    fn list(&self, kind: EntryKind) -> Vec<Entry>;

    /// Inserts `entry`, or replaces the entry with the same id in place.
    fn upsert(&mut self, kind: EntryKind, entry: Entry) -> Result<()>;

    /// Returns whether an entry was removed.
    fn delete_by_id(&mut self, kind: EntryKind, id: &str) -> Result<bool>;
}

pub struct AppState {
    config: AppConfig,
    path: Option<PathBuf>,
    sender: watch::Sender<AppConfig>,
}

impl AppState {
    /// State backed by the config file at `path`.
    pub fn new(config: AppConfig, path: &Path) -> Self {
        Self::build(config, Some(path.to_path_buf()))
    }

    /// State that is never written anywhere.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::build(config, None)
    }

    fn build(config: AppConfig, path: Option<PathBuf>) -> Self {
        let (sender, _) = watch::channel(config.clone());
        AppState {
            config,
            path,
            sender,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.sender.subscribe()
    }

    /// Applies `update` to the settings, then saves and notifies subscribers.
    pub fn update_settings(&mut self, update: impl FnOnce(&mut AppConfig)) -> Result<()> {
        let mut next = self.config.clone();
        update(&mut next);
        next.base_currency = next.base_currency.trim().to_uppercase();
        if next.base_currency.is_empty() {
            return Err(anyhow!("Base currency must not be empty"));
        }
        if next.months_to_show == 0 {
            return Err(anyhow!("Months to show must be at least 1"));
        }
        self.commit(next)
    }

    fn commit(&mut self, next: AppConfig) -> Result<()> {
        if let Some(path) = &self.path {
            next.save_to_path(path)?;
        }
        self.config = next;
        self.sender.send_replace(self.config.clone());
        debug!("Settings changed, notified {} subscribers", self.sender.receiver_count());
        Ok(())
    }
}

impl EntryRepository for AppState {
    fn list(&self, kind: EntryKind) -> Vec<Entry> {
        self.config.entries(kind).to_vec()
    }

    fn upsert(&mut self, kind: EntryKind, mut entry: Entry) -> Result<()> {
        entry.name = entry.name.trim().to_string();
        entry.currency = entry.currency_code();
        entry.start_month = entry.start_month().map(String::from);
        entry.validate()?;

        let key = entry.name_key();
        let existing = self.config.entries(kind);
        if existing
            .iter()
            .any(|other| other.id != entry.id && other.name_key() == key)
        {
            return Err(anyhow!(
                "An {} named '{}' already exists",
                kind,
                entry.name
            ));
        }

        let mut next = self.config.clone();
        let entries = next.entries_mut(kind);
        match entries.iter().position(|e| e.id == entry.id) {
            Some(index) => {
                info!("Updating {} '{}'", kind, entry.name);
                entries[index] = entry;
            }
            None => {
                info!("Adding {} '{}'", kind, entry.name);
                entries.push(entry);
            }
        }
        self.commit(next)
    }

    fn delete_by_id(&mut self, kind: EntryKind, id: &str) -> Result<bool> {
        let mut next = self.config.clone();
        let entries = next.entries_mut(kind);
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        info!("Removed {} {}", kind, id);
        self.commit(next)?;
        Ok(true)
    }
}
