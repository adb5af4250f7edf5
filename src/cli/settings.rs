use super::ui;
use crate::core::config::AppConfig;
use crate::core::state::AppState;
use anyhow::Result;
use comfy_table::Cell;

#[derive(Debug, Clone, Default)]
pub struct SettingsChanges {
    pub base_currency: Option<String>,
    pub months_to_show: Option<usize>,
}

impl SettingsChanges {
    pub fn is_empty(&self) -> bool {
        self.base_currency.is_none() && self.months_to_show.is_none()
    }
}

pub fn render_settings(config: &AppConfig) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Setting"), ui::header_cell("Value")]);
    table.add_row(vec![Cell::new("Base currency"), Cell::new(config.base_currency())]);
    table.add_row(vec![
        Cell::new("Months to show"),
        Cell::new(config.months_to_show),
    ]);
    table.add_row(vec![Cell::new("Rates source"), Cell::new(config.cbr_base_url())]);
    table.add_row(vec![
        Cell::new("Fetch timeout"),
        Cell::new(format!("{}s", config.fetch_timeout().as_secs())),
    ]);
    table.to_string()
}

/// Applies `changes`, if any, and prints the resulting settings.
pub fn run(state: &mut AppState, changes: SettingsChanges) -> Result<()> {
    if !changes.is_empty() {
        state.update_settings(|settings| {
            if let Some(currency) = changes.base_currency {
                settings.base_currency = currency;
            }
            if let Some(months) = changes.months_to_show {
                settings.months_to_show = months;
            }
        })?;
    }
    println!("{}", render_settings(state.config()));
    Ok(())
}
