use super::ui;
use crate::core::entry::{Cadence, Entry, EntryKind};
use crate::core::state::EntryRepository;
use anyhow::{Result, anyhow, bail};
use comfy_table::Cell;

/// Field changes for an existing entry. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct EntryChanges {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub cadence: Option<Cadence>,
    /// An empty string clears the start month.
    pub start_month: Option<String>,
}

impl EntryChanges {
    fn apply(self, entry: &mut Entry) {
        if let Some(name) = self.name {
            entry.name = name;
        }
        if let Some(amount) = self.amount {
            entry.amount = amount;
        }
        if let Some(currency) = self.currency {
            entry.currency = currency;
        }
        if let Some(cadence) = self.cadence {
            entry.cadence = cadence;
        }
        if let Some(start) = self.start_month {
            entry.start_month = Some(start);
        }
    }
}

/// Finds an entry by full id or by an unambiguous id prefix.
fn find_entry(repo: &dyn EntryRepository, kind: EntryKind, id: &str) -> Result<Entry> {
    let id = id.trim();
    if id.is_empty() {
        bail!("Entry id must not be empty");
    }
    let entries = repo.list(kind);
    if let Some(entry) = entries.iter().find(|e| e.id == id) {
        return Ok(entry.clone());
    }

    let mut matches = entries.into_iter().filter(|e| e.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(entry), None) => Ok(entry),
        (Some(_), Some(_)) => Err(anyhow!("Id prefix '{}' matches more than one {}", id, kind)),
        (None, _) => Err(anyhow!("No {} with id '{}'", kind, id)),
    }
}

pub fn add(repo: &mut dyn EntryRepository, kind: EntryKind, entry: Entry) -> Result<Entry> {
    repo.upsert(kind, entry.clone())?;
    find_entry(repo, kind, &entry.id)
}

pub fn edit(
    repo: &mut dyn EntryRepository,
    kind: EntryKind,
    id: &str,
    changes: EntryChanges,
) -> Result<Entry> {
    let mut entry = find_entry(repo, kind, id)?;
    changes.apply(&mut entry);
    repo.upsert(kind, entry.clone())?;
    find_entry(repo, kind, &entry.id)
}

pub fn remove(repo: &mut dyn EntryRepository, kind: EntryKind, id: &str) -> Result<Entry> {
    let entry = find_entry(repo, kind, id)?;
    if !repo.delete_by_id(kind, &entry.id)? {
        bail!("No {} with id '{}'", kind, entry.id);
    }
    Ok(entry)
}

pub fn render_entries(entries: &[Entry]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Name"),
        ui::header_cell("Amount"),
        ui::header_cell("Cadence"),
        ui::header_cell("Starts"),
    ]);
    for entry in entries {
        let starts = entry.start_month().unwrap_or("-");
        let name = if entry.is_valid() {
            entry.name.clone()
        } else {
            format!("{} (invalid)", entry.name)
        };
        table.add_row(vec![
            Cell::new(short_id(&entry.id)),
            Cell::new(name),
            ui::amount_cell(entry.amount, &entry.currency_code()),
            Cell::new(entry.cadence.to_string()),
            Cell::new(starts),
        ]);
    }
    table.to_string()
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn list(repo: &dyn EntryRepository) {
    for (title, kind) in [("Expenses", EntryKind::Expense), ("Incomes", EntryKind::Income)] {
        let entries = repo.list(kind);
        println!("{}\n", ui::style_text(title, ui::StyleType::Title));
        if entries.is_empty() {
            println!(
                "{}\n",
                ui::style_text(&format!("No {kind} entries"), ui::StyleType::Subtle)
            );
        } else {
            println!("{}\n", render_entries(&entries));
        }
    }
}
