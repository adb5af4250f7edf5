use super::ui;
use crate::core::aggregate::{
    self, MonthlyBalance, MonthlyTotal, SortDirection, SortKey, filter_totals, monthly_balance,
    sort_breakdown,
};
use crate::core::config::AppConfig;
use crate::core::entry::EntryKind;
use crate::core::month::MonthRef;
use crate::core::rates::MonthlyRateProvider;
use anyhow::{Context, Result};
use comfy_table::Cell;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub sort: Option<SortKey>,
    pub descending: bool,
    /// Entry names (case-insensitive) left out of every table and total.
    pub exclude: Vec<String>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub base_currency: String,
    pub expenses: Vec<MonthlyTotal>,
    pub incomes: Vec<MonthlyTotal>,
    pub balance: Vec<MonthlyBalance>,
}

/// Aggregates expenses and incomes of `config` over `months`.
pub async fn build_report(
    config: &AppConfig,
    rates: &(dyn MonthlyRateProvider + Send + Sync),
    months: &[MonthRef],
    base_currency: &str,
    options: &ReportOptions,
    update_callback: &(dyn Fn() + Send + Sync),
) -> Report {
    let expenses = aggregate::calculate_monthly_totals(
        config.entries(EntryKind::Expense),
        months,
        base_currency,
        rates,
        update_callback,
    )
    .await;
    let incomes = aggregate::calculate_monthly_totals(
        config.entries(EntryKind::Income),
        months,
        base_currency,
        rates,
        update_callback,
    )
    .await;

    let excluded: Vec<String> = options
        .exclude
        .iter()
        .map(|name| name.trim().to_lowercase())
        .collect();
    let keep = |row: &aggregate::ExpenseBreakdown| !excluded.contains(&row.name.trim().to_lowercase());
    let expenses = filter_totals(&expenses, keep);
    let incomes = filter_totals(&incomes, keep);
    let balance = monthly_balance(&incomes, &expenses);

    Report {
        base_currency: base_currency.to_string(),
        expenses,
        incomes,
        balance,
    }
}

fn breakdown_table(total: &MonthlyTotal, base_currency: &str, options: &ReportOptions) -> String {
    let mut table = ui::new_styled_table();
    let label = total.month.label();
    table.set_header(vec![
        ui::header_cell("Name"),
        ui::header_cell("Cadence"),
        ui::header_cell("Amount"),
        ui::header_cell(&format!("In {base_currency} ({label})")),
    ]);

    let rows = match options.sort {
        Some(key) => {
            let direction = if options.descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            sort_breakdown(&total.breakdown, key, direction)
        }
        None => total.breakdown.clone(),
    };

    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.cadence.to_string()),
            ui::amount_cell(row.amount, &row.currency),
            ui::amount_cell(row.base_value, base_currency),
        ]);
    }
    table.add_row(vec![
        Cell::new(ui::style_text("Total", ui::StyleType::TotalLabel)),
        Cell::new(""),
        Cell::new(""),
        ui::total_cell(total.total_base, base_currency),
    ]);
    table.to_string()
}

fn totals_table(report: &Report) -> String {
    let currency = &report.base_currency;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Month"),
        ui::header_cell(&format!("Expenses ({currency})")),
        ui::header_cell(&format!("Incomes ({currency})")),
        ui::header_cell(&format!("Balance ({currency})")),
    ]);
    for month in &report.balance {
        table.add_row(vec![
            Cell::new(month.month.label()),
            ui::amount_cell(month.expense, currency),
            ui::amount_cell(month.income, currency),
            ui::balance_cell(month.balance, currency),
        ]);
    }
    table.to_string()
}

/// Renders the latest month breakdowns followed by the per-month totals.
pub fn render_report(report: &Report, options: &ReportOptions) -> String {
    let mut output = String::new();
    let currency = &report.base_currency;

    let sections = [("Monthly expenses", &report.expenses), ("Monthly incomes", &report.incomes)];
    for (title, totals) in sections {
        // Months arrive most recent first
        let Some(latest) = totals.first() else {
            continue;
        };
        if latest.breakdown.is_empty() {
            continue;
        }
        output.push_str(&format!(
            "{}\n\n",
            ui::style_text(&format!("{title} for {}", latest.month.label()), ui::StyleType::Title)
        ));
        output.push_str(&breakdown_table(latest, currency, options));
        output.push_str("\n\n");
    }

    output.push_str(&format!(
        "{}\n\n",
        ui::style_text(&format!("Totals by month ({currency})"), ui::StyleType::Title)
    ));
    output.push_str(&totals_table(report));
    output
}

pub async fn run(
    config: &AppConfig,
    rates: &(dyn MonthlyRateProvider + Send + Sync),
    months: &[MonthRef],
    base_currency: &str,
    options: &ReportOptions,
) -> Result<()> {
    if config.expenses.is_empty() && config.incomes.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No entries yet. Add one with `xpense add expense --name <NAME> --amount <AMOUNT> --currency <CODE>`.",
                ui::StyleType::Subtle
            )
        );
        return Ok(());
    }

    let pb = ui::new_progress_bar((months.len() * 2) as u64, true);
    pb.set_message("Converting entries...");
    let pb_clone = pb.clone();
    let report = build_report(config, rates, months, base_currency, options, &move || {
        pb_clone.inc(1)
    })
    .await;
    pb.finish_and_clear();

    if options.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        println!("{}", render_report(&report, options));
    }
    Ok(())
}
