use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use xpense::cli::entries::EntryChanges;
use xpense::cli::report::ReportOptions;
use xpense::cli::settings::SettingsChanges;
use xpense::core::aggregate::SortKey;
use xpense::core::entry::{Cadence, Entry, EntryKind};
use xpense::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Expense,
    Income,
}

impl From<KindArg> for EntryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Expense => EntryKind::Expense,
            KindArg::Income => EntryKind::Income,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CadenceArg {
    Monthly,
    Yearly,
}

impl From<CadenceArg> for Cadence {
    fn from(cadence: CadenceArg) -> Self {
        match cadence {
            CadenceArg::Monthly => Cadence::Monthly,
            CadenceArg::Yearly => Cadence::Yearly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Cadence,
    Amount,
    BaseValue,
}

impl From<SortArg> for SortKey {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Name => SortKey::Name,
            SortArg::Cadence => SortKey::Cadence,
            SortArg::Amount => SortKey::Amount,
            SortArg::BaseValue => SortKey::BaseValue,
        }
    }
}

#[derive(Args)]
struct EntryFields {
    /// Display name, unique within its kind
    #[arg(long)]
    name: Option<String>,
    /// Amount per cadence period
    #[arg(long)]
    amount: Option<f64>,
    /// ISO currency code of the amount
    #[arg(long)]
    currency: Option<String>,
    #[arg(long, value_enum)]
    cadence: Option<CadenceArg>,
    /// First month (YYYY-MM) the entry counts in; empty to clear
    #[arg(long)]
    start: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display monthly totals converted to the base currency
    Report {
        /// Number of months to show, most recent first
        #[arg(short, long)]
        months: Option<usize>,
        /// Currency to convert into
        #[arg(short, long)]
        base: Option<String>,
        /// Order of the latest month breakdown
        #[arg(short, long, value_enum)]
        sort: Option<SortArg>,
        /// Sort in descending order
        #[arg(long)]
        desc: bool,
        /// Leave an entry out by name (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all entries
    List,
    /// Add an expense or income
    Add {
        #[arg(value_enum)]
        kind: KindArg,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Change fields of an existing entry
    Edit {
        #[arg(value_enum)]
        kind: KindArg,
        /// Entry id or an unambiguous prefix of it
        id: String,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Remove an entry
    Remove {
        #[arg(value_enum)]
        kind: KindArg,
        /// Entry id or an unambiguous prefix of it
        id: String,
    },
    /// Show or change settings
    Settings {
        #[arg(long)]
        base_currency: Option<String>,
        #[arg(long)]
        months: Option<usize>,
    },
}

impl TryFrom<Commands> for xpense::AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<xpense::AppCommand> {
        let command = match cmd {
            Commands::Report {
                months,
                base,
                sort,
                desc,
                exclude,
                json,
            } => xpense::AppCommand::Report {
                months,
                base_currency: base,
                options: ReportOptions {
                    sort: sort.map(SortKey::from),
                    descending: desc,
                    exclude,
                    json,
                },
            },
            Commands::List => xpense::AppCommand::List,
            Commands::Add { kind, fields } => {
                let name = fields
                    .name
                    .ok_or_else(|| anyhow::anyhow!("--name is required"))?;
                let amount = fields
                    .amount
                    .ok_or_else(|| anyhow::anyhow!("--amount is required"))?;
                let currency = fields
                    .currency
                    .ok_or_else(|| anyhow::anyhow!("--currency is required"))?;
                let cadence = fields.cadence.map(Cadence::from).unwrap_or_default();
                xpense::AppCommand::Add {
                    kind: kind.into(),
                    entry: Entry::new(&name, amount, &currency, cadence, fields.start.as_deref()),
                }
            }
            Commands::Edit { kind, id, fields } => xpense::AppCommand::Edit {
                kind: kind.into(),
                id,
                changes: EntryChanges {
                    name: fields.name,
                    amount: fields.amount,
                    currency: fields.currency,
                    cadence: fields.cadence.map(Cadence::from),
                    start_month: fields.start,
                },
            },
            Commands::Remove { kind, id } => xpense::AppCommand::Remove {
                kind: kind.into(),
                id,
            },
            Commands::Settings {
                base_currency,
                months,
            } => xpense::AppCommand::Settings(SettingsChanges {
                base_currency,
                months_to_show: months,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        };
        Ok(command)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => xpense::cli::setup::setup_at_path(path),
            None => xpense::cli::setup::setup(),
        },
        Some(cmd) => match xpense::AppCommand::try_from(cmd) {
            Ok(command) => xpense::run_command(command, cli.config_path.as_deref()).await,
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
