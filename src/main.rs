use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use propfolio::config::{default_config_path, ResolvedConfig};
use propfolio::harvest::{Harvester, HttpPageFetcher};
use propfolio::models::{Id, PropertyPatch, PropertyRecord, Purpose, RentFrequency};
use propfolio::portfolio::PortfolioStats;
use propfolio::storage::{JsonFileStorage, PropertyFilter, Storage};
use propfolio::tracker::PropertyTracker;
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn parse_purpose(s: &str) -> Result<Purpose, String> {
    match s {
        "investment" => Ok(Purpose::Investment),
        "primary_residence" => Ok(Purpose::PrimaryResidence),
        _ => Err(format!(
            "unknown purpose {s:?} (expected \"investment\" or \"primary_residence\")"
        )),
    }
}

fn parse_rent_frequency(s: &str) -> Result<RentFrequency, String> {
    match s {
        "weekly" => Ok(RentFrequency::Weekly),
        "monthly" => Ok(RentFrequency::Monthly),
        _ => Err(format!(
            "unknown rent frequency {s:?} (expected \"weekly\" or \"monthly\")"
        )),
    }
}

#[derive(Parser)]
#[command(name = "propfolio")]
#[command(about = "Local-first property portfolio tracker")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Track a property from a listing URL, or from supplied facts alone
    Add(AddArgs),
    /// List tracked properties, newest first
    List(ListArgs),
    /// Show one property in full
    Show { id: String },
    /// Fold new facts into a tracked property
    Set(SetArgs),
    /// Re-harvest a property's listing and reconcile the record
    Refresh { id: String },
    /// Refresh every tracked property in sequence
    Sweep,
    /// Stop tracking a property and delete its value history
    Remove { id: String },
    /// Portfolio totals and cash flow
    Stats,
    /// Aggregate portfolio value by day
    Series {
        /// Trailing window in days (defaults to report.window_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Value history for one property
    History {
        id: String,
        /// Trailing window in days (defaults to report.window_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show current configuration
    Config,
}

#[derive(Args)]
struct AddArgs {
    /// Listing URL. Omit to create a manual record from the flags alone.
    url: Option<String>,

    /// "investment" or "primary_residence"
    #[arg(long, default_value = "investment", value_parser = parse_purpose)]
    purpose: Purpose,

    #[command(flatten)]
    facts: FactArgs,
}

#[derive(Args)]
struct ListArgs {
    /// Free-text match over address, nickname and suburb
    #[arg(long)]
    search: Option<String>,

    /// Suburb substring match
    #[arg(long)]
    suburb: Option<String>,

    /// Exact purpose match
    #[arg(long, value_parser = parse_purpose)]
    purpose: Option<Purpose>,
}

#[derive(Args)]
struct SetArgs {
    /// Property id
    id: String,

    /// Change the recorded purpose
    #[arg(long, value_parser = parse_purpose)]
    purpose: Option<Purpose>,

    #[command(flatten)]
    facts: FactArgs,
}

/// Writable facts shared by `add` and `set`.
#[derive(Args)]
struct FactArgs {
    /// Friendly name for the property
    #[arg(long)]
    nickname: Option<String>,

    /// Full street address
    #[arg(long)]
    address: Option<String>,

    #[arg(long)]
    suburb: Option<String>,

    #[arg(long)]
    state: Option<String>,

    #[arg(long)]
    postcode: Option<String>,

    /// Current market value
    #[arg(long)]
    value: Option<Decimal>,

    /// Outstanding loan balance
    #[arg(long)]
    loan: Option<Decimal>,

    /// Monthly loan repayment
    #[arg(long)]
    repayment: Option<Decimal>,

    /// Rent amount, read through --rent-frequency
    #[arg(long)]
    rent: Option<Decimal>,

    /// "weekly" or "monthly"
    #[arg(long, value_parser = parse_rent_frequency)]
    rent_frequency: Option<RentFrequency>,

    /// Yearly running expenses
    #[arg(long)]
    expenses: Option<Decimal>,
}

impl FactArgs {
    fn into_patch(self) -> PropertyPatch {
        PropertyPatch {
            nickname: self.nickname.into(),
            address: self.address.into(),
            suburb: self.suburb.into(),
            state: self.state.into(),
            postcode: self.postcode.into(),
            current_value: self.value.into(),
            outstanding_loan: self.loan.into(),
            monthly_loan_repayment: self.repayment.into(),
            rent_amount: self.rent.into(),
            rent_frequency: self.rent_frequency.into(),
            yearly_expenses: self.expenses.into(),
            ..PropertyPatch::default()
        }
    }
}

fn parse_id(value: String) -> Result<Id> {
    Ok(Id::from_string_checked(value)?)
}

fn money(value: Option<Decimal>) -> String {
    match value {
        Some(value) => format!("${value}"),
        None => "-".to_string(),
    }
}

fn print_record_line(record: &PropertyRecord) {
    println!(
        "{}  {:7}  {:>14}  {}",
        record.id,
        record.status.as_str(),
        money(record.current_value),
        record.display_name()
    );
}

fn print_record(record: &PropertyRecord) {
    println!("{} [{}]", record.display_name(), record.status);
    println!("  id:       {}", record.id);
    if let Some(url) = &record.url {
        println!("  url:      {url}");
    }
    if let Some(address) = &record.address {
        println!("  address:  {address}");
    }
    println!("  purpose:  {}", record.purpose);

    let mut value = format!("  value:    {}", money(record.current_value));
    if let (Some(change), Some(percent)) = (record.daily_change, record.daily_change_percent) {
        value.push_str(&format!(" (change {change}, {percent}%)"));
    }
    println!("{value}");

    println!("  loan:     {}", money(record.outstanding_loan));
    println!("  net:      {}", money(record.net_value));

    if record.is_investment() {
        println!("  rent:     {}/month", money(record.monthly_rent));
        println!(
            "  cash flow: {}/year",
            money(record.yearly_cash_flow)
        );
    }

    println!(
        "  updated:  {}",
        record.last_updated.format("%Y-%m-%d %H:%M UTC")
    );
}

fn print_stats(stats: &PortfolioStats) {
    println!(
        "Properties: {} ({} active, {} pending, {} error)",
        stats.total_properties, stats.active, stats.pending, stats.errored
    );
    println!("Total value:            ${}", stats.total_property_value);
    println!("Outstanding loans:      ${}", stats.total_outstanding_loans);
    println!("Net value:              ${}", stats.total_net_value);
    println!("Annual rental income:   ${}", stats.total_annual_rental_income);
    println!("Annual loan repayments: ${}", stats.total_annual_loan_repayments);
    println!("Yearly expenses:        ${}", stats.total_yearly_expenses);
    println!("Yearly cash flow:       ${}", stats.overall_yearly_cash_flow);
    if !stats.is_cash_flow_positive {
        println!("Yearly shortage:        ${}", stats.overall_yearly_shortage);
    }
    if let Some(average) = stats.average_daily_change_percent {
        println!("Average daily change:   {average}%");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load propfolio config: {}", cli.config.display()))?;

    let Some(command) = cli.command else {
        println!("Propfolio - Local-first property portfolio tracker");
        println!("===================================================\n");
        println!("Config: {}", cli.config.display());
        println!("Data directory: {}\n", config.data_dir.display());
        println!("Commands:");
        println!("  add       Track a property from a listing URL or manual facts");
        println!("  list      List tracked properties");
        println!("  show      Show one property in full");
        println!("  set       Fold new facts into a property");
        println!("  refresh   Re-harvest one property");
        println!("  sweep     Refresh every tracked property");
        println!("  remove    Stop tracking a property");
        println!("  stats     Portfolio totals and cash flow");
        println!("  series    Aggregate portfolio value by day");
        println!("  history   Value history for one property");
        println!("  config    Show current configuration\n");
        println!("Run 'propfolio --help' for more options.");
        return Ok(());
    };

    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));
    let harvester =
        Harvester::new(Arc::new(HttpPageFetcher::new())).with_config(&config.harvest);
    let tracker = PropertyTracker::new(storage, harvester)
        .with_sweep_delay(config.harvest.sweep_delay)
        .with_window_days(config.report.window_days);

    match command {
        Command::Add(args) => {
            let patch = args.facts.into_patch();
            let record = match args.url {
                Some(url) => {
                    let created = tracker.track_url(&url, args.purpose, patch).await?;
                    // The first harvest runs right away; the record leaves
                    // `pending` before the command returns.
                    tracker.refresh(&created.id).await?
                }
                None => tracker.track_manual(args.purpose, patch).await?,
            };
            print_record(&record);
        }
        Command::List(args) => {
            let filter = PropertyFilter {
                search: args.search,
                suburb: args.suburb,
                purpose: args.purpose,
            };
            let records = tracker.list(&filter).await?;
            if records.is_empty() {
                println!("No tracked properties.");
            }
            for record in &records {
                print_record_line(record);
            }
        }
        Command::Show { id } => {
            let record = tracker.get(&parse_id(id)?).await?;
            print_record(&record);
        }
        Command::Set(args) => {
            let id = parse_id(args.id)?;
            let mut patch = args.facts.into_patch();
            patch.purpose = args.purpose.into();
            let record = tracker.update(&id, patch).await?;
            print_record(&record);
        }
        Command::Refresh { id } => {
            let record = tracker.refresh(&parse_id(id)?).await?;
            print_record(&record);
        }
        Command::Sweep => {
            let outcome = tracker.sweep().await?;
            println!(
                "Sweep complete: {} refreshed, {} errored",
                outcome.refreshed, outcome.errored
            );
        }
        Command::Remove { id } => {
            let id = parse_id(id)?;
            tracker.remove(&id).await?;
            println!("Removed {id}");
        }
        Command::Stats => {
            let stats = tracker.portfolio_stats().await?;
            print_stats(&stats);
        }
        Command::Series { days } => {
            let points = tracker.portfolio_series(days).await?;
            if points.is_empty() {
                println!("No history in the window.");
            }
            for point in &points {
                println!(
                    "{}  value ${}  loan ${}  net ${}",
                    point.date, point.total_value, point.total_loan, point.total_net
                );
            }
        }
        Command::History { id, days } => {
            let entries = tracker.history(&parse_id(id)?, days).await?;
            if entries.is_empty() {
                println!("No history in the window.");
            }
            for entry in &entries {
                println!(
                    "{}  value {}  loan {}  net {}",
                    entry.recorded_at.format("%Y-%m-%d %H:%M"),
                    money(Some(entry.value)),
                    money(entry.loan),
                    money(entry.net_value)
                );
            }
        }
        Command::Config => {
            println!("Config file: {}", cli.config.display());
            println!("Data directory: {}", config.data_dir.display());
            println!("Request delay: {:?}", config.harvest.request_delay);
            println!("Fetch timeout: {:?}", config.harvest.fetch_timeout);
            println!("Sweep delay: {:?}", config.harvest.sweep_delay);
            println!("Report window: {} days", config.report.window_days);
        }
    }

    Ok(())
}
