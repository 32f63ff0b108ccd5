// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use minicore_commissions::{
    calculate_commissions, get_active_tiers, import_sales_csv, open_database, seed_database,
    AppConfig, CommissionQuery, CommissionReport,
};

#[derive(Debug, Parser)]
#[command(name = "minicore", version, about = "Tiered sales commission calculator")]
struct Cli {
    /// SQLite database path (overrides MINICORE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Wipe the database and load demo tiers, salespeople and sales
    Seed,

    /// Compute commissions over a date range
    Commissions {
        /// First day (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: String,

        /// Last day, inclusive
        #[arg(long)]
        to: String,

        /// Salesperson id ("all" for everyone)
        #[arg(long)]
        salesperson: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List active commission tiers in resolution order
    Tiers,

    /// Import sales from CSV (salesperson_email,amount,date,description)
    ImportSales { csv: PathBuf },

    /// Interactive commission dashboard (default)
    Ui {
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    minicore_commissions::logging::init_logger(config.log_format, cli.verbose);

    let conn = open_database(&config.db_path)?;

    match cli.command.unwrap_or(Command::Ui { from: None, to: None }) {
        Command::Seed => run_seed(&conn),
        Command::Commissions {
            from,
            to,
            salesperson,
            json,
        } => run_commissions(&conn, &from, &to, salesperson.as_deref(), json),
        Command::Tiers => run_tiers(&conn),
        Command::ImportSales { csv } => run_import(&conn, &csv),
        Command::Ui { from, to } => run_ui_mode(conn, from, to),
    }
}

fn run_seed(conn: &Connection) -> Result<()> {
    println!("🌱 Seeding database...\n");

    let summary = seed_database(conn, &mut rand::rng())?;

    println!("✅ {} commission tiers created", summary.tiers.len());
    for tier in &summary.tiers {
        println!(
            "   - {}: ${} - ${} ({}%)",
            tier.name, tier.min_amount, tier.max_amount, tier.rate
        );
    }

    println!("\n✅ {} salespeople created", summary.totals.len());
    for total in &summary.totals {
        println!("   - {} ({})", total.name, total.email);
    }

    println!("\n✅ {} sales created", summary.sales_inserted);
    println!("\n📊 Sales by salesperson:");
    for total in &summary.totals {
        println!("   - {}: ${:.2}", total.name, total.total_sales);
    }

    Ok(())
}

fn run_commissions(
    conn: &Connection,
    from: &str,
    to: &str,
    salesperson: Option<&str>,
    json: bool,
) -> Result<()> {
    let query = CommissionQuery::parse(Some(from), Some(to), salesperson)?;
    let report = calculate_commissions(conn, &query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &CommissionReport) {
    println!("💰 Commission Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:<12} {:<22} {:>10} {:>6} {:<18} {:>10}",
        "Date", "Salesperson", "Amount", "Rate", "Tier", "Commission"
    );

    for (record, detail) in report.sales.iter().zip(&report.aggregate.details) {
        println!(
            "{:<12} {:<22} {:>10.2} {:>5}% {:<18} {:>10.2}",
            record.sale.date.format("%Y-%m-%d"),
            format!("{} {}", record.salesperson.first_name, record.salesperson.last_name),
            detail.amount,
            detail.rate,
            detail.tier_name,
            detail.commission
        );
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Sales:            {}", report.aggregate.sale_count);
    println!("Total sales:      ${:.2}", report.aggregate.total_sales_amount);
    println!("Total commission: ${:.2}", report.aggregate.total_commission);
}

fn run_tiers(conn: &Connection) -> Result<()> {
    let tiers = get_active_tiers(conn)?;

    if tiers.is_empty() {
        println!("⚠️  No active commission tiers. Run: minicore seed");
        return Ok(());
    }

    for (position, tier) in tiers.iter().enumerate() {
        println!(
            "{}. {:<18} ${:>10} - ${:>10}  {:>5}%",
            position + 1,
            tier.name,
            tier.min_amount,
            tier.max_amount,
            tier.rate
        );
    }

    Ok(())
}

fn run_import(conn: &Connection, csv: &Path) -> Result<()> {
    println!("📂 Importing sales from {:?}...", csv);

    let summary = import_sales_csv(conn, csv)?;

    println!("✓ Read: {} rows", summary.read);
    println!("✓ Inserted: {} sales", summary.inserted);
    println!("✓ Skipped duplicates: {}", summary.duplicates);

    Ok(())
}

/// Default dashboard window: the last three months
#[cfg(feature = "tui")]
fn default_range(from: Option<String>, to: Option<String>) -> Result<CommissionQuery> {
    use chrono::{Months, Utc};

    let today = Utc::now().date_naive();
    let from = from.unwrap_or_else(|| {
        today
            .checked_sub_months(Months::new(3))
            .unwrap_or(today)
            .to_string()
    });
    let to = to.unwrap_or_else(|| today.to_string());

    Ok(CommissionQuery::parse(Some(&from), Some(&to), None)?)
}

#[cfg(feature = "tui")]
fn run_ui_mode(conn: Connection, from: Option<String>, to: Option<String>) -> Result<()> {
    println!("🖥️  Loading commission dashboard...\n");

    let query = default_range(from, to)?;
    let mut app = ui::App::load(conn, query)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_conn: Connection, _from: Option<String>, _to: Option<String>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: minicore commissions --from <date> --to <date>");
    std::process::exit(1);
}
