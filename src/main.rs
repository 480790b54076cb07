// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use bank_desk::{find_account, list_accounts, open_database, transactions_for_account};

#[derive(Parser)]
#[command(name = "bank-desk", version)]
#[command(about = "Single-user banking desk over a local SQLite file", long_about = None)]
struct Cli {
    /// SQLite database file, created on first run
    #[arg(long, env = "BANK_DESK_DB", default_value = "bank_accounts.db", global = true)]
    db: PathBuf,

    /// Append log output to this file (the UI logs nowhere without it)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal desk (default)
    Ui,
    /// List every account and its balance
    Accounts,
    /// Print the transaction log of one account
    History {
        name: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Ui);
    let interactive = matches!(command, Command::Ui);

    init_logging(cli.log_file.as_deref(), interactive)?;

    match command {
        Command::Ui => run_ui_mode(&cli.db),
        Command::Accounts => run_accounts(&cli.db),
        Command::History { name, format } => run_history(&cli.db, &name, format),
    }
}

fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // stderr would draw over the alternate screen
        None if interactive => {
            builder.filter_level(log::LevelFilter::Off);
        }
        None => {}
    }

    builder.init();
    Ok(())
}

fn run_accounts(db_path: &Path) -> Result<()> {
    let conn = open_database(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let accounts = list_accounts(&conn)?;

    println!("{:<24} {:>14}", "Account", "Balance");
    println!("{}", "─".repeat(39));
    for account in &accounts {
        println!("{:<24} {:>14.2}", account.name, account.balance);
    }
    println!("\n✓ {} accounts", accounts.len());

    Ok(())
}

fn run_history(db_path: &Path, name: &str, format: OutputFormat) -> Result<()> {
    let conn = open_database(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    if find_account(&conn, name)?.is_none() {
        bail!("Account '{}' not found", name);
    }

    let records = transactions_for_account(&conn, name)?;

    match format {
        OutputFormat::Table => {
            println!("{:<20} {:<13} {:>12}  {}", "Date", "Type", "Amount", "Counterparty");
            println!("{}", "─".repeat(60));
            for record in &records {
                println!(
                    "{:<20} {:<13} {:>12.2}  {}",
                    record.date,
                    record.transaction_type,
                    record.amount,
                    record.recipient.as_deref().unwrap_or("")
                );
            }
            println!("\n✓ {} transactions for {}", records.len(), name);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(io::stdout());
            for record in &records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(db_path: &Path) -> Result<()> {
    println!("🏦 Opening {}...", db_path.display());

    let conn = open_database(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let mut app = ui::App::new(bank_desk::Controller::new(conn));

    log::info!("bank-desk {} started on {}", bank_desk::VERSION, db_path.display());
    ui::run_ui(&mut app)?;
    log::info!("bank-desk closed");

    println!("✅ Goodbye");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_db_path: &Path) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or inspect the store with: bank-desk accounts");
    std::process::exit(1);
}
