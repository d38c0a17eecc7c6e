use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use expense_tracker::tools::{AddExpenseArgs, ListExpensesArgs, SummarizeArgs};
use expense_tracker::{CategoryCatalog, Config, build_server, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "expense-tracker")]
#[command(about = "Personal expense tracker served as MCP tools over HTTP or stdio")]
#[command(version)]
struct Cli {
    /// YAML config file (default: <config dir>/expense-tracker/config.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Category list JSON file
    #[arg(long, global = true)]
    categories_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over HTTP at /mcp (default)
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (default: $PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve MCP over stdin/stdout
    Stdio,

    /// Record an expense
    Add {
        #[arg(allow_negative_numbers = true)]
        amount: f64,

        category: String,

        /// Expense date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long, default_value = "")]
        subcategory: String,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// List expenses in a date range, newest first
    List {
        /// First date, inclusive (default: first day of this month)
        #[arg(long)]
        from: Option<String>,

        /// Last date, inclusive (default: today)
        #[arg(long)]
        to: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Totals per category in a date range
    Summarize {
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        /// Only this category
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the category list document
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("expense_tracker=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.db_path {
        config.db_path = path;
    }
    if let Some(path) = cli.categories_path {
        config.categories_path = path;
    }

    let command = cli.command.unwrap_or(Commands::Serve { host: None, port: None });

    match command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            let mcp = build_server(&config)?;
            server::serve_http(mcp, &config.bind_addr()).await?;
        }
        Commands::Stdio => {
            let mcp = build_server(&config)?;
            server::serve_stdio(mcp).await?;
        }
        Commands::Add {
            amount,
            category,
            date,
            subcategory,
            note,
        } => {
            let mcp = build_server(&config)?;
            let date = date.unwrap_or_else(|| format_date(today()));
            let result = mcp.tools().add_expense(AddExpenseArgs {
                date: date.clone(),
                amount,
                category: category.clone(),
                subcategory,
                note,
            })?;
            println!(
                "{} #{} {} {:.2} {}",
                "Added".green(),
                result.id,
                date,
                amount,
                category.bold()
            );
        }
        Commands::List { from, to, json } => {
            let mcp = build_server(&config)?;
            let (start_date, end_date) = resolve_range(from, to);
            let expenses = mcp.tools().list_expenses(ListExpensesArgs { start_date, end_date })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&expenses)?);
            } else if expenses.is_empty() {
                println!("{}", "No expenses in range".dimmed());
            } else {
                for e in &expenses {
                    let detail = match (e.subcategory.is_empty(), e.note.is_empty()) {
                        (true, true) => String::new(),
                        (false, true) => format!(" / {}", e.subcategory),
                        (true, false) => format!("  {}", e.note.dimmed()),
                        (false, false) => format!(" / {}  {}", e.subcategory, e.note.dimmed()),
                    };
                    println!(
                        "{:>6}  {}  {:>10.2}  {}{}",
                        format!("#{}", e.id).dimmed(),
                        e.date,
                        e.amount,
                        e.category.bold(),
                        detail
                    );
                }
            }
        }
        Commands::Summarize {
            from,
            to,
            category,
            json,
        } => {
            let mcp = build_server(&config)?;
            let (start_date, end_date) = resolve_range(from, to);
            let summary = mcp.tools().summarize(SummarizeArgs {
                start_date,
                end_date,
                category,
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if summary.is_empty() {
                println!("{}", "No expenses in range".dimmed());
            } else {
                for s in &summary {
                    println!(
                        "{:<24} {:>12} {}",
                        s.category.bold(),
                        format!("{:.2}", s.total).green(),
                        format!("({} entries)", s.count).dimmed()
                    );
                }
            }
        }
        Commands::Categories => {
            let catalog = CategoryCatalog::new(&config.categories_path);
            println!("{}", catalog.read()?);
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fill in a missing bound with the current month-to-date range
fn resolve_range(from: Option<String>, to: Option<String>) -> (String, String) {
    let today = today();
    let month_start = today.with_day(1).unwrap_or(today);
    (
        from.unwrap_or_else(|| format_date(month_start)),
        to.unwrap_or_else(|| format_date(today)),
    )
}
