pub mod analytics;
pub mod budget;
pub mod classify;
pub mod init;
pub mod patterns;
pub mod profile;
pub mod rules;
pub mod transactions;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use costwise::db::get_connection;
use costwise::error::{CostwiseError, Result};
use costwise::models::DateRange;
use costwise::settings::db_path;

pub(crate) fn open_db() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(CostwiseError::Settings(format!(
            "no database at {}; run `costwise init` first",
            path.display()
        )));
    }
    get_connection(&path)
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CostwiseError::InvalidInput(format!("expected a YYYY-MM-DD date, got '{s}'")))
}

fn parse_month(m: &str) -> Result<DateRange> {
    let invalid = || CostwiseError::InvalidInput(format!("expected YYYY-MM, got '{m}'"));
    let (year, month) = m.split_once('-').ok_or_else(invalid)?;
    let year = year.parse().map_err(|_| invalid())?;
    let month = month.parse().map_err(|_| invalid())?;
    DateRange::month(year, month)
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `--month` wins over `--from/--to`; with nothing given the current month is used.
pub(crate) fn resolve_range(
    month: Option<&str>,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<DateRange> {
    if let Some(m) = month {
        return parse_month(m);
    }
    let t = today();
    let current = DateRange::month(t.year(), t.month())?;
    let start = from_date.map(parse_date).transpose()?.unwrap_or(current.start);
    let end = to_date.map(parse_date).transpose()?.unwrap_or(current.end);
    DateRange::new(start, end)
}

#[derive(Parser)]
#[command(name = "costwise", about = "Cost classification and financial analytics for small businesses.")]
pub struct Cli {
    /// Log filter (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for costwise data (default: ~/Documents/costwise)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage the business profile used for classification.
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Record and list transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Classify expenses by cost type and nature.
    Classify {
        #[command(subcommand)]
        command: ClassifyCommands,
    },
    /// Manage custom classification rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Inspect the industry pattern library.
    Patterns {
        #[command(subcommand)]
        command: PatternsCommands,
    },
    /// Financial ratios, trends and stored daily metrics.
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },
    /// Budgets and variance reports.
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create or replace the business profile.
    Set {
        /// Industry category (e.g. Manufacturing, Services, Retail)
        #[arg(long)]
        category: String,
        #[arg(long = "model", default_value = "")]
        business_model: String,
        /// Core activity; repeat for several
        #[arg(long = "activity")]
        core_activities: Vec<String>,
        /// Revenue stream; repeat for several
        #[arg(long = "revenue-stream")]
        revenue_streams: Vec<String>,
        /// Cost center; repeat for several
        #[arg(long = "cost-center")]
        cost_centers: Vec<String>,
        #[arg(long = "size", default_value = "")]
        size_scale: String,
        #[arg(long = "revenue-range", default_value = "")]
        revenue_range: String,
    },
    /// Show the current business profile.
    Show,
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// Record a transaction.
    Add {
        /// Date (YYYY-MM-DD)
        date: String,
        description: String,
        /// Positive amount; the type says which way it flows
        amount: f64,
        #[arg(long, default_value = costwise::budget::UNCATEGORIZED)]
        category: String,
        /// income, expense, transfer, investment or refund
        #[arg(long = "type", default_value = "expense")]
        txn_type: String,
    },
    /// List transactions with their classification.
    List {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClassifyCommands {
    /// Classify unclassified expenses.
    Run {
        /// Reclassify every expense (manual overrides are kept)
        #[arg(long)]
        all: bool,
    },
    /// Set a manual classification that automatic runs never replace.
    Set {
        id: i64,
        /// fixed, variable or mixed
        cost_type: String,
        /// direct or indirect
        cost_nature: String,
    },
    /// Release a manual classification back to automatic.
    Clear { id: i64 },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a custom rule.
    Add {
        keyword: String,
        /// fixed, variable or mixed
        cost_type: String,
        /// direct or indirect
        cost_nature: String,
        /// Business category the rule applies to (default: profile category)
        #[arg(long)]
        category: Option<String>,
        /// contains, starts_with or regex
        #[arg(long = "match-type", default_value = "contains")]
        match_type: String,
        #[arg(long, default_value_t = costwise::rules::DEFAULT_RULE_CONFIDENCE)]
        confidence: f64,
    },
    /// List custom rules.
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a custom rule.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum PatternsCommands {
    /// List cost patterns.
    List {
        /// Only patterns for this business category (plus General)
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Financial summary for a period.
    Summary {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Bucketed trend of revenue, expenses and margins.
    Trend {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// day or month
        #[arg(long, default_value = "month")]
        granularity: String,
        /// Number of most recent buckets to show (default from settings)
        #[arg(long)]
        periods: Option<usize>,
    },
    /// Fill in missing daily metric rows for a period.
    Generate {
        #[arg(long)]
        month: Option<String>,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Recompute rows that already exist
        #[arg(long)]
        regenerate: bool,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Add a budget for a category and date interval.
    Add {
        name: String,
        category: String,
        amount: f64,
        #[arg(long = "from")]
        from_date: String,
        #[arg(long = "to")]
        to_date: String,
        #[arg(long, default_value = "monthly")]
        period: String,
    },
    /// List budgets.
    List,
    /// Budget vs actual for a period.
    Variance {
        /// current-month, last-month, quarter or year
        #[arg(long, default_value = "current-month")]
        period: String,
        /// Reference date (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Recompute cached spend for every budget.
    Refresh,
}
