use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};

use crate::error::{CostwiseError, Result};
use crate::patterns::seed_default_patterns;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL CHECK (amount > 0),
    category TEXT NOT NULL DEFAULT '',
    txn_type TEXT NOT NULL
        CHECK (txn_type IN ('income', 'expense', 'transfer', 'investment', 'refund')),
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions (date);

CREATE TABLE IF NOT EXISTS business_profile (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    category TEXT NOT NULL,
    business_model TEXT NOT NULL DEFAULT '',
    core_activities TEXT NOT NULL DEFAULT '[]',
    revenue_streams TEXT NOT NULL DEFAULT '[]',
    cost_centers TEXT NOT NULL DEFAULT '[]',
    size_scale TEXT NOT NULL DEFAULT '',
    revenue_range TEXT NOT NULL DEFAULT '',
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS cost_patterns (
    id INTEGER PRIMARY KEY,
    pattern_name TEXT NOT NULL,
    business_category TEXT NOT NULL COLLATE NOCASE,
    keywords TEXT NOT NULL DEFAULT '[]',
    typical_cost_type TEXT NOT NULL CHECK (typical_cost_type IN ('fixed', 'variable', 'mixed')),
    typical_cost_nature TEXT NOT NULL CHECK (typical_cost_nature IN ('direct', 'indirect')),
    relevance_weight REAL NOT NULL CHECK (relevance_weight > 0)
);

CREATE TABLE IF NOT EXISTS custom_rules (
    id INTEGER PRIMARY KEY,
    business_category TEXT NOT NULL COLLATE NOCASE,
    keyword TEXT NOT NULL COLLATE NOCASE,
    match_type TEXT NOT NULL DEFAULT 'contains',
    cost_type TEXT NOT NULL CHECK (cost_type IN ('fixed', 'variable', 'mixed')),
    cost_nature TEXT NOT NULL CHECK (cost_nature IN ('direct', 'indirect')),
    confidence REAL NOT NULL CHECK (confidence >= 0 AND confidence <= 1),
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (business_category, keyword)
);

CREATE TABLE IF NOT EXISTS classifications (
    transaction_id INTEGER PRIMARY KEY,
    cost_type TEXT NOT NULL CHECK (cost_type IN ('fixed', 'variable', 'mixed')),
    cost_nature TEXT NOT NULL CHECK (cost_nature IN ('direct', 'indirect')),
    confidence REAL NOT NULL,
    basis TEXT NOT NULL,
    basis_detail TEXT,
    origin TEXT NOT NULL CHECK (origin IN ('automatic', 'manual')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (transaction_id) REFERENCES transactions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS analytics_metrics (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL UNIQUE,
    total_revenue REAL NOT NULL,
    total_expenses REAL NOT NULL,
    gross_profit REAL NOT NULL,
    net_profit REAL NOT NULL,
    fixed_costs REAL NOT NULL,
    variable_costs REAL NOT NULL,
    direct_costs REAL NOT NULL,
    indirect_costs REAL NOT NULL,
    transaction_count INTEGER NOT NULL,
    generated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS budgets (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    allocated_amount REAL NOT NULL CHECK (allocated_amount >= 0),
    spent_amount REAL NOT NULL DEFAULT 0,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    period TEXT NOT NULL DEFAULT 'monthly',
    created_at TEXT DEFAULT (datetime('now')),
    CHECK (end_date >= start_date)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM cost_patterns", [], |row| row.get(0))?;
    if count == 0 {
        seed_default_patterns(conn)?;
    }
    Ok(())
}

/// Read a text column into one of the string-backed model enums.
pub(crate) fn enum_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = CostwiseError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a JSON array column holding a list of strings.
pub(crate) fn list_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
