use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostwiseError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i64),

    #[error("Transaction {0} is not an expense and cannot be classified")]
    NotExpense(i64),

    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),

    #[error("Unknown cost type: {0}")]
    UnknownCostType(String),

    #[error("Unknown cost nature: {0}")]
    UnknownCostNature(String),

    #[error("Unknown period: {0} (expected current-month, last-month, quarter or year)")]
    UnknownPeriod(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, CostwiseError>;
