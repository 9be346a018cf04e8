use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::enum_column;
use crate::error::{CostwiseError, Result};
use crate::models::{DateRange, NewTransaction, Transaction, TransactionType};

const COLUMNS: &str = "t.id, t.date, t.description, t.amount, t.category, t.txn_type";

pub(crate) fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        txn_type: enum_column(row, 5)?,
    })
}

pub fn insert_transaction(conn: &Connection, txn: &NewTransaction) -> Result<i64> {
    if !(txn.amount > 0.0) || !txn.amount.is_finite() {
        return Err(CostwiseError::InvalidInput(format!(
            "transaction amount must be positive, got {}",
            txn.amount
        )));
    }
    conn.execute(
        "INSERT INTO transactions (date, description, amount, category, txn_type) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            txn.date,
            txn.description.trim(),
            txn.amount,
            txn.category.trim(),
            txn.txn_type.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let txn = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM transactions t WHERE t.id = ?1"),
            [id],
            transaction_from_row,
        )
        .optional()?;
    Ok(txn)
}

/// Transactions ordered by date, optionally limited to a range.
pub fn list_transactions(conn: &Connection, range: Option<DateRange>) -> Result<Vec<Transaction>> {
    let (start, end) = match range {
        Some(r) => (Some(r.start), Some(r.end)),
        None => (None, None),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM transactions t \
         WHERE (?1 IS NULL OR t.date >= ?1) AND (?2 IS NULL OR t.date <= ?2) \
         ORDER BY t.date, t.id"
    ))?;
    let rows = stmt.query_map(rusqlite::params![start, end], transaction_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Expense transactions that have no classification yet.
pub fn unclassified_expenses(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM transactions t \
         LEFT JOIN classifications c ON c.transaction_id = t.id \
         WHERE t.txn_type = ?1 AND c.transaction_id IS NULL \
         ORDER BY t.date, t.id"
    ))?;
    let rows = stmt.query_map([TransactionType::Expense.as_str()], transaction_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn expenses(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM transactions t WHERE t.txn_type = ?1 ORDER BY t.date, t.id"
    ))?;
    let rows = stmt.query_map([TransactionType::Expense.as_str()], transaction_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn new_txn(date: &str, description: &str, amount: f64, txn_type: TransactionType) -> NewTransaction {
        NewTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            amount,
            category: "Operations".to_string(),
            txn_type,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let (_dir, conn) = test_db();
        let id = insert_transaction(&conn, &new_txn("2025-01-15", " Office Rent ", 5000.0, TransactionType::Expense)).unwrap();
        let txn = get_transaction(&conn, id).unwrap().unwrap();
        assert_eq!(txn.description, "Office Rent");
        assert_eq!(txn.txn_type, TransactionType::Expense);
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert!(get_transaction(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let (_dir, conn) = test_db();
        assert!(insert_transaction(&conn, &new_txn("2025-01-15", "Zero", 0.0, TransactionType::Expense)).is_err());
        assert!(insert_transaction(&conn, &new_txn("2025-01-15", "Neg", -5.0, TransactionType::Expense)).is_err());
    }

    #[test]
    fn test_list_by_range() {
        let (_dir, conn) = test_db();
        insert_transaction(&conn, &new_txn("2025-01-15", "A", 10.0, TransactionType::Expense)).unwrap();
        insert_transaction(&conn, &new_txn("2025-02-15", "B", 10.0, TransactionType::Income)).unwrap();
        insert_transaction(&conn, &new_txn("2025-03-15", "C", 10.0, TransactionType::Expense)).unwrap();

        assert_eq!(list_transactions(&conn, None).unwrap().len(), 3);
        let feb = DateRange::month(2025, 2).unwrap();
        let rows = list_transactions(&conn, Some(feb)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "B");
    }

    #[test]
    fn test_unclassified_expenses_skips_income() {
        let (_dir, conn) = test_db();
        insert_transaction(&conn, &new_txn("2025-01-15", "Rent", 10.0, TransactionType::Expense)).unwrap();
        insert_transaction(&conn, &new_txn("2025-01-16", "Sale", 10.0, TransactionType::Income)).unwrap();
        let rows = unclassified_expenses(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "Rent");
    }
}
