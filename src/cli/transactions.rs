use comfy_table::{Cell, CellAlignment, Table};

use costwise::analytics::load_classified;
use costwise::error::Result;
use costwise::fmt::money;
use costwise::models::{NewTransaction, TransactionType};

use super::{open_db, parse_date, resolve_range};

pub fn add(date: &str, description: &str, amount: f64, category: &str, txn_type: &str) -> Result<()> {
    let conn = open_db()?;
    let txn_type: TransactionType = txn_type.parse()?;
    let id = costwise::transactions::insert_transaction(
        &conn,
        &NewTransaction {
            date: parse_date(date)?,
            description: description.to_string(),
            amount,
            category: category.to_string(),
            txn_type,
        },
    )?;
    println!("Added {} #{id}: {description} {}", txn_type, money(amount));
    Ok(())
}

pub fn list(month: Option<&str>, from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let range = resolve_range(month, from_date, to_date)?;
    let rows = load_classified(&conn, range)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Type", "Amount", "Cost", "Conf."]);
    for item in &rows {
        let t = &item.transaction;
        let (cost, confidence) = match &item.classification {
            Some(c) => (
                format!("{}/{}", c.cost_type, c.cost_nature),
                format!("{:.2}", c.confidence),
            ),
            None => (String::new(), String::new()),
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(&t.description),
            Cell::new(&t.category),
            Cell::new(t.txn_type),
            Cell::new(money(t.amount)).set_alignment(CellAlignment::Right),
            Cell::new(cost),
            Cell::new(confidence),
        ]);
    }
    println!("Transactions {range}\n{table}");
    Ok(())
}
