use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use costwise::budget::{add_budget, list_budgets, refresh_spent_amounts, variance_report};
use costwise::error::Result;
use costwise::fmt::{money, percent};
use costwise::models::{BudgetPeriod, NewBudget, VarianceStatus};

use super::{open_db, parse_date, today};

pub fn add(name: &str, category: &str, amount: f64, from_date: &str, to_date: &str, period: &str) -> Result<()> {
    let conn = open_db()?;
    let id = add_budget(
        &conn,
        &NewBudget {
            name: name.to_string(),
            category: category.to_string(),
            allocated_amount: amount,
            start_date: parse_date(from_date)?,
            end_date: parse_date(to_date)?,
            period: period.to_string(),
        },
    )?;
    println!("Added budget #{id}: {name} ({category}) {}", money(amount));
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let budgets = list_budgets(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Category", "From", "To", "Allocated", "Spent"]);
    for b in &budgets {
        table.add_row(vec![
            Cell::new(b.id),
            Cell::new(&b.name),
            Cell::new(&b.category),
            Cell::new(b.start_date),
            Cell::new(b.end_date),
            Cell::new(money(b.allocated_amount)).set_alignment(CellAlignment::Right),
            Cell::new(money(b.spent_amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Budgets\n{table}");
    Ok(())
}

pub fn variance(period: &str, date: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let period: BudgetPeriod = period.parse()?;
    let reference = match date {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let window = period.window(reference)?;
    let report = variance_report(&conn, period, reference)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Budget", "Budgeted", "Actual", "Variance", "%", "Status"]);
    for v in &report {
        let status = match v.status {
            VarianceStatus::Favorable => v.status.as_str().green(),
            VarianceStatus::Unfavorable => v.status.as_str().red(),
            VarianceStatus::OnTrack => v.status.as_str().normal(),
        };
        table.add_row(vec![
            Cell::new(&v.category),
            Cell::new(v.budget_name.as_deref().unwrap_or("(untracked)")),
            Cell::new(money(v.budgeted)).set_alignment(CellAlignment::Right),
            Cell::new(money(v.actual)).set_alignment(CellAlignment::Right),
            Cell::new(money(v.variance)).set_alignment(CellAlignment::Right),
            Cell::new(percent(v.variance_percent)),
            Cell::new(status),
        ]);
    }
    println!("Budget Variance {window}\n{table}");
    Ok(())
}

pub fn refresh() -> Result<()> {
    let conn = open_db()?;
    let updated = refresh_spent_amounts(&conn)?;
    println!("Refreshed spend on {updated} budget(s)");
    Ok(())
}
