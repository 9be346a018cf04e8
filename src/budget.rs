use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{CostwiseError, Result};
use crate::models::{
    Budget, BudgetPeriod, BudgetVariance, DateRange, NewBudget, Transaction, TransactionType,
    VarianceStatus,
};
use crate::transactions::list_transactions;

const STATUS_BAND_PERCENT: f64 = 10.0;
pub const UNCATEGORIZED: &str = "Uncategorized";

impl BudgetPeriod {
    /// Calendar window for this period as seen from `today`.
    pub fn window(&self, today: NaiveDate) -> Result<DateRange> {
        match self {
            Self::CurrentMonth => DateRange::month(today.year(), today.month()),
            Self::LastMonth => {
                if today.month() == 1 {
                    DateRange::month(today.year() - 1, 12)
                } else {
                    DateRange::month(today.year(), today.month() - 1)
                }
            }
            Self::Quarter => {
                let first = (today.month() - 1) / 3 * 3 + 1;
                let start = DateRange::month(today.year(), first)?;
                let end = DateRange::month(today.year(), first + 2)?;
                DateRange::new(start.start, end.end)
            }
            Self::Year => {
                let start = DateRange::month(today.year(), 1)?;
                let end = DateRange::month(today.year(), 12)?;
                DateRange::new(start.start, end.end)
            }
        }
    }
}

fn category_name(category: &str) -> &str {
    match category.trim() {
        "" => UNCATEGORIZED,
        name => name,
    }
}

fn category_key(category: &str) -> String {
    category_name(category).to_lowercase()
}

fn status_for(variance_percent: f64) -> VarianceStatus {
    if variance_percent > STATUS_BAND_PERCENT {
        VarianceStatus::Favorable
    } else if variance_percent < -STATUS_BAND_PERCENT {
        VarianceStatus::Unfavorable
    } else {
        VarianceStatus::OnTrack
    }
}

/// Compare budgets active in `window` with actual expense spend in the same
/// window, largest absolute variance first. Spend in a category with no active
/// budget is reported as untracked with a zero budget.
pub fn variance(budgets: &[Budget], transactions: &[Transaction], window: DateRange) -> Vec<BudgetVariance> {
    // key -> (display name, actual)
    let mut actuals: BTreeMap<String, (String, f64)> = BTreeMap::new();
    for txn in transactions
        .iter()
        .filter(|t| t.txn_type == TransactionType::Expense && window.contains(t.date))
    {
        actuals
            .entry(category_key(&txn.category))
            .or_insert_with(|| (category_name(&txn.category).to_string(), 0.0))
            .1 += txn.amount;
    }

    let active: Vec<&Budget> = budgets
        .iter()
        .filter(|b| window.overlaps(b.start_date, b.end_date))
        .collect();

    let mut results: Vec<BudgetVariance> = active
        .iter()
        .map(|b| {
            let actual = actuals
                .get(&category_key(&b.category))
                .map_or(0.0, |(_, spent)| *spent);
            let variance = b.allocated_amount - actual;
            let variance_percent = if b.allocated_amount == 0.0 {
                0.0
            } else {
                variance / b.allocated_amount * 100.0
            };
            BudgetVariance {
                budget_name: Some(b.name.clone()),
                category: b.category.clone(),
                budgeted: b.allocated_amount,
                actual,
                variance,
                variance_percent,
                status: status_for(variance_percent),
            }
        })
        .collect();

    for (key, (name, actual)) in &actuals {
        let tracked = active.iter().any(|b| &category_key(&b.category) == key);
        if !tracked && *actual > 0.0 {
            results.push(BudgetVariance {
                budget_name: None,
                category: name.clone(),
                budgeted: 0.0,
                actual: *actual,
                variance: -actual,
                variance_percent: -100.0,
                status: VarianceStatus::Unfavorable,
            });
        }
    }

    results.sort_by(|a, b| {
        b.variance
            .abs()
            .total_cmp(&a.variance.abs())
            .then_with(|| a.category.cmp(&b.category))
    });
    results
}

// ---------------------------------------------------------------------------
// Budget store
// ---------------------------------------------------------------------------

pub fn add_budget(conn: &Connection, budget: &NewBudget) -> Result<i64> {
    if budget.name.trim().is_empty() || budget.category.trim().is_empty() {
        return Err(CostwiseError::InvalidInput("budget needs a name and a category".to_string()));
    }
    if !(budget.allocated_amount >= 0.0) {
        return Err(CostwiseError::InvalidInput(format!(
            "allocated amount must not be negative, got {}",
            budget.allocated_amount
        )));
    }
    DateRange::new(budget.start_date, budget.end_date)?;
    conn.execute(
        "INSERT INTO budgets (name, category, allocated_amount, start_date, end_date, period) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            budget.name.trim(),
            budget.category.trim(),
            budget.allocated_amount,
            budget.start_date,
            budget.end_date,
            budget.period,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_budgets(conn: &Connection) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, allocated_amount, spent_amount, start_date, end_date, period \
         FROM budgets ORDER BY start_date, name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Budget {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            allocated_amount: row.get(3)?,
            spent_amount: row.get(4)?,
            start_date: row.get(5)?,
            end_date: row.get(6)?,
            period: row.get(7)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Recompute the cached `spent_amount` of every budget from the expenses in
/// its category and date interval. Returns the number of budgets updated.
pub fn refresh_spent_amounts(conn: &Connection) -> Result<usize> {
    let budgets = list_budgets(conn)?;
    let mut updated = 0;
    for b in &budgets {
        let key = category_key(&b.category);
        let spent: f64 = list_transactions(conn, Some(DateRange::new(b.start_date, b.end_date)?))?
            .iter()
            .filter(|t| t.txn_type == TransactionType::Expense && category_key(&t.category) == key)
            .map(|t| t.amount)
            .sum();
        if spent != b.spent_amount {
            conn.execute("UPDATE budgets SET spent_amount = ?1 WHERE id = ?2", rusqlite::params![spent, b.id])?;
            debug!(budget = %b.name, spent, "refreshed budget spend");
            updated += 1;
        }
    }
    Ok(updated)
}

/// Load budgets and transactions and compute the variance report for `period`.
pub fn variance_report(conn: &Connection, period: BudgetPeriod, today: NaiveDate) -> Result<Vec<BudgetVariance>> {
    let window = period.window(today)?;
    let budgets = list_budgets(conn)?;
    let transactions = list_transactions(conn, Some(window))?;
    let report = variance(&budgets, &transactions, window);
    info!(
        period = period.as_str(),
        %window,
        entries = report.len(),
        "budget variance computed"
    );
    Ok(report)
}
