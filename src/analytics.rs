use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::classifications::classification_from_row;
use crate::error::Result;
use crate::models::{
    AnalyticsMetric, ClassifiedTransaction, CostNature, CostType, DateRange, Granularity,
    TransactionType,
};
use crate::transactions::transaction_from_row;

// ---------------------------------------------------------------------------
// Period summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub gross_profit: f64,
    pub net_profit: f64,
    pub gross_profit_margin: f64,
    pub net_profit_margin: f64,
    pub fixed_costs: f64,
    pub variable_costs: f64,
    pub mixed_costs: f64,
    pub direct_costs: f64,
    pub indirect_costs: f64,
    /// Expenses with no classification; counted in neither cost split.
    pub unclassified_costs: f64,
    pub contribution_margin: f64,
    pub contribution_margin_ratio: f64,
    pub average_daily_revenue: f64,
    pub break_even_days: f64,
    pub margin_of_safety: f64,
    pub margin_of_safety_days: f64,
    pub transaction_count: usize,
}

/// `num / den`, or 0 when the denominator is zero.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    let r = num / den;
    if r.is_finite() { r } else { 0.0 }
}

fn percent(num: f64, den: f64) -> f64 {
    ratio(num, den) * 100.0
}

fn summarize<'a, I>(items: I, range: DateRange) -> FinancialSummary
where
    I: IntoIterator<Item = &'a ClassifiedTransaction>,
{
    let mut s = FinancialSummary::default();

    for item in items.into_iter().filter(|i| range.contains(i.transaction.date)) {
        let txn = &item.transaction;
        s.transaction_count += 1;
        if txn.txn_type.is_revenue() {
            s.total_revenue += txn.amount;
            continue;
        }
        if txn.txn_type != TransactionType::Expense {
            continue;
        }
        s.total_expenses += txn.amount;
        let Some(c) = &item.classification else {
            s.unclassified_costs += txn.amount;
            continue;
        };
        match c.cost_type {
            CostType::Fixed => s.fixed_costs += txn.amount,
            CostType::Variable => s.variable_costs += txn.amount,
            CostType::Mixed => s.mixed_costs += txn.amount,
        }
        match c.cost_nature {
            CostNature::Direct => s.direct_costs += txn.amount,
            CostNature::Indirect => s.indirect_costs += txn.amount,
        }
    }

    s.gross_profit = s.total_revenue - s.direct_costs;
    s.net_profit = s.total_revenue - s.total_expenses;
    s.gross_profit_margin = percent(s.gross_profit, s.total_revenue);
    s.net_profit_margin = percent(s.net_profit, s.total_revenue);

    s.contribution_margin = s.total_revenue - s.variable_costs;
    s.contribution_margin_ratio = percent(s.contribution_margin, s.total_revenue);

    s.average_daily_revenue = ratio(s.total_revenue, range.days() as f64);
    s.break_even_days = ratio(s.fixed_costs, s.average_daily_revenue);
    s.margin_of_safety = s.total_revenue - s.fixed_costs;
    s.margin_of_safety_days = ratio(s.margin_of_safety, s.average_daily_revenue);
    s
}

/// Financial metrics over the transactions that fall inside `range`.
pub fn aggregate(items: &[ClassifiedTransaction], range: DateRange) -> FinancialSummary {
    summarize(items, range)
}

// ---------------------------------------------------------------------------
// Trend series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub range: DateRange,
    pub summary: FinancialSummary,
}

fn bucket_key(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => date.format("%Y-%m-%d").to_string(),
        Granularity::Month => date.format("%Y-%m").to_string(),
    }
}

fn bucket_range(date: NaiveDate, granularity: Granularity, within: DateRange) -> DateRange {
    match granularity {
        Granularity::Day => DateRange::single(date),
        Granularity::Month => DateRange::month(date.year(), date.month())
            .ok()
            .and_then(|m| m.clip(&within))
            .unwrap_or_else(|| DateRange::single(date)),
    }
}

/// Per-bucket metrics in ascending date order, keeping the most recent
/// `keep_last` buckets (all of them when `keep_last` is 0).
pub fn trend(
    items: &[ClassifiedTransaction],
    range: DateRange,
    granularity: Granularity,
    keep_last: usize,
) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, (DateRange, Vec<&ClassifiedTransaction>)> = BTreeMap::new();
    for item in items.iter().filter(|i| range.contains(i.transaction.date)) {
        let date = item.transaction.date;
        buckets
            .entry(bucket_key(date, granularity))
            .or_insert_with(|| (bucket_range(date, granularity, range), Vec::new()))
            .1
            .push(item);
    }

    let skip = if keep_last == 0 { 0 } else { buckets.len().saturating_sub(keep_last) };
    buckets
        .into_iter()
        .skip(skip)
        .map(|(period, (bucket, members))| TrendPoint {
            period,
            range: bucket,
            summary: summarize(members, bucket),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Stored daily metrics
// ---------------------------------------------------------------------------

/// Transactions in `range` joined with their classification, if any.
pub fn load_classified(conn: &Connection, range: DateRange) -> Result<Vec<ClassifiedTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.description, t.amount, t.category, t.txn_type, \
         c.cost_type, c.cost_nature, c.confidence, c.basis, c.basis_detail \
         FROM transactions t LEFT JOIN classifications c ON c.transaction_id = t.id \
         WHERE t.date >= ?1 AND t.date <= ?2 ORDER BY t.date, t.id",
    )?;
    let rows = stmt.query_map(rusqlite::params![range.start, range.end], |row| {
        let classified: Option<String> = row.get(6)?;
        Ok(ClassifiedTransaction {
            transaction: transaction_from_row(row)?,
            classification: match classified {
                Some(_) => Some(classification_from_row(row, 6)?),
                None => None,
            },
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn daily_metric(date: NaiveDate, items: &[&ClassifiedTransaction]) -> AnalyticsMetric {
    let s = summarize(items.iter().copied(), DateRange::single(date));
    AnalyticsMetric {
        date,
        total_revenue: s.total_revenue,
        total_expenses: s.total_expenses,
        gross_profit: s.gross_profit,
        net_profit: s.net_profit,
        fixed_costs: s.fixed_costs,
        variable_costs: s.variable_costs,
        direct_costs: s.direct_costs,
        indirect_costs: s.indirect_costs,
        transaction_count: s.transaction_count as i64,
    }
}

/// Insert a metric row for every day in `range` that does not have one yet.
/// Existing rows are left as they are. Returns the number of rows inserted.
pub fn ensure_daily_metrics(conn: &Connection, range: DateRange) -> Result<usize> {
    let existing: HashSet<NaiveDate> = {
        let mut stmt = conn.prepare("SELECT date FROM analytics_metrics WHERE date >= ?1 AND date <= ?2")?;
        let rows = stmt.query_map(rusqlite::params![range.start, range.end], |row| row.get::<_, NaiveDate>(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let items = load_classified(conn, range)?;
    let mut by_day: BTreeMap<NaiveDate, Vec<&ClassifiedTransaction>> = BTreeMap::new();
    for item in &items {
        by_day.entry(item.transaction.date).or_default().push(item);
    }

    let mut inserted = 0;
    for date in range.iter_days().filter(|d| !existing.contains(d)) {
        let members = by_day.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        let m = daily_metric(date, members);
        inserted += conn.execute(
            "INSERT OR IGNORE INTO analytics_metrics \
             (date, total_revenue, total_expenses, gross_profit, net_profit, fixed_costs, \
              variable_costs, direct_costs, indirect_costs, transaction_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                m.date,
                m.total_revenue,
                m.total_expenses,
                m.gross_profit,
                m.net_profit,
                m.fixed_costs,
                m.variable_costs,
                m.direct_costs,
                m.indirect_costs,
                m.transaction_count,
            ],
        )?;
    }
    debug!(%range, inserted, "filled daily metric gaps");
    Ok(inserted)
}

/// Recompute every daily metric row in `range`, replacing stale values.
pub fn regenerate_daily_metrics(conn: &Connection, range: DateRange) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM analytics_metrics WHERE date >= ?1 AND date <= ?2",
        rusqlite::params![range.start, range.end],
    )?;
    let written = ensure_daily_metrics(&tx, range)?;
    tx.commit()?;
    info!(%range, written, "regenerated daily metrics");
    Ok(written)
}

pub fn get_daily_metrics(conn: &Connection, range: DateRange) -> Result<Vec<AnalyticsMetric>> {
    let mut stmt = conn.prepare(
        "SELECT date, total_revenue, total_expenses, gross_profit, net_profit, fixed_costs, \
         variable_costs, direct_costs, indirect_costs, transaction_count \
         FROM analytics_metrics WHERE date >= ?1 AND date <= ?2 ORDER BY date",
    )?;
    let rows = stmt.query_map(rusqlite::params![range.start, range.end], |row| {
        Ok(AnalyticsMetric {
            date: row.get(0)?,
            total_revenue: row.get(1)?,
            total_expenses: row.get(2)?,
            gross_profit: row.get(3)?,
            net_profit: row.get(4)?,
            fixed_costs: row.get(5)?,
            variable_costs: row.get(6)?,
            direct_costs: row.get(7)?,
            indirect_costs: row.get(8)?,
            transaction_count: row.get(9)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifications::set_manual_classification;
    use crate::db::{get_connection, init_db};
    use crate::models::{Classification, ClassificationBasis, NewTransaction, Transaction};
    use crate::transactions::insert_transaction;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(date(start), date(end)).unwrap()
    }

    fn item(
        day: &str,
        amount: f64,
        txn_type: TransactionType,
        class: Option<(CostType, CostNature)>,
    ) -> ClassifiedTransaction {
        ClassifiedTransaction {
            transaction: Transaction {
                id: 0,
                date: date(day),
                description: String::new(),
                amount,
                category: String::new(),
                txn_type,
            },
            classification: class.map(|(cost_type, cost_nature)| Classification {
                cost_type,
                cost_nature,
                confidence: 0.8,
                basis: ClassificationBasis::BusinessRules,
            }),
        }
    }

    fn sample() -> Vec<ClassifiedTransaction> {
        vec![
            item("2025-01-10", 100000.0, TransactionType::Income, None),
            item("2025-01-11", 40000.0, TransactionType::Expense, Some((CostType::Variable, CostNature::Direct))),
            item("2025-01-12", 30000.0, TransactionType::Expense, Some((CostType::Fixed, CostNature::Indirect))),
        ]
    }

    #[test]
    fn test_margins() {
        let s = aggregate(&sample(), range("2025-01-01", "2025-01-31"));
        assert_eq!(s.total_revenue, 100000.0);
        assert_eq!(s.total_expenses, 70000.0);
        assert_eq!(s.gross_profit, 60000.0);
        assert_eq!(s.gross_profit_margin, 60.0);
        assert_eq!(s.net_profit, 30000.0);
        assert_eq!(s.net_profit_margin, 30.0);
        assert_eq!(s.transaction_count, 3);
    }

    #[test]
    fn test_contribution_break_even_and_safety() {
        let s = aggregate(&sample(), range("2025-01-01", "2025-01-10"));
        // Only the income falls inside this ten-day range.
        assert_eq!(s.total_expenses, 0.0);

        let s = aggregate(&sample(), range("2025-01-01", "2025-01-20"));
        assert_eq!(s.contribution_margin, 60000.0);
        assert_eq!(s.contribution_margin_ratio, 60.0);
        assert_eq!(s.average_daily_revenue, 5000.0);
        assert_eq!(s.break_even_days, 6.0);
        assert_eq!(s.margin_of_safety, 70000.0);
        assert_eq!(s.margin_of_safety_days, 14.0);
    }

    #[test]
    fn test_zero_revenue_yields_zero_ratios() {
        let items = vec![item("2025-01-11", 500.0, TransactionType::Expense, Some((CostType::Fixed, CostNature::Direct)))];
        let s = aggregate(&items, range("2025-01-01", "2025-01-31"));
        for v in [
            s.gross_profit_margin,
            s.net_profit_margin,
            s.contribution_margin_ratio,
            s.average_daily_revenue,
            s.break_even_days,
            s.margin_of_safety_days,
        ] {
            assert_eq!(v, 0.0);
        }
        assert_eq!(s.net_profit, -500.0);
    }

    #[test]
    fn test_unclassified_and_mixed_buckets() {
        let items = vec![
            item("2025-01-11", 100.0, TransactionType::Expense, None),
            item("2025-01-11", 50.0, TransactionType::Expense, Some((CostType::Mixed, CostNature::Indirect))),
            item("2025-01-11", 75.0, TransactionType::Transfer, None),
            item("2025-01-11", 25.0, TransactionType::Refund, None),
        ];
        let s = aggregate(&items, range("2025-01-11", "2025-01-11"));
        assert_eq!(s.unclassified_costs, 100.0);
        assert_eq!(s.mixed_costs, 50.0);
        assert_eq!(s.fixed_costs + s.variable_costs, 0.0);
        assert_eq!(s.total_expenses, 150.0);
        assert_eq!(s.total_revenue, 25.0);
    }

    #[test]
    fn test_monthly_trend_keeps_latest_buckets() {
        let items = vec![
            item("2025-03-05", 300.0, TransactionType::Income, None),
            item("2025-01-05", 100.0, TransactionType::Income, None),
            item("2025-02-05", 200.0, TransactionType::Income, None),
            item("2025-02-06", 50.0, TransactionType::Expense, Some((CostType::Fixed, CostNature::Indirect))),
        ];
        let points = trend(&items, range("2025-01-01", "2025-03-31"), Granularity::Month, 2);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].period, "2025-02");
        assert_eq!(points[1].period, "2025-03");
        assert_eq!(points[0].summary.net_profit, 150.0);
        assert_eq!(points[0].range.days(), 28);

        let all = trend(&items, range("2025-01-01", "2025-03-31"), Granularity::Month, 0);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_month_bucket_clipped_to_range() {
        let items = vec![item("2025-01-20", 1100.0, TransactionType::Income, None)];
        let points = trend(&items, range("2025-01-15", "2025-01-25"), Granularity::Month, 6);
        assert_eq!(points[0].range.days(), 11);
        assert_eq!(points[0].summary.average_daily_revenue, 100.0);
    }

    #[test]
    fn test_daily_trend() {
        let items = sample();
        let points = trend(&items, range("2025-01-01", "2025-01-31"), Granularity::Day, 12);
        let periods: Vec<&str> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2025-01-10", "2025-01-11", "2025-01-12"]);
    }

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add(conn: &Connection, day: &str, amount: f64, txn_type: TransactionType) -> i64 {
        insert_transaction(
            conn,
            &NewTransaction {
                date: date(day),
                description: "entry".to_string(),
                amount,
                category: String::new(),
                txn_type,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_load_classified_joins_classifications() {
        let (_dir, conn) = test_db();
        let exp = add(&conn, "2025-01-02", 40.0, TransactionType::Expense);
        add(&conn, "2025-01-03", 90.0, TransactionType::Expense);
        set_manual_classification(&conn, exp, CostType::Fixed, CostNature::Direct).unwrap();
        let rows = load_classified(&conn, range("2025-01-01", "2025-01-31")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].classification.as_ref().unwrap().cost_type, CostType::Fixed);
        assert!(rows[1].classification.is_none());
    }

    #[test]
    fn test_ensure_daily_metrics_fills_gaps_once() {
        let (_dir, conn) = test_db();
        add(&conn, "2025-01-02", 500.0, TransactionType::Income);
        let exp = add(&conn, "2025-01-02", 200.0, TransactionType::Expense);
        set_manual_classification(&conn, exp, CostType::Variable, CostNature::Direct).unwrap();

        let week = range("2025-01-01", "2025-01-07");
        assert_eq!(ensure_daily_metrics(&conn, week).unwrap(), 7);
        assert_eq!(ensure_daily_metrics(&conn, week).unwrap(), 0);

        let metrics = get_daily_metrics(&conn, week).unwrap();
        assert_eq!(metrics.len(), 7);
        let jan2 = metrics.iter().find(|m| m.date == date("2025-01-02")).unwrap();
        assert_eq!(jan2.gross_profit, 300.0);
        assert_eq!(jan2.net_profit, 300.0);
        assert_eq!(jan2.variable_costs, 200.0);
        assert_eq!(jan2.transaction_count, 2);
        assert_eq!(metrics[0].transaction_count, 0);
    }

    #[test]
    fn test_existing_rows_not_recomputed_until_regenerated() {
        let (_dir, conn) = test_db();
        let day = range("2025-01-02", "2025-01-02");
        add(&conn, "2025-01-02", 500.0, TransactionType::Income);
        ensure_daily_metrics(&conn, day).unwrap();
        add(&conn, "2025-01-02", 100.0, TransactionType::Income);

        ensure_daily_metrics(&conn, day).unwrap();
        assert_eq!(get_daily_metrics(&conn, day).unwrap()[0].total_revenue, 500.0);

        assert_eq!(regenerate_daily_metrics(&conn, day).unwrap(), 1);
        let metrics = get_daily_metrics(&conn, day).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].total_revenue, 600.0);
    }
}
