//! End-to-end engine flow: profile, transactions, classification, analytics, budgets.

use chrono::NaiveDate;
use rusqlite::Connection;
use tempfile::TempDir;

use costwise::analytics::{aggregate, ensure_daily_metrics, get_daily_metrics, load_classified};
use costwise::budget::{add_budget, variance_report};
use costwise::classifications::{
    classify_all, get_classification, reclassify_all, set_manual_classification, BulkOptions,
};
use costwise::db::{get_connection, init_db};
use costwise::models::{
    BudgetPeriod, BusinessProfile, ClassificationBasis, CostNature, CostType, DateRange,
    NewBudget, NewTransaction, TransactionType, VarianceStatus,
};
use costwise::profile::save_profile;
use costwise::rules::add_custom_rule;
use costwise::transactions::insert_transaction;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> (TempDir, Connection) {
    let dir = TempDir::new().unwrap();
    let conn = get_connection(&dir.path().join("costwise.db")).unwrap();
    init_db(&conn).unwrap();
    save_profile(
        &conn,
        &BusinessProfile {
            category: "Manufacturing".to_string(),
            core_activities: vec!["metal fabrication".to_string()],
            ..BusinessProfile::default()
        },
    )
    .unwrap();
    (dir, conn)
}

fn add(conn: &Connection, day: &str, description: &str, amount: f64, category: &str, txn_type: TransactionType) -> i64 {
    insert_transaction(
        conn,
        &NewTransaction {
            date: date(day),
            description: description.to_string(),
            amount,
            category: category.to_string(),
            txn_type,
        },
    )
    .unwrap()
}

/// Office rent, a raw material purchase and one client payment in January 2025.
fn seed_january(conn: &Connection) -> (i64, i64, i64) {
    let rent = add(conn, "2025-01-05", "Office Rent", 5000.0, "Facilities", TransactionType::Expense);
    let materials = add(conn, "2025-01-10", "Raw Materials Purchase", 2000.0, "Materials", TransactionType::Expense);
    let income = add(conn, "2025-01-15", "Client payment", 50000.0, "Sales", TransactionType::Income);
    (rent, materials, income)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_classification_end_to_end() {
    let (_dir, conn) = setup();
    let (rent, materials, income) = seed_january(&conn);

    let report = classify_all(&conn, &BulkOptions::default()).unwrap();
    assert_eq!(report.classified, 2);
    assert!(report.failed.is_empty());

    let rent_c = get_classification(&conn, rent).unwrap().unwrap();
    let rent_c = rent_c.classification();
    assert_eq!(rent_c.cost_type, CostType::Fixed);
    assert!(rent_c.confidence >= 0.6);

    let mat = get_classification(&conn, materials).unwrap().unwrap();
    let mat = mat.classification();
    assert_eq!(mat.cost_type, CostType::Variable);
    assert_eq!(mat.cost_nature, CostNature::Direct);
    assert!(mat.confidence >= 0.8);

    assert!(get_classification(&conn, income).unwrap().is_none());

    // A second run finds nothing left to do.
    let again = classify_all(&conn, &BulkOptions::default()).unwrap();
    assert_eq!(again.classified, 0);
}

#[test]
fn test_custom_rule_and_manual_override() {
    let (_dir, conn) = setup();
    let (rent, materials, _) = seed_january(&conn);
    assert!(add_custom_rule(
        &conn,
        "Manufacturing",
        "office rent",
        Default::default(),
        CostType::Mixed,
        CostNature::Indirect,
        0.99,
    )
    .unwrap());

    classify_all(&conn, &BulkOptions::default()).unwrap();
    let stored = get_classification(&conn, rent).unwrap().unwrap();
    let c = stored.classification();
    assert_eq!(c.cost_type, CostType::Mixed);
    assert_eq!(c.confidence, 0.95);
    assert!(matches!(&c.basis, ClassificationBasis::CustomRule { keyword } if keyword == "office rent"));

    set_manual_classification(&conn, materials, CostType::Fixed, CostNature::Indirect).unwrap();
    let report = reclassify_all(&conn, &BulkOptions::default()).unwrap();
    assert_eq!(report.kept_manual, 1);
    assert_eq!(report.classified, 1);
    let kept = get_classification(&conn, materials).unwrap().unwrap();
    assert!(kept.is_manual());
    assert_eq!(kept.classification().cost_type, CostType::Fixed);
}

#[test]
fn test_january_summary() {
    let (_dir, conn) = setup();
    seed_january(&conn);
    classify_all(&conn, &BulkOptions::default()).unwrap();

    let january = DateRange::month(2025, 1).unwrap();
    let s = aggregate(&load_classified(&conn, january).unwrap(), january);
    assert_eq!(s.total_revenue, 50000.0);
    assert_eq!(s.total_expenses, 7000.0);
    assert_eq!(s.direct_costs, 2000.0);
    assert_eq!(s.gross_profit, 48000.0);
    assert_eq!(s.net_profit, 43000.0);
    assert_eq!(s.fixed_costs, 5000.0);
    assert_eq!(s.contribution_margin, 48000.0);
    assert!(approx(s.contribution_margin_ratio, 96.0));
    assert!(approx(s.break_even_days, 3.1));
    assert_eq!(s.margin_of_safety, 45000.0);
    assert_eq!(s.transaction_count, 3);
}

#[test]
fn test_daily_metrics_fill_gaps() {
    let (_dir, conn) = setup();
    seed_january(&conn);
    classify_all(&conn, &BulkOptions::default()).unwrap();

    let january = DateRange::month(2025, 1).unwrap();
    assert_eq!(ensure_daily_metrics(&conn, january).unwrap(), 31);
    assert_eq!(ensure_daily_metrics(&conn, january).unwrap(), 0);

    let metrics = get_daily_metrics(&conn, january).unwrap();
    assert_eq!(metrics.len(), 31);
    let day10 = metrics.iter().find(|m| m.date == date("2025-01-10")).unwrap();
    assert_eq!(day10.variable_costs, 2000.0);
    assert_eq!(day10.direct_costs, 2000.0);
    let revenue: f64 = metrics.iter().map(|m| m.total_revenue).sum();
    assert_eq!(revenue, 50000.0);
}

#[test]
fn test_budget_variance_against_january() {
    let (_dir, conn) = setup();
    seed_january(&conn);
    add_budget(
        &conn,
        &NewBudget {
            name: "Materials".to_string(),
            category: "materials".to_string(),
            allocated_amount: 1000.0,
            start_date: date("2025-01-01"),
            end_date: date("2025-01-31"),
            period: "monthly".to_string(),
        },
    )
    .unwrap();

    let report = variance_report(&conn, BudgetPeriod::CurrentMonth, date("2025-01-20")).unwrap();
    assert_eq!(report.len(), 2);
    // Untracked rent spend has the larger absolute variance.
    assert_eq!(report[0].category, "Facilities");
    assert!(report[0].budget_name.is_none());
    assert_eq!(report[0].variance, -5000.0);
    assert_eq!(report[1].budget_name.as_deref(), Some("Materials"));
    assert_eq!(report[1].actual, 2000.0);
    assert_eq!(report[1].variance_percent, -100.0);
    assert_eq!(report[1].status, VarianceStatus::Unfavorable);

    let february = variance_report(&conn, BudgetPeriod::LastMonth, date("2025-03-02")).unwrap();
    assert!(february.is_empty());
}
