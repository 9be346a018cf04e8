use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use costwise::analytics::{
    aggregate, ensure_daily_metrics, load_classified, regenerate_daily_metrics, trend as trend_points,
    FinancialSummary,
};
use costwise::error::Result;
use costwise::fmt::{money, percent};
use costwise::models::{BudgetPeriod, DateRange, Granularity};
use costwise::settings::load_settings;

use super::{open_db, parse_date, resolve_range, today};

fn amount_cell(val: f64) -> Cell {
    Cell::new(money(val)).set_alignment(CellAlignment::Right)
}

fn signed(val: f64) -> String {
    if val < 0.0 {
        money(val).red().to_string()
    } else {
        money(val).green().to_string()
    }
}

pub fn summary(month: Option<&str>, from_date: Option<&str>, to_date: Option<&str>, json: bool) -> Result<()> {
    let conn = open_db()?;
    let range = resolve_range(month, from_date, to_date)?;
    let s = aggregate(&load_classified(&conn, range)?, range);

    if json {
        println!("{}", serde_json::to_string_pretty(&s)?);
        return Ok(());
    }
    print_summary(&s, range);
    Ok(())
}

fn print_summary(s: &FinancialSummary, range: DateRange) {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Revenue".green().bold()), amount_cell(s.total_revenue)]);
    table.add_row(vec![Cell::new("Expenses".red().bold()), amount_cell(s.total_expenses)]);
    table.add_row(vec![Cell::new("  Fixed"), amount_cell(s.fixed_costs)]);
    table.add_row(vec![Cell::new("  Variable"), amount_cell(s.variable_costs)]);
    table.add_row(vec![Cell::new("  Mixed"), amount_cell(s.mixed_costs)]);
    table.add_row(vec![Cell::new("  Direct"), amount_cell(s.direct_costs)]);
    table.add_row(vec![Cell::new("  Indirect"), amount_cell(s.indirect_costs)]);
    table.add_row(vec![Cell::new("  Unclassified"), amount_cell(s.unclassified_costs)]);
    table.add_row(vec![Cell::new(""), Cell::new("")]);
    table.add_row(vec![Cell::new("Gross profit"), Cell::new(signed(s.gross_profit))]);
    table.add_row(vec![Cell::new("Gross margin"), Cell::new(percent(s.gross_profit_margin))]);
    table.add_row(vec![Cell::new("Net profit".bold()), Cell::new(signed(s.net_profit))]);
    table.add_row(vec![Cell::new("Net margin"), Cell::new(percent(s.net_profit_margin))]);
    table.add_row(vec![Cell::new("Contribution margin"), amount_cell(s.contribution_margin)]);
    table.add_row(vec![Cell::new("Contribution ratio"), Cell::new(percent(s.contribution_margin_ratio))]);
    table.add_row(vec![Cell::new("Avg daily revenue"), amount_cell(s.average_daily_revenue)]);
    table.add_row(vec![Cell::new("Break-even (days)"), Cell::new(format!("{:.1}", s.break_even_days))]);
    table.add_row(vec![Cell::new("Margin of safety"), Cell::new(signed(s.margin_of_safety))]);
    table.add_row(vec![Cell::new("Margin of safety (days)"), Cell::new(format!("{:.1}", s.margin_of_safety_days))]);
    table.add_row(vec![Cell::new("Transactions"), Cell::new(s.transaction_count)]);
    println!("Financial Summary {range}\n{table}");
}

pub fn trend(from_date: Option<&str>, to_date: Option<&str>, granularity: &str, periods: Option<usize>) -> Result<()> {
    let conn = open_db()?;
    let granularity: Granularity = granularity.parse()?;
    // Without --from the trend covers the calendar year so far.
    let range = match from_date {
        Some(_) => resolve_range(None, from_date, to_date)?,
        None => {
            let year = BudgetPeriod::Year.window(today())?;
            let end = to_date.map(parse_date).transpose()?.unwrap_or_else(today);
            DateRange::new(year.start, end)?
        }
    };
    let keep_last = periods.unwrap_or_else(|| load_settings().trend_periods);
    let points = trend_points(&load_classified(&conn, range)?, range, granularity, keep_last);

    let mut table = Table::new();
    table.set_header(vec!["Period", "Revenue", "Expenses", "Net", "Net Margin", "Contribution"]);
    for p in &points {
        table.add_row(vec![
            Cell::new(&p.period),
            amount_cell(p.summary.total_revenue),
            amount_cell(p.summary.total_expenses),
            Cell::new(signed(p.summary.net_profit)),
            Cell::new(percent(p.summary.net_profit_margin)),
            Cell::new(percent(p.summary.contribution_margin_ratio)),
        ]);
    }
    println!("Trend {range}\n{table}");
    Ok(())
}

pub fn generate(month: Option<&str>, from_date: Option<&str>, to_date: Option<&str>, regenerate: bool) -> Result<()> {
    let conn = open_db()?;
    let range = resolve_range(month, from_date, to_date)?;
    let written = if regenerate {
        regenerate_daily_metrics(&conn, range)?
    } else {
        ensure_daily_metrics(&conn, range)?
    };
    println!("Wrote {written} daily metric row(s) for {range}");
    Ok(())
}
