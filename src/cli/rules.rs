use colored::Colorize;
use comfy_table::{Cell, Table};

use costwise::error::{CostwiseError, Result};
use costwise::models::{CostNature, CostType, MatchType, WILDCARD_CATEGORY};
use costwise::profile::get_profile;
use costwise::rules::{add_custom_rule, delete_custom_rule, list_custom_rules};

use super::open_db;

pub fn add(
    keyword: &str,
    cost_type: &str,
    cost_nature: &str,
    category: Option<&str>,
    match_type: &str,
    confidence: f64,
) -> Result<()> {
    let conn = open_db()?;
    let cost_type: CostType = cost_type.parse()?;
    let cost_nature: CostNature = cost_nature.parse()?;
    let match_type: MatchType = match_type.parse()?;
    let category = match category {
        Some(c) => c.to_string(),
        None => get_profile(&conn)?
            .map(|p| p.category)
            .unwrap_or_else(|| WILDCARD_CATEGORY.to_string()),
    };

    if add_custom_rule(&conn, &category, keyword, match_type, cost_type, cost_nature, confidence)? {
        println!("Added rule: '{keyword}' \u{2192} {cost_type}/{cost_nature} ({category})");
    } else {
        println!("{}", format!("Rule '{keyword}' already exists for {category}").yellow());
    }
    Ok(())
}

pub fn list(category: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let rules = list_custom_rules(&conn, category)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Category", "Keyword", "Match", "Cost Type", "Nature", "Confidence"]);
    for r in &rules {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.business_category),
            Cell::new(&r.keyword),
            Cell::new(r.match_type.as_str()),
            Cell::new(r.cost_type),
            Cell::new(r.cost_nature),
            Cell::new(format!("{:.2}", r.confidence)),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db()?;
    if !delete_custom_rule(&conn, id)? {
        return Err(CostwiseError::InvalidInput(format!("No rule with ID {id}")));
    }
    println!("Deleted rule {id}");
    Ok(())
}
