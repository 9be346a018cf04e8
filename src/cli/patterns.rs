use comfy_table::{Cell, Table};

use costwise::error::Result;
use costwise::patterns::load_patterns;

use super::open_db;

pub fn list(category: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let patterns = load_patterns(&conn, category)?;

    let mut table = Table::new();
    table.set_header(vec!["Pattern", "Category", "Keywords", "Cost Type", "Nature", "Weight"]);
    for p in &patterns {
        table.add_row(vec![
            Cell::new(&p.pattern_name),
            Cell::new(&p.business_category),
            Cell::new(p.keywords.join(", ")),
            Cell::new(p.typical_cost_type),
            Cell::new(p.typical_cost_nature),
            Cell::new(format!("{:.2}", p.relevance_weight)),
        ]);
    }
    println!("Cost Patterns\n{table}");
    Ok(())
}
