use colored::Colorize;
use comfy_table::{Cell, Table};

use costwise::error::Result;
use costwise::models::BusinessProfile;
use costwise::profile::{get_profile, save_profile};

use super::open_db;

pub fn set(profile: BusinessProfile) -> Result<()> {
    let conn = open_db()?;
    save_profile(&conn, &profile)?;
    println!("Saved profile for a {} business", profile.category.trim().bold());
    Ok(())
}

pub fn show() -> Result<()> {
    let conn = open_db()?;
    let Some(p) = get_profile(&conn)? else {
        println!("{}", "No business profile set. Classification uses keyword fallback only.".yellow());
        return Ok(());
    };

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![Cell::new("Category"), Cell::new(&p.category)]);
    table.add_row(vec![Cell::new("Business model"), Cell::new(&p.business_model)]);
    table.add_row(vec![Cell::new("Core activities"), Cell::new(p.core_activities.join(", "))]);
    table.add_row(vec![Cell::new("Revenue streams"), Cell::new(p.revenue_streams.join(", "))]);
    table.add_row(vec![Cell::new("Cost centers"), Cell::new(p.cost_centers.join(", "))]);
    table.add_row(vec![Cell::new("Size"), Cell::new(&p.size_scale)]);
    table.add_row(vec![Cell::new("Revenue range"), Cell::new(&p.revenue_range)]);
    println!("Business Profile\n{table}");
    Ok(())
}
