use colored::Colorize;

use costwise::classifications::{classify_all, clear_manual_override, reclassify_all, set_manual_classification, SaveOutcome};
use costwise::error::Result;
use costwise::models::{CostNature, CostType};
use costwise::settings::load_settings;

use super::open_db;

pub fn run(all: bool) -> Result<()> {
    let conn = open_db()?;
    let options = load_settings().bulk_options();
    let report = if all {
        reclassify_all(&conn, &options)?
    } else {
        classify_all(&conn, &options)?
    };

    println!("Classified {} expense(s)", report.classified.to_string().green());
    if report.kept_manual > 0 {
        println!("Kept {} manual override(s)", report.kept_manual);
    }
    for (id, err) in &report.failed {
        println!("{} #{id}: {err}", "Failed".red().bold());
    }
    Ok(())
}

pub fn set(id: i64, cost_type: &str, cost_nature: &str) -> Result<()> {
    let conn = open_db()?;
    let cost_type: CostType = cost_type.parse()?;
    let cost_nature: CostNature = cost_nature.parse()?;
    let outcome = set_manual_classification(&conn, id, cost_type, cost_nature)?;
    let verb = match outcome {
        SaveOutcome::Inserted => "Classified",
        _ => "Reclassified",
    };
    println!("{verb} #{id} as {cost_type}/{cost_nature} (manual)");
    Ok(())
}

pub fn clear(id: i64) -> Result<()> {
    let conn = open_db()?;
    if clear_manual_override(&conn, id)? {
        println!("Released #{id} back to automatic classification");
    } else {
        println!("{}", format!("#{id} has no manual classification").yellow());
    }
    Ok(())
}
