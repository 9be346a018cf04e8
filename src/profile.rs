use rusqlite::{Connection, OptionalExtension};

use crate::db::list_column;
use crate::error::{CostwiseError, Result};
use crate::models::BusinessProfile;

/// Upsert the account's single business profile.
pub fn save_profile(conn: &Connection, profile: &BusinessProfile) -> Result<()> {
    if profile.category.trim().is_empty() {
        return Err(CostwiseError::InvalidInput(
            "business profile needs a category".to_string(),
        ));
    }
    conn.execute(
        "INSERT INTO business_profile \
         (id, category, business_model, core_activities, revenue_streams, cost_centers, size_scale, revenue_range, updated_at) \
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now')) \
         ON CONFLICT(id) DO UPDATE SET \
         category = excluded.category, business_model = excluded.business_model, \
         core_activities = excluded.core_activities, revenue_streams = excluded.revenue_streams, \
         cost_centers = excluded.cost_centers, size_scale = excluded.size_scale, \
         revenue_range = excluded.revenue_range, updated_at = excluded.updated_at",
        rusqlite::params![
            profile.category.trim(),
            profile.business_model,
            serde_json::to_string(&clean(&profile.core_activities))?,
            serde_json::to_string(&clean(&profile.revenue_streams))?,
            serde_json::to_string(&clean(&profile.cost_centers))?,
            profile.size_scale,
            profile.revenue_range,
        ],
    )?;
    Ok(())
}

/// The account's business profile, or `None` when it has not been set up.
pub fn get_profile(conn: &Connection) -> Result<Option<BusinessProfile>> {
    let profile = conn
        .query_row(
            "SELECT category, business_model, core_activities, revenue_streams, cost_centers, \
             size_scale, revenue_range FROM business_profile WHERE id = 1",
            [],
            |row| {
                Ok(BusinessProfile {
                    category: row.get(0)?,
                    business_model: row.get(1)?,
                    core_activities: list_column(row, 2)?,
                    revenue_streams: list_column(row, 3)?,
                    cost_centers: list_column(row, 4)?,
                    size_scale: row.get(5)?,
                    revenue_range: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

fn clean(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(v)) {
            out.push(v.to_string());
        }
    }
    out
}
