use rusqlite::Connection;

use crate::db::{enum_column, list_column};
use crate::error::{CostwiseError, Result};
use crate::models::{CostNature, CostPattern, CostType, WILDCARD_CATEGORY};

use crate::models::CostNature::{Direct, Indirect};
use crate::models::CostType::{Fixed, Mixed, Variable};

// (pattern_name, business_category, keywords, cost_type, cost_nature, relevance_weight)
type PatternSeed = (&'static str, &'static str, &'static [&'static str], CostType, CostNature, f64);

const DEFAULT_PATTERNS: &[PatternSeed] = &[
    // General
    ("Facilities & Rent", WILDCARD_CATEGORY, &["rent", "lease", "office space", "coworking"], Fixed, Indirect, 0.6),
    ("Insurance", WILDCARD_CATEGORY, &["insurance", "premium", "liability cover"], Fixed, Indirect, 0.6),
    ("Payroll", WILDCARD_CATEGORY, &["salary", "salaries", "payroll", "wages"], Fixed, Indirect, 0.6),
    ("Software Subscriptions", WILDCARD_CATEGORY, &["subscription", "software", "saas"], Fixed, Indirect, 0.55),
    ("Utilities", WILDCARD_CATEGORY, &["electricity", "utilities", "internet", "phone bill", "water bill"], Mixed, Indirect, 0.5),
    ("Marketing", WILDCARD_CATEGORY, &["advertising", "marketing", "campaign", "sponsorship"], Variable, Indirect, 0.55),
    ("Bank & Merchant Fees", WILDCARD_CATEGORY, &["bank fee", "merchant fee", "transaction fee", "wire fee"], Variable, Indirect, 0.55),
    ("Depreciation", WILDCARD_CATEGORY, &["depreciation", "amortization"], Fixed, Indirect, 0.7),
    ("Professional Fees", WILDCARD_CATEGORY, &["accountant", "legal", "attorney", "bookkeeping"], Mixed, Indirect, 0.55),
    // Manufacturing
    ("Raw Materials", "Manufacturing", &["raw material", "materials", "steel", "resin", "components"], Variable, Direct, 0.45),
    ("Production Labor", "Manufacturing", &["production labor", "assembly", "machine operator", "factory wages"], Variable, Direct, 0.6),
    ("Equipment Maintenance", "Manufacturing", &["maintenance", "repair", "spare parts"], Mixed, Indirect, 0.55),
    ("Freight", "Manufacturing", &["freight", "shipping", "logistics"], Variable, Direct, 0.55),
    // Services
    ("Subcontractors", "Services", &["subcontractor", "consultant", "freelance", "contractor"], Variable, Direct, 0.6),
    ("Client Travel", "Services", &["client travel", "travel", "flight", "hotel"], Variable, Direct, 0.45),
    ("Professional Development", "Services", &["training", "certification", "course"], Fixed, Indirect, 0.55),
    // Retail
    ("Inventory Purchases", "Retail", &["inventory", "wholesale", "stock purchase", "merchandise"], Variable, Direct, 0.6),
    ("Store Lease", "Retail", &["store rent", "retail space", "mall"], Fixed, Indirect, 0.6),
    ("Card Processing", "Retail", &["card processing", "pos fee", "merchant fee"], Variable, Direct, 0.55),
    ("Packaging", "Retail", &["packaging", "labels", "shopping bags"], Variable, Direct, 0.55),
    // Technology
    ("Cloud Hosting", "Technology", &["aws", "azure", "hosting", "cloud", "server"], Variable, Direct, 0.55),
    ("Developer Tools", "Technology", &["github", "jira", "developer tools", "license"], Fixed, Indirect, 0.55),
    ("Contract Developers", "Technology", &["contract developer", "freelance developer", "outsourced development"], Variable, Direct, 0.6),
];

pub fn seed_default_patterns(conn: &Connection) -> Result<()> {
    for (name, category, keywords, cost_type, cost_nature, weight) in DEFAULT_PATTERNS {
        add_pattern(
            conn,
            &CostPattern {
                id: None,
                pattern_name: name.to_string(),
                business_category: category.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                typical_cost_type: *cost_type,
                typical_cost_nature: *cost_nature,
                relevance_weight: *weight,
            },
        )?;
    }
    Ok(())
}

/// Add a pattern to the library and return its id.
pub fn add_pattern(conn: &Connection, pattern: &CostPattern) -> Result<i64> {
    if !(pattern.relevance_weight > 0.0) {
        return Err(CostwiseError::InvalidInput(format!(
            "pattern '{}' needs a positive relevance weight",
            pattern.pattern_name
        )));
    }
    let keywords: Vec<String> = pattern
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    conn.execute(
        "INSERT INTO cost_patterns \
         (pattern_name, business_category, keywords, typical_cost_type, typical_cost_nature, relevance_weight) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            pattern.pattern_name,
            pattern.business_category,
            serde_json::to_string(&keywords)?,
            pattern.typical_cost_type.as_str(),
            pattern.typical_cost_nature.as_str(),
            pattern.relevance_weight,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Patterns for a business category plus the General wildcard, or the whole
/// catalog when no category is given. Ordered by id.
pub fn load_patterns(conn: &Connection, category: Option<&str>) -> Result<Vec<CostPattern>> {
    let base = "SELECT id, pattern_name, business_category, keywords, typical_cost_type, \
                typical_cost_nature, relevance_weight FROM cost_patterns";
    let (sql, params) = match category {
        Some(cat) => (
            format!("{base} WHERE business_category = ?1 OR business_category = ?2 ORDER BY id"),
            vec![cat.to_string(), WILDCARD_CATEGORY.to_string()],
        ),
        None => (format!("{base} ORDER BY id"), Vec::new()),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        Ok(CostPattern {
            id: Some(row.get(0)?),
            pattern_name: row.get(1)?,
            business_category: row.get(2)?,
            keywords: list_column(row, 3)?,
            typical_cost_type: enum_column(row, 4)?,
            typical_cost_nature: enum_column(row, 5)?,
            relevance_weight: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_category_filter_includes_wildcard() {
        let (_dir, conn) = test_db();
        let patterns = load_patterns(&conn, Some("Manufacturing")).unwrap();
        assert!(patterns.iter().any(|p| p.pattern_name == "Raw Materials"));
        assert!(patterns.iter().any(|p| p.business_category == WILDCARD_CATEGORY));
        assert!(patterns.iter().all(|p| p.business_category == "Manufacturing"
            || p.business_category == WILDCARD_CATEGORY));
    }

    #[test]
    fn test_category_filter_is_case_insensitive() {
        let (_dir, conn) = test_db();
        let patterns = load_patterns(&conn, Some("retail")).unwrap();
        assert!(patterns.iter().any(|p| p.pattern_name == "Inventory Purchases"));
    }

    #[test]
    fn test_unfiltered_returns_full_catalog() {
        let (_dir, conn) = test_db();
        let all = load_patterns(&conn, None).unwrap();
        assert_eq!(all.len(), DEFAULT_PATTERNS.len());
    }

    #[test]
    fn test_add_pattern_normalizes_keywords() {
        let (_dir, conn) = test_db();
        add_pattern(
            &conn,
            &CostPattern {
                id: None,
                pattern_name: "Kiln Fuel".to_string(),
                business_category: "Ceramics".to_string(),
                keywords: vec!["  Kiln Gas ".to_string(), "".to_string()],
                typical_cost_type: Variable,
                typical_cost_nature: Direct,
                relevance_weight: 0.8,
            },
        )
        .unwrap();
        let patterns = load_patterns(&conn, Some("Ceramics")).unwrap();
        let kiln = patterns.iter().find(|p| p.pattern_name == "Kiln Fuel").unwrap();
        assert_eq!(kiln.keywords, vec!["kiln gas".to_string()]);
    }

    #[test]
    fn test_add_pattern_rejects_zero_weight() {
        let (_dir, conn) = test_db();
        let result = add_pattern(
            &conn,
            &CostPattern {
                id: None,
                pattern_name: "Nothing".to_string(),
                business_category: WILDCARD_CATEGORY.to_string(),
                keywords: vec!["nothing".to_string()],
                typical_cost_type: Fixed,
                typical_cost_nature: Indirect,
                relevance_weight: 0.0,
            },
        );
        assert!(result.is_err());
    }
}
