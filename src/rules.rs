use regex::RegexBuilder;
use rusqlite::Connection;

use crate::db::enum_column;
use crate::error::{CostwiseError, Result};
use crate::models::{CostNature, CostType, CustomRule, MatchType};

pub const DEFAULT_RULE_CONFIDENCE: f64 = 0.8;

fn matches(text: &str, keyword: &str, match_type: MatchType) -> bool {
    let text_lower = text.to_lowercase();
    let key_lower = keyword.to_lowercase();
    match match_type {
        MatchType::Contains => text_lower.contains(&key_lower),
        MatchType::StartsWith => text_lower.trim_start().starts_with(&key_lower),
        MatchType::Regex => RegexBuilder::new(keyword)
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(text))
            .unwrap_or(false),
    }
}

impl CustomRule {
    /// True when the keyword hits the description or the category.
    pub fn matches(&self, description: &str, category: &str) -> bool {
        !self.keyword.is_empty()
            && (matches(description, &self.keyword, self.match_type)
                || matches(category, &self.keyword, self.match_type))
    }
}

/// The winning rule for a transaction under `business_category`.
///
/// Longest keyword wins, then higher confidence, then the older rule.
pub fn best_rule_match<'a>(
    rules: &'a [CustomRule],
    business_category: &str,
    description: &str,
    category: &str,
) -> Option<&'a CustomRule> {
    rules
        .iter()
        .filter(|r| r.business_category.eq_ignore_ascii_case(business_category.trim()))
        .filter(|r| r.matches(description, category))
        .min_by(|a, b| {
            b.keyword
                .chars()
                .count()
                .cmp(&a.keyword.chars().count())
                .then(b.confidence.total_cmp(&a.confidence))
                .then(a.id.cmp(&b.id))
        })
}

/// Store a keyword override. Returns `false` when the keyword is blank or the
/// category already has a rule for it.
pub fn add_custom_rule(
    conn: &Connection,
    business_category: &str,
    keyword: &str,
    match_type: MatchType,
    cost_type: CostType,
    cost_nature: CostNature,
    confidence: f64,
) -> Result<bool> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(false);
    }
    if match_type == MatchType::Regex {
        RegexBuilder::new(keyword)
            .build()
            .map_err(|e| CostwiseError::InvalidInput(format!("invalid regex '{keyword}': {e}")))?;
    }
    let confidence = if confidence.is_nan() { DEFAULT_RULE_CONFIDENCE } else { confidence.clamp(0.0, 1.0) };
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO custom_rules \
         (business_category, keyword, match_type, cost_type, cost_nature, confidence) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            business_category.trim(),
            keyword,
            match_type.as_str(),
            cost_type.as_str(),
            cost_nature.as_str(),
            confidence,
        ],
    )?;
    Ok(inserted == 1)
}

pub fn delete_custom_rule(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM custom_rules WHERE id = ?1", [id])?;
    Ok(deleted == 1)
}

pub fn list_custom_rules(conn: &Connection, business_category: Option<&str>) -> Result<Vec<CustomRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, business_category, keyword, match_type, cost_type, cost_nature, confidence \
         FROM custom_rules WHERE ?1 IS NULL OR business_category = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([business_category.map(str::trim)], |row| {
        Ok(CustomRule {
            id: row.get(0)?,
            business_category: row.get(1)?,
            keyword: row.get(2)?,
            match_type: enum_column(row, 3)?,
            cost_type: enum_column(row, 4)?,
            cost_nature: enum_column(row, 5)?,
            confidence: row.get(6)?,
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

    fn rule(id: i64, keyword: &str, confidence: f64) -> CustomRule {
        CustomRule {
            id,
            business_category: "Services".to_string(),
            keyword: keyword.to_string(),
            match_type: MatchType::Contains,
            cost_type: CostType::Fixed,
            cost_nature: CostNature::Indirect,
            confidence,
        }
    }

    #[test]
    fn test_contains_is_case_insensitive_substring() {
        let r = rule(1, "adobe", 0.8);
        assert!(r.matches("ADOBE CREATIVE CLOUD", ""));
        assert!(r.matches("Payment", "Adobe"));
        assert!(!r.matches("Figma", "Design"));
    }

    #[test]
    fn test_starts_with_and_regex() {
        let mut r = rule(1, "stripe", 0.8);
        r.match_type = MatchType::StartsWith;
        assert!(r.matches("STRIPE PAYOUT", ""));
        assert!(!r.matches("PAY STRIPE FEE", ""));

        r.keyword = r"^aws.*\d+$".to_string();
        r.match_type = MatchType::Regex;
        assert!(r.matches("AWS Services 12345", ""));

        r.keyword = "([unclosed".to_string();
        assert!(!r.matches("([unclosed", ""));
    }

    #[test]
    fn test_longest_keyword_wins() {
        let rules = vec![rule(1, "rent", 0.9), rule(2, "equipment rent", 0.6)];
        let best = best_rule_match(&rules, "Services", "Equipment rental", "").unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_confidence_then_id_break_ties() {
        let rules = vec![rule(1, "cloud", 0.7), rule(2, "aws", 0.7), rule(3, "host", 0.9)];
        let best = best_rule_match(&rules, "Services", "AWS cloud host", "").unwrap();
        assert_eq!(best.id, 1);

        let rules = vec![rule(1, "host", 0.7), rule(2, "aws!", 0.9)];
        let best = best_rule_match(&rules, "Services", "aws! host", "").unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_other_category_rules_ignored() {
        let rules = vec![rule(1, "rent", 0.9)];
        assert!(best_rule_match(&rules, "Retail", "Office rent", "").is_none());
        assert!(best_rule_match(&rules, "services", "Office rent", "").is_some());
    }

    #[test]
    fn test_add_list_delete() {
        let (_dir, conn) = test_db();
        assert!(add_custom_rule(&conn, "Services", "figma", MatchType::Contains, CostType::Fixed, CostNature::Indirect, 0.8).unwrap());
        assert!(add_custom_rule(&conn, "Retail", "boxes", MatchType::Contains, CostType::Variable, CostNature::Direct, 1.7).unwrap());

        let services = list_custom_rules(&conn, Some("Services")).unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].keyword, "figma");

        let all = list_custom_rules(&conn, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].confidence, 1.0);

        assert!(delete_custom_rule(&conn, services[0].id).unwrap());
        assert!(!delete_custom_rule(&conn, services[0].id).unwrap());
        assert_eq!(list_custom_rules(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_and_blank_keywords_rejected() {
        let (_dir, conn) = test_db();
        assert!(add_custom_rule(&conn, "Services", "Figma", MatchType::Contains, CostType::Fixed, CostNature::Indirect, 0.8).unwrap());
        assert!(!add_custom_rule(&conn, "services", "figma", MatchType::Contains, CostType::Fixed, CostNature::Indirect, 0.8).unwrap());
        assert!(!add_custom_rule(&conn, "Services", "   ", MatchType::Contains, CostType::Fixed, CostNature::Indirect, 0.8).unwrap());
    }

    #[test]
    fn test_invalid_regex_rejected_on_add() {
        let (_dir, conn) = test_db();
        let result = add_custom_rule(&conn, "Services", "([bad", MatchType::Regex, CostType::Fixed, CostNature::Indirect, 0.8);
        assert!(result.is_err());
    }
}
