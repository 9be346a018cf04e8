//! Expense cost classification.
//!
//! Resolution order: custom rule, pattern library score, business-rule
//! heuristics, then a context-free keyword check when no business profile
//! exists. Keyword checks are case-insensitive substring matches.

use crate::models::{
    BusinessProfile, Classification, ClassificationBasis, CostNature, CostPattern, CostType,
    CustomRule, WILDCARD_CATEGORY,
};
use crate::rules::best_rule_match;

pub const DEFAULT_PATTERN_THRESHOLD: f64 = 0.5;
pub const MAX_AUTOMATIC_CONFIDENCE: f64 = 0.95;

const BUSINESS_RULE_BASE: f64 = 0.6;
const BUSINESS_RULE_CAP: f64 = 0.9;
const FALLBACK_CONFIDENCE: f64 = 0.5;

const FIXED_COST_TERMS: &[&str] = &["rent", "insurance", "salary", "subscription", "license", "depreciation"];
const VARIABLE_COST_TERMS: &[&str] = &["materials", "inventory", "shipping", "commission", "per unit"];
const MANUFACTURING_DIRECT_TERMS: &[&str] = &["material", "labor"];
const SERVICES_DIRECT_TERMS: &[&str] = &["consultant", "professional"];

const FALLBACK_FIXED_TERMS: &[&str] = &["rent", "salary", "insurance", "lease"];
const FALLBACK_DIRECT_TERMS: &[&str] = &["material", "inventory", "production", "cost of goods"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// A pattern must score strictly above this to be used.
    pub pattern_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pattern_threshold: DEFAULT_PATTERN_THRESHOLD,
        }
    }
}

/// Everything classification depends on besides the transaction itself.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext<'a> {
    pub profile: Option<&'a BusinessProfile>,
    pub rules: &'a [CustomRule],
    pub patterns: &'a [CostPattern],
    pub config: ClassifierConfig,
}

impl<'a> ClassifierContext<'a> {
    pub fn new(
        profile: Option<&'a BusinessProfile>,
        rules: &'a [CustomRule],
        patterns: &'a [CostPattern],
    ) -> Self {
        Self {
            profile,
            rules,
            patterns,
            config: ClassifierConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

pub fn classify(description: &str, amount: f64, category: &str, ctx: &ClassifierContext) -> Classification {
    let result = match ctx.profile {
        Some(profile) => from_custom_rules(description, category, profile, ctx.rules)
            .or_else(|| from_patterns(description, category, profile, ctx))
            .unwrap_or_else(|| from_business_rules(description, profile)),
        None => keyword_fallback(description),
    };
    tracing::trace!(
        description,
        amount,
        cost_type = %result.cost_type,
        cost_nature = %result.cost_nature,
        confidence = result.confidence,
        basis = %result.basis,
        "classified expense"
    );
    result
}

fn from_custom_rules(
    description: &str,
    category: &str,
    profile: &BusinessProfile,
    rules: &[CustomRule],
) -> Option<Classification> {
    let rule = best_rule_match(rules, &profile.category, description, category)?;
    Some(Classification {
        cost_type: rule.cost_type,
        cost_nature: rule.cost_nature,
        confidence: rule.confidence.clamp(0.0, MAX_AUTOMATIC_CONFIDENCE),
        basis: ClassificationBasis::CustomRule {
            keyword: rule.keyword.clone(),
        },
    })
}

/// Weighted keyword score of one pattern: the relevance weight counts once per
/// keyword found in either text.
fn pattern_score(pattern: &CostPattern, description: &str, category: &str) -> f64 {
    pattern
        .keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty() && (description.contains(k.as_str()) || category.contains(k.as_str())))
        .count() as f64
        * pattern.relevance_weight
}

fn from_patterns(
    description: &str,
    category: &str,
    profile: &BusinessProfile,
    ctx: &ClassifierContext,
) -> Option<Classification> {
    let desc = description.to_lowercase();
    let cat = category.to_lowercase();
    let business_category = profile.category.trim();

    let mut best: Option<(&CostPattern, f64)> = None;
    for pattern in ctx.patterns.iter().filter(|p| {
        p.business_category.eq_ignore_ascii_case(business_category)
            || p.business_category.eq_ignore_ascii_case(WILDCARD_CATEGORY)
    }) {
        let score = pattern_score(pattern, &desc, &cat);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((pattern, score));
        }
    }

    let (pattern, score) = best?;
    if score <= ctx.config.pattern_threshold {
        return None;
    }
    Some(Classification {
        cost_type: pattern.typical_cost_type,
        cost_nature: pattern.typical_cost_nature,
        confidence: score.min(MAX_AUTOMATIC_CONFIDENCE),
        basis: ClassificationBasis::Pattern {
            name: pattern.pattern_name.clone(),
        },
    })
}

fn from_business_rules(description: &str, profile: &BusinessProfile) -> Classification {
    let desc = description.to_lowercase();
    let mut cost_type = CostType::Variable;
    let mut cost_nature = CostNature::Indirect;
    let mut confidence = BUSINESS_RULE_BASE;
    let mut raise = |by: f64| confidence = (confidence + by).min(BUSINESS_RULE_CAP);

    if contains_any(&desc, FIXED_COST_TERMS) {
        cost_type = CostType::Fixed;
        raise(0.2);
    }
    if contains_any(&desc, VARIABLE_COST_TERMS) {
        cost_type = CostType::Variable;
        raise(0.2);
    }

    let serves_revenue = profile
        .revenue_streams
        .iter()
        .chain(profile.core_activities.iter())
        .map(|s| s.trim().to_lowercase())
        .any(|s| !s.is_empty() && desc.contains(&s));
    if serves_revenue {
        cost_nature = CostNature::Direct;
        raise(0.15);
    }

    let category_terms = if profile.category.trim().eq_ignore_ascii_case("manufacturing") {
        Some(MANUFACTURING_DIRECT_TERMS)
    } else if profile.category.trim().eq_ignore_ascii_case("services") {
        Some(SERVICES_DIRECT_TERMS)
    } else {
        None
    };
    if category_terms.is_some_and(|terms| contains_any(&desc, terms)) {
        cost_type = CostType::Variable;
        cost_nature = CostNature::Direct;
        raise(0.2);
    }

    Classification {
        cost_type,
        cost_nature,
        confidence,
        basis: ClassificationBasis::BusinessRules,
    }
}

fn keyword_fallback(description: &str) -> Classification {
    let desc = description.to_lowercase();
    Classification {
        cost_type: if contains_any(&desc, FALLBACK_FIXED_TERMS) {
            CostType::Fixed
        } else {
            CostType::Variable
        },
        cost_nature: if contains_any(&desc, FALLBACK_DIRECT_TERMS) {
            CostNature::Direct
        } else {
            CostNature::Indirect
        },
        confidence: FALLBACK_CONFIDENCE,
        basis: ClassificationBasis::KeywordFallback,
    }
}
