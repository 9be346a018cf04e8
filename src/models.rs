use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CostwiseError, Result};

/// Category name that matches every business profile.
pub const WILDCARD_CATEGORY: &str = "General";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
    Investment,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
            Self::Investment => "investment",
            Self::Refund => "refund",
        }
    }

    /// Income and refunds both count towards revenue.
    pub fn is_revenue(&self) -> bool {
        matches!(self, Self::Income | Self::Refund)
    }
}

impl FromStr for TransactionType {
    type Err = CostwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            "investment" => Ok(Self::Investment),
            "refund" => Ok(Self::Refund),
            _ => Err(CostwiseError::UnknownTransactionType(s.to_string())),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostType {
    Fixed,
    Variable,
    Mixed,
}

impl CostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Variable => "variable",
            Self::Mixed => "mixed",
        }
    }
}

impl FromStr for CostType {
    type Err = CostwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "variable" => Ok(Self::Variable),
            "mixed" => Ok(Self::Mixed),
            _ => Err(CostwiseError::UnknownCostType(s.to_string())),
        }
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostNature {
    Direct,
    Indirect,
}

impl CostNature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
        }
    }
}

impl FromStr for CostNature {
    type Err = CostwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "indirect" => Ok(Self::Indirect),
            _ => Err(CostwiseError::UnknownCostNature(s.to_string())),
        }
    }
}

impl fmt::Display for CostNature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a custom rule keyword is compared against a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Regex => "regex",
        }
    }
}

impl FromStr for MatchType {
    type Err = CostwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "regex" => Ok(Self::Regex),
            _ => Err(CostwiseError::InvalidInput(format!("unknown match type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VarianceStatus {
    Favorable,
    Unfavorable,
    OnTrack,
}

impl VarianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Unfavorable => "unfavorable",
            Self::OnTrack => "on-track",
        }
    }
}

impl fmt::Display for VarianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetPeriod {
    CurrentMonth,
    LastMonth,
    Quarter,
    Year,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentMonth => "current-month",
            Self::LastMonth => "last-month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = CostwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "current-month" | "month" => Ok(Self::CurrentMonth),
            "last-month" => Ok(Self::LastMonth),
            "quarter" => Ok(Self::Quarter),
            "year" => Ok(Self::Year),
            _ => Err(CostwiseError::UnknownPeriod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
}

impl FromStr for Granularity {
    type Err = CostwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "month" | "monthly" => Ok(Self::Month),
            _ => Err(CostwiseError::InvalidInput(format!("unknown granularity: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Date ranges
// ---------------------------------------------------------------------------

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(CostwiseError::InvalidInput(format!(
                "range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// Whole calendar month.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let invalid = || CostwiseError::InvalidInput(format!("invalid month {year}-{month:02}"));
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        let end = next.pred_opt().ok_or_else(invalid)?;
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end && end >= self.start
    }

    /// Intersection with another range, if any.
    pub fn clip(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub txn_type: TransactionType,
}

/// A transaction before it is written to the store.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub txn_type: TransactionType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub category: String,
    #[serde(default)]
    pub business_model: String,
    #[serde(default)]
    pub core_activities: Vec<String>,
    #[serde(default)]
    pub revenue_streams: Vec<String>,
    #[serde(default)]
    pub cost_centers: Vec<String>,
    #[serde(default)]
    pub size_scale: String,
    #[serde(default)]
    pub revenue_range: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostPattern {
    pub id: Option<i64>,
    pub pattern_name: String,
    pub business_category: String,
    pub keywords: Vec<String>,
    pub typical_cost_type: CostType,
    pub typical_cost_nature: CostNature,
    pub relevance_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomRule {
    pub id: i64,
    pub business_category: String,
    pub keyword: String,
    pub match_type: MatchType,
    pub cost_type: CostType,
    pub cost_nature: CostNature,
    pub confidence: f64,
}

/// Which classification path produced a result.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationBasis {
    CustomRule { keyword: String },
    Pattern { name: String },
    BusinessRules,
    KeywordFallback,
    Manual,
}

impl ClassificationBasis {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CustomRule { .. } => "custom_rule",
            Self::Pattern { .. } => "pattern",
            Self::BusinessRules => "business_rules",
            Self::KeywordFallback => "keyword_fallback",
            Self::Manual => "manual",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::CustomRule { keyword } => Some(keyword.as_str()),
            Self::Pattern { name } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn from_parts(kind: &str, detail: Option<String>) -> Result<Self> {
        match kind {
            "custom_rule" => Ok(Self::CustomRule { keyword: detail.unwrap_or_default() }),
            "pattern" => Ok(Self::Pattern { name: detail.unwrap_or_default() }),
            "business_rules" => Ok(Self::BusinessRules),
            "keyword_fallback" => Ok(Self::KeywordFallback),
            "manual" => Ok(Self::Manual),
            other => Err(CostwiseError::InvalidInput(format!("unknown classification basis: {other}"))),
        }
    }
}

impl fmt::Display for ClassificationBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CustomRule { keyword } => write!(f, "custom rule '{keyword}'"),
            Self::Pattern { name } => write!(f, "pattern '{name}'"),
            Self::BusinessRules => f.write_str("business rules"),
            Self::KeywordFallback => f.write_str("keyword fallback"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub cost_type: CostType,
    pub cost_nature: CostNature,
    pub confidence: f64,
    pub basis: ClassificationBasis,
}

/// A persisted classification. Manual overrides are never replaced by
/// automatic runs.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredClassification {
    Automatic(Classification),
    ManualOverride(Classification),
}

impl StoredClassification {
    pub fn classification(&self) -> &Classification {
        match self {
            Self::Automatic(c) | Self::ManualOverride(c) => c,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Self::ManualOverride(_))
    }

    pub fn origin(&self) -> &'static str {
        match self {
            Self::Automatic(_) => "automatic",
            Self::ManualOverride(_) => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTransaction {
    pub transaction: Transaction,
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsMetric {
    pub date: NaiveDate,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub gross_profit: f64,
    pub net_profit: f64,
    pub fixed_costs: f64,
    pub variable_costs: f64,
    pub direct_costs: f64,
    pub indirect_costs: f64,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub allocated_amount: f64,
    pub spent_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period: String,
}

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub name: String,
    pub category: String,
    pub allocated_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetVariance {
    pub budget_name: Option<String>,
    pub category: String,
    pub budgeted: f64,
    pub actual: f64,
    pub variance: f64,
    pub variance_percent: f64,
    pub status: VarianceStatus,
}
