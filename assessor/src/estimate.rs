//! Cost and timeline estimates.
//!
//! Issue estimates travel as display strings (`"$1,500-$3,000"`,
//! `"6-9 months"`). Parsing returns typed results; callers pick the
//! fallback explicitly, so one malformed field never aborts an assessment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::types::{RiskLevel, TrademarkIssue};

/// Error parsing an estimate string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimateParseError {
    #[error("Unparseable cost range: {0:?}")]
    Cost(String),

    #[error("Unparseable month range: {0:?}")]
    Months(String),
}

/// Dollar amount range, whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CostRange {
    pub low: u64,
    pub high: u64,
}

impl CostRange {
    pub fn new(low: u64, high: u64) -> Self {
        Self {
            low: low.min(high),
            high: low.max(high),
        }
    }

    /// Integer mean of the bounds.
    pub fn midpoint(&self) -> u64 {
        (self.low + self.high) / 2
    }
}

impl fmt::Display for CostRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "${}", format_dollars(self.low))
        } else {
            write!(f, "${}-${}", format_dollars(self.low), format_dollars(self.high))
        }
    }
}

impl FromStr for CostRange {
    type Err = EstimateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cost_range(s)
    }
}

impl TryFrom<String> for CostRange {
    type Error = EstimateParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_cost_range(&value)
    }
}

impl From<CostRange> for String {
    fn from(value: CostRange) -> Self {
        value.to_string()
    }
}

/// Duration range in months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthRange {
    pub min: u32,
    pub max: u32,
}

impl MonthRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Integer mean of the bounds.
    pub fn midpoint(&self) -> u32 {
        (self.min + self.max) / 2
    }
}

impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{} months", self.min)
        } else {
            write!(f, "{}-{} months", self.min, self.max)
        }
    }
}

impl FromStr for MonthRange {
    type Err = EstimateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_month_range(s)
    }
}

impl TryFrom<String> for MonthRange {
    type Error = EstimateParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_month_range(&value)
    }
}

impl From<MonthRange> for String {
    fn from(value: MonthRange) -> Self {
        value.to_string()
    }
}

/// Format whole dollars with thousands separators.
pub fn format_dollars(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn split_range(s: &str) -> Vec<&str> {
    s.split(|c: char| c == '-' || c == '–')
        .map(str::trim)
        .collect()
}

/// Parse `"$5,000-10,000"`, `"$5,000-$10,000"` or `"$2,000"`.
pub fn parse_cost_range(s: &str) -> Result<CostRange, EstimateParseError> {
    let err = || EstimateParseError::Cost(s.to_string());

    let amounts = split_range(s.trim())
        .into_iter()
        .map(|part| {
            let digits: String = part
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            digits.trim().parse::<u64>().map_err(|_| err())
        })
        .collect::<Result<Vec<_>, _>>()?;

    match amounts.as_slice() {
        [single] => Ok(CostRange::new(*single, *single)),
        [low, high] => Ok(CostRange::new(*low, *high)),
        _ => Err(err()),
    }
}

/// Parse `"6-9 months"`, `"6 months"` or `"12"`.
pub fn parse_month_range(s: &str) -> Result<MonthRange, EstimateParseError> {
    let err = || EstimateParseError::Months(s.to_string());

    let trimmed = s.trim();
    let body = trimmed
        .strip_suffix("months")
        .or_else(|| trimmed.strip_suffix("month"))
        .unwrap_or(trimmed);

    let months = split_range(body.trim())
        .into_iter()
        .map(|part| part.parse::<u32>().map_err(|_| err()))
        .collect::<Result<Vec<_>, _>>()?;

    match months.as_slice() {
        [single] => Ok(MonthRange::new(*single, *single)),
        [min, max] => Ok(MonthRange::new(*min, *max)),
        _ => Err(err()),
    }
}

/// Cost and time expected to resolve an issue of some severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityEstimate {
    pub cost: CostRange,
    pub time: MonthRange,
}

/// Estimate table and fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    /// Estimates by severity
    pub table: BTreeMap<RiskLevel, SeverityEstimate>,
    /// Used for severities missing from the table
    pub unknown_severity: SeverityEstimate,
    /// Substituted for an unparseable issue cost (dollars)
    pub fallback_cost: u64,
    /// Substituted for an unparseable issue time (months)
    pub fallback_months: u32,
    /// Timeline base when there are no issues (months)
    pub empty_timeline_months: u32,
    /// Months added to the longest issue to form the timeline window
    pub timeline_window_months: u32,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        let entry = |low, high, min, max| SeverityEstimate {
            cost: CostRange::new(low, high),
            time: MonthRange::new(min, max),
        };

        let mut table = BTreeMap::new();
        table.insert(RiskLevel::Critical, entry(5_000, 10_000, 12, 18));
        table.insert(RiskLevel::High, entry(3_000, 6_000, 9, 12));
        table.insert(RiskLevel::Moderate, entry(1_500, 3_000, 6, 9));
        table.insert(RiskLevel::Low, entry(500, 1_500, 3, 6));
        table.insert(RiskLevel::Minimal, entry(0, 500, 1, 3));

        Self {
            table,
            unknown_severity: entry(1_000, 2_000, 6, 6),
            fallback_cost: 2_000,
            fallback_months: 6,
            empty_timeline_months: 6,
            timeline_window_months: 3,
        }
    }
}

impl EstimateConfig {
    /// Estimate for a severity, or the unknown-severity default.
    pub fn lookup(&self, severity: RiskLevel) -> SeverityEstimate {
        self.table
            .get(&severity)
            .copied()
            .unwrap_or(self.unknown_severity)
    }

    /// Midpoint cost of an issue, falling back when unparseable.
    pub fn issue_cost(&self, issue: &TrademarkIssue) -> u64 {
        match parse_cost_range(&issue.estimated_cost) {
            Ok(range) => range.midpoint(),
            Err(e) => {
                warn!(issue = %issue.title, error = %e, fallback = self.fallback_cost, "Using fallback cost");
                self.fallback_cost
            }
        }
    }

    /// Midpoint duration of an issue, falling back when unparseable.
    pub fn issue_months(&self, issue: &TrademarkIssue) -> u32 {
        match parse_month_range(&issue.estimated_time) {
            Ok(range) => range.midpoint(),
            Err(e) => {
                warn!(issue = %issue.title, error = %e, fallback = self.fallback_months, "Using fallback duration");
                self.fallback_months
            }
        }
    }

    /// Sum of issue cost midpoints.
    pub fn sum_cost(&self, issues: &[TrademarkIssue]) -> u64 {
        issues.iter().map(|i| self.issue_cost(i)).sum()
    }

    /// Sum of issue duration midpoints.
    pub fn sum_months(&self, issues: &[TrademarkIssue]) -> u32 {
        issues.iter().map(|i| self.issue_months(i)).sum()
    }

    /// Total cost window: `T` to `1.5 T` for summed midpoints `T`.
    pub fn total_cost(&self, issues: &[TrademarkIssue]) -> CostRange {
        let total = self.sum_cost(issues);
        CostRange::new(total, total * 3 / 2)
    }

    /// Timeline window from the longest issue.
    pub fn total_timeline(&self, issues: &[TrademarkIssue]) -> MonthRange {
        let longest = issues
            .iter()
            .map(|i| self.issue_months(i))
            .max()
            .unwrap_or(self.empty_timeline_months);
        MonthRange::new(longest, longest + self.timeline_window_months)
    }
}
