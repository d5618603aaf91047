//! Plain-text search report parser.
//!
//! Pulls the applied-for mark, classes, goods/services lines, report date
//! and USPTO prior-mark records out of text extracted from a search report.
//! Prior marks come back without similarity scores.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{PriorMark, Result};

const MAX_PRIOR_MARKS: usize = 50;
const MIN_GOODS_LEN: usize = 10;

/// Fields recovered from a search report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReport {
    pub mark: Option<String>,
    pub classes: Vec<u32>,
    pub goods_services: Vec<String>,
    pub prior_marks: Vec<PriorMark>,
    pub report_date: Option<String>,
}

impl ParsedReport {
    /// Goods/services lines joined for use in a request.
    pub fn goods_services_text(&self) -> Option<String> {
        if self.goods_services.is_empty() {
            None
        } else {
            Some(self.goods_services.join("; "))
        }
    }
}

/// Compiled report patterns.
pub struct ReportParser {
    mark: Vec<Regex>,
    classes: Regex,
    goods: Vec<Regex>,
    date: Regex,
    uspto_start: Regex,
    uspto_end: Regex,
    record: Regex,
}

impl ReportParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            mark: vec![
                Regex::new(r"(?im)^\s*Mark:[ \t]*([^\n]+)")?,
                Regex::new(r"(?i)Trademark:[ \t]*([^\n]+)")?,
                Regex::new(r"(?i)Applied-for Mark:[ \t]*([^\n]+)")?,
            ],
            classes: Regex::new(r"(?i)Class(?:es)?:[ \t]*([\d, \t]+)")?,
            goods: vec![
                Regex::new(r"(?i)Goods/Services:[ \t]*([^\n]+)")?,
                Regex::new(r"(?i)Class \d+:[ \t]*([^\n]+)")?,
            ],
            date: Regex::new(r"(?i)(?:Report Date|Search Date|Date):\s*([A-Za-z]+\s+\d{1,2},\s*\d{4})")?,
            uspto_start: Regex::new(r"(?i)UNITED STATES PATENT AND TRADEMARK OFFICE|USPTO")?,
            uspto_end: Regex::new(r"(?i)STATE TRADEMARK|COMMON LAW|DOMAIN NAMES?")?,
            record: Regex::new(
                r"([A-Z][A-Z0-9 ,.\-']{2,50})\s+(?:Reg(?:istration)?\.?\s*No\.?\s*:?\s*([\d,]+)|Serial\s*No\.?\s*:?\s*([\d,]+))",
            )?,
        })
    }

    pub fn parse(&self, text: &str) -> ParsedReport {
        let report = ParsedReport {
            mark: self.extract_mark(text),
            classes: self.extract_classes(text),
            goods_services: self.extract_goods(text),
            prior_marks: self.extract_prior_marks(text),
            report_date: self
                .date
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string()),
        };

        debug!(
            mark = ?report.mark,
            classes = report.classes.len(),
            prior_marks = report.prior_marks.len(),
            "Parsed report"
        );
        report
    }

    fn extract_mark(&self, text: &str) -> Option<String> {
        self.mark.iter().find_map(|re| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|m| !m.is_empty())
        })
    }

    fn extract_classes(&self, text: &str) -> Vec<u32> {
        self.classes
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| {
                m.as_str()
                    .split(',')
                    .filter_map(|c| c.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_goods(&self, text: &str) -> Vec<String> {
        self.goods
            .iter()
            .flat_map(|re| re.captures_iter(text))
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|g| g.len() > MIN_GOODS_LEN)
            .collect()
    }

    fn uspto_section<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = self.uspto_start.find(text)?.end();
        let rest = &text[start..];
        let end = self.uspto_end.find(rest).map(|m| m.start()).unwrap_or(rest.len());
        Some(&rest[..end])
    }

    fn extract_prior_marks(&self, text: &str) -> Vec<PriorMark> {
        let Some(section) = self.uspto_section(text) else {
            return Vec::new();
        };

        self.record
            .captures_iter(section)
            .filter_map(|c| {
                let name = c.get(1)?.as_str().trim().trim_end_matches(',').trim();
                let number = c.get(2).or_else(|| c.get(3))?.as_str().replace(',', "");
                Some(PriorMark::new(name).with_registration(number))
            })
            .take(MAX_PRIOR_MARKS)
            .collect()
    }
}

/// Parse a report with freshly compiled patterns.
pub fn parse_report(text: &str) -> Result<ParsedReport> {
    Ok(ReportParser::new()?.parse(text))
}
