//! Publication date normalization.
//!
//! Turns whatever a page offers as a date (ISO timestamps, "Posted : March 3,
//! 2021", "BALTIMORE, MD – Mar. 3rd 2021", "03.03.2021") into a calendar
//! date. Anything outside a plausible year window is rejected.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:posted|published|updated|released?|date)(?:\s+(?:on|date))?\s*:?\s*")
        .unwrap()
});

/// "BALTIMORE, MD - " style dateline ahead of the date.
static DATELINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z\s,.]*?\s-\s*").unwrap());

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:mon|tue|tues|wed|wednes|thu|thur|thurs|fri|sat|satur|sun)(?:day)?\.?,?\s+")
        .unwrap()
});

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

static ABBREV_DOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([A-Za-z]{3,})\.").unwrap());

static SEPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bsept\b").unwrap());

static ISO_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})[T\s]").unwrap());

/// Date-shaped substrings for full-text scanning.
static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(
            r"(?i)\b{MONTH}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b"
        ))
        .unwrap(),
        Regex::new(&format!(r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+{MONTH}\.?,?\s+\d{{4}}\b")).unwrap(),
        Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
    ]
});

/// Formats tried after cleanup (commas removed, whitespace collapsed).
const DAY_FORMATS: &[&str] = &[
    "%B %d %Y",
    "%d %B %Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%m-%d-%Y",
];

#[derive(Debug, Clone)]
pub struct DateNormalizer {
    earliest_year: i32,
    latest_year: i32,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self {
            earliest_year: 1900,
            latest_year: Utc::now().year() + 1,
        }
    }
}

impl DateNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the accepted year window (inclusive).
    pub fn with_year_range(mut self, earliest: i32, latest: i32) -> Self {
        self.earliest_year = earliest;
        self.latest_year = latest;
        self
    }

    fn plausible(&self, date: NaiveDate) -> Option<NaiveDate> {
        (self.earliest_year..=self.latest_year)
            .contains(&date.year())
            .then_some(date)
    }

    /// Normalize a raw date string to a calendar date.
    pub fn normalize(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(date) = self.machine_readable(raw) {
            return self.plausible(date);
        }

        let cleaned = clean(raw);
        if let Some(date) = self.parse_free_text(&cleaned) {
            return Some(date);
        }
        let without_dateline = DATELINE.replace(&cleaned, "");
        if without_dateline != cleaned {
            if let Some(date) = self.parse_free_text(&without_dateline) {
                return Some(date);
            }
        }
        self.find_in_text(&cleaned)
    }

    /// First plausible date mentioned anywhere in `text`.
    pub fn find_in_text(&self, text: &str) -> Option<NaiveDate> {
        let mut hits: Vec<(usize, &str)> = TEXT_PATTERNS
            .iter()
            .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.as_str())))
            .collect();
        hits.sort_by_key(|(start, _)| *start);
        hits.into_iter().find_map(|(_, hit)| {
            self.machine_readable(hit)
                .and_then(|d| self.plausible(d))
                .or_else(|| self.parse_free_text(&clean(hit)))
        })
    }

    /// RFC 3339, RFC 2822, and ISO date or date-time values.
    fn machine_readable(&self, raw: &str) -> Option<NaiveDate> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.date_naive());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt.date_naive());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(dt.date());
            }
        }
        ISO_PREFIX
            .captures(raw)
            .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok())
    }

    fn parse_free_text(&self, text: &str) -> Option<NaiveDate> {
        let text = WEEKDAY.replace(text, "");
        let text = text.trim_matches(|c: char| !c.is_alphanumeric());
        if text.is_empty() {
            return None;
        }

        // chrono reads "November 2020" through "%B %d %Y" as year 20, so each
        // format is checked against the year window before the next is tried.
        DAY_FORMATS
            .iter()
            .find_map(|format| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .and_then(|d| self.plausible(d))
            })
            .or_else(|| {
                NaiveDate::parse_from_str(&format!("{} 1", text), "%B %Y %d")
                    .ok()
                    .and_then(|d| self.plausible(d))
            })
    }
}

/// Dashes, labels, ordinals, abbreviation dots, commas, and spacing.
fn clean(raw: &str) -> String {
    let text = raw.replace(['\u{2013}', '\u{2014}', '\u{2012}', '\u{2212}'], "-");
    let text = LABEL_PREFIX.replace(&text, "");
    let text = ORDINAL.replace_all(&text, "$1");
    let text = ABBREV_DOT.replace_all(&text, "$1");
    let text = SEPT.replace_all(&text, "Sep");
    text.replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_labelled_free_text() {
        let n = DateNormalizer::new();
        assert_eq!(n.normalize("Posted : March 3, 2021"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("Published on: 14 July 2019"), ymd(2019, 7, 14));
        assert_eq!(n.normalize("Date: Sept. 9th, 2022"), ymd(2022, 9, 9));
    }

    #[test]
    fn test_machine_readable() {
        let n = DateNormalizer::new();
        assert_eq!(n.normalize("2021-03-03T10:00:00Z"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("2021-03-03T23:30:00-05:00"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("2021-03-03"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("2021-03-03 08:15"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("Wed, 03 Mar 2021 10:00:00 +0000"), ymd(2021, 3, 3));
    }

    #[test]
    fn test_numeric_formats() {
        let n = DateNormalizer::new();
        assert_eq!(n.normalize("2021/03/04"), ymd(2021, 3, 4));
        assert_eq!(n.normalize("03/04/2021"), ymd(2021, 3, 4));
        assert_eq!(n.normalize("04.03.2021"), ymd(2021, 3, 4));
    }

    #[test]
    fn test_abbreviations_and_month_only() {
        let n = DateNormalizer::new();
        assert_eq!(n.normalize("Mar. 3 2021"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("Tuesday, Dec 7, 2021"), ymd(2021, 12, 7));
        assert_eq!(n.normalize("November 2020"), ymd(2020, 11, 1));
        assert_eq!(n.normalize("Posted: Sep 2019"), ymd(2019, 9, 1));
        assert_eq!(n.normalize("Jan 2021"), ymd(2021, 1, 1));
    }

    #[test]
    fn test_dateline_and_noise() {
        let n = DateNormalizer::new();
        assert_eq!(n.normalize("BALTIMORE, MD \u{2013} March 3, 2021"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("| March 3, 2021 |"), ymd(2021, 3, 3));
        assert_eq!(n.normalize("News \u{2014} 5 January 2023"), ymd(2023, 1, 5));
    }

    #[test]
    fn test_rejects_garbage_and_out_of_window() {
        let n = DateNormalizer::new();
        assert_eq!(n.normalize("garbage"), None);
        assert_eq!(n.normalize(""), None);
        assert_eq!(n.normalize("February 30, 2021"), None);
        assert_eq!(n.normalize("March 3, 1850"), None);
        assert_eq!(n.normalize("3000-01-01"), None);
    }

    #[test]
    fn test_year_window_is_configurable() {
        let n = DateNormalizer::new().with_year_range(2000, 2010);
        assert_eq!(n.normalize("2011-01-01"), None);
        assert_eq!(n.normalize("2010-12-31"), ymd(2010, 12, 31));
    }

    #[test]
    fn test_find_in_text_takes_first_plausible() {
        let n = DateNormalizer::new();
        let text = "Reviewed 1700-01-01\nCAMBRIDGE, MA, Jan. 12, 2022 -- Acme today announced\nUpdated 2023-01-01";
        assert_eq!(n.find_in_text(text), ymd(2022, 1, 12));
        assert_eq!(n.find_in_text("no dates here"), None);
    }
}
