//! Body text cleanup.

use regex::{Regex, RegexBuilder};

use crate::extract::ExtractionError;

/// Lines dropped from every body unless an adapter overrides its list.
pub const COMMON_BOILERPLATE: &[&str] = &[
    r"©",
    r"all rights reserved",
    r"\d{3}[-.\s]\d{3}[-.\s]\d{4}",
    r"^\s*«\s*back",
    r"^\s*contact\b",
];

/// Drops boilerplate lines from extracted body text.
#[derive(Debug, Clone, Default)]
pub struct ContentCleaner {
    boilerplate: Vec<Regex>,
    truncate_after: Vec<Regex>,
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ExtractionError> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|source| ExtractionError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
        })
        .collect()
}

impl ContentCleaner {
    /// Patterns are case-insensitive regexes tested against each line.
    pub fn new(boilerplate: &[String], truncate_after: &[String]) -> Result<Self, ExtractionError> {
        Ok(Self {
            boilerplate: compile_all(boilerplate)?,
            truncate_after: compile_all(truncate_after)?,
        })
    }

    /// Remove boilerplate lines, stop at the first truncation marker, and
    /// collapse runs of blank lines into one. Patterns see each line trimmed;
    /// kept lines are copied unchanged.
    pub fn clean(&self, raw: &str) -> String {
        let mut out: Vec<&str> = Vec::new();
        for line in raw.split('\n') {
            let trimmed = line.trim();
            if self.truncate_after.iter().any(|re| re.is_match(trimmed)) {
                break;
            }
            if trimmed.is_empty() {
                if out.last().is_some_and(|l| !l.is_empty()) {
                    out.push("");
                }
                continue;
            }
            if self.boilerplate.iter().any(|re| re.is_match(trimmed)) {
                continue;
            }
            out.push(line);
        }
        while out.last().is_some_and(|l| l.is_empty()) {
            out.pop();
        }
        out.join("\n")
    }

    /// At most `max_chars` characters of `body`, cut on a char boundary.
    pub fn summarize(body: &str, max_chars: usize) -> String {
        match body.char_indices().nth(max_chars) {
            Some((idx, _)) => body[..idx].trim_end().to_string(),
            None => body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common() -> ContentCleaner {
        let patterns: Vec<String> = COMMON_BOILERPLATE.iter().map(|s| s.to_string()).collect();
        ContentCleaner::new(&patterns, &["forward-looking statements".to_string()]).unwrap()
    }

    #[test]
    fn test_boilerplate_line_removed_others_identical() {
        let raw = "First paragraph, with “quotes” and ünïcode.\n\
                   © 2023 Acme Corp. All rights reserved.\n\
                   Second paragraph stays.";
        let cleaned = common().clean(raw);
        assert_eq!(
            cleaned,
            "First paragraph, with “quotes” and ünïcode.\nSecond paragraph stays."
        );
    }

    #[test]
    fn test_phone_and_contact_lines() {
        let raw = "Body.\nMedia: 555-123-4567\nContact: press@acme.test\nContacting regulators was next.";
        assert_eq!(common().clean(raw), "Body.\nContacting regulators was next.");
    }

    #[test]
    fn test_kept_lines_are_untouched() {
        let cleaner = ContentCleaner::new(&["^© acme$".to_string()], &[]).unwrap();
        let raw = "  Indented lead paragraph.  \n© Acme\nSecond\tparagraph.\r\nThird.";
        assert_eq!(
            cleaner.clean(raw),
            "  Indented lead paragraph.  \nSecond\tparagraph.\r\nThird."
        );
    }

    #[test]
    fn test_blank_runs_collapse() {
        let raw = "\n\nOne\n\n\n  \nTwo\n\n";
        assert_eq!(common().clean(raw), "One\n\nTwo");
    }

    #[test]
    fn test_truncate_marker_cuts_rest() {
        let raw = "Results were positive.\nForward-Looking Statements\nThis release contains...";
        assert_eq!(common().clean(raw), "Results were positive.");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ContentCleaner::new(&["(".to_string()], &[]).is_err());
    }

    #[test]
    fn test_summarize_on_char_boundary() {
        assert_eq!(ContentCleaner::summarize("héllo world", 5), "héllo");
        assert_eq!(ContentCleaner::summarize("short", 50), "short");
        assert_eq!(ContentCleaner::summarize("ab cd", 3), "ab");
    }
}
