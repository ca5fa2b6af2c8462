//! Small formatting helpers for command output.

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let cut: String = s.chars().take(keep).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Stanford ADRC news", 10), "Stanfor...");
        assert_eq!(truncate("Stanford ADRC news", 10).chars().count(), 10);
        assert_eq!(truncate("Résumé écrit", 8), "Résum...");
    }
}
