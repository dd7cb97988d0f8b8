//! Pragma pre-pass: scans raw source, before any tokenizing or parsing, for
//! a `(* @NESTEDCOMMENTS := 'Yes' *)` directive that switches the comment
//! pattern the grammar is built with.
//!
//! Only lines before the first non-empty, non-pragma line are examined —
//! once real program text starts, pragma scanning stops.

use once_cell::sync::Lazy;
use regex::Regex;

static PRAGMA_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*\(\*\s*@(\w+)\s*:=\s*'([^']*)'\s*\*\)\s*$").unwrap()
});

/// Pragma-derived configuration for the grammar builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PragmaConfig {
    pub nested_comments: bool,
}

/// Scan `source` for pragma lines preceding the first real line of code.
pub fn scan(source: &str) -> PragmaConfig {
    let mut config = PragmaConfig::default();
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match PRAGMA_LINE.captures(trimmed) {
            Some(caps) => {
                let name = caps.get(1).unwrap().as_str();
                let value = caps.get(2).unwrap().as_str();
                if name.eq_ignore_ascii_case("NESTEDCOMMENTS") {
                    config.nested_comments = value == "Yes";
                }
            }
            None => break,
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_nested_comments_pragma() {
        let src = "(* @NESTEDCOMMENTS := 'Yes' *)\nPROGRAM p\nEND_PROGRAM";
        assert_eq!(scan(src), PragmaConfig { nested_comments: true });
    }

    #[test]
    fn defaults_to_flat_comments_with_no_pragma() {
        let src = "PROGRAM p\nEND_PROGRAM";
        assert_eq!(scan(src), PragmaConfig { nested_comments: false });
    }

    #[test]
    fn stops_scanning_at_first_non_pragma_line() {
        let src = "PROGRAM p\n(* @NESTEDCOMMENTS := 'Yes' *)\nEND_PROGRAM";
        assert_eq!(scan(src), PragmaConfig { nested_comments: false });
    }

    #[test]
    fn blank_lines_before_a_pragma_are_skipped() {
        let src = "\n\n  (* @NESTEDCOMMENTS := 'Yes' *)  \nPROGRAM p\nEND_PROGRAM";
        assert_eq!(scan(src), PragmaConfig { nested_comments: true });
    }

    #[test]
    fn unrecognized_pragma_value_leaves_default() {
        let src = "(* @NESTEDCOMMENTS := 'No' *)\nPROGRAM p\nEND_PROGRAM";
        assert_eq!(scan(src), PragmaConfig { nested_comments: false });
    }

    #[test]
    fn pragma_value_match_is_case_sensitive() {
        let src = "(* @NESTEDCOMMENTS := 'YES' *)\nPROGRAM p\nEND_PROGRAM";
        assert_eq!(scan(src), PragmaConfig { nested_comments: false });
    }
}
