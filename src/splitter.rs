// 💬 Name/Message Splitter - Positional grammars for chat export lines
//
// Each raw line is matched against an ordered rule table; first match wins:
//   1. "[21:05, 10/3/2024] Juan Perez: +1"       → Timestamped
//      "10/3/2024, 21:05 - Juan Perez: +1"        → Timestamped (android export)
//   2. "Juan Perez: voy"                          → Simple
//   3. "1. Carlos" / "2) Ana María"               → Numbered (implicit confirmation)
//   4. "*LUNES 20 HS*"                            → RejectedHeader
// Anything else is NoSplit.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::normalizer::strip_invisible;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Which grammar produced a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grammar {
    Timestamped,
    Simple,
    Numbered,
}

/// One line split into sender + body. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Original line, byte for byte (invisible markers included)
    pub raw_text: String,

    /// Sender token as written; None when the grammar yields no name
    pub sender: Option<String>,

    /// Message body (empty for numbered roster lines)
    pub body: String,

    pub grammar: Grammar,

    /// Tag of the rule that fired
    pub rule: &'static str,
}

/// Result of splitting one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    /// No grammar matched; carries the line with invisible markers removed
    NoSplit { cleaned: String },
    Timestamped(ParsedLine),
    Simple(ParsedLine),
    Numbered(ParsedLine),
    /// Session header such as "*LUNES 20 HS*"
    RejectedHeader { rule: &'static str },
}

impl SplitOutcome {
    /// The parsed line, if any grammar produced one
    pub fn parsed(&self) -> Option<&ParsedLine> {
        match self {
            SplitOutcome::Timestamped(p) | SplitOutcome::Simple(p) | SplitOutcome::Numbered(p) => {
                Some(p)
            }
            SplitOutcome::NoSplit { .. } | SplitOutcome::RejectedHeader { .. } => None,
        }
    }

    /// Tag of the rule that fired (None for NoSplit)
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            SplitOutcome::RejectedHeader { rule } => Some(*rule),
            other => other.parsed().map(|p| p.rule),
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, SplitOutcome::RejectedHeader { .. })
    }
}

// ============================================================================
// RULE TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Split(Grammar),
    Header,
}

struct SplitRule {
    id: &'static str,
    kind: RuleKind,
    regex: Regex,
}

impl SplitRule {
    fn new(id: &'static str, kind: RuleKind, pattern: &str) -> Self {
        Self {
            id,
            kind,
            regex: Regex::new(pattern).expect("invalid split pattern"),
        }
    }
}

/// Ordered grammars. Group 1 = sender, group 2 = body (when present).
static SPLIT_RULES: LazyLock<Vec<SplitRule>> = LazyLock::new(|| {
    vec![
        // [H:MM(:SS)( am)(, D/M/YYYY)] Name: body   (date may also lead)
        SplitRule::new(
            "bracket_timestamp",
            RuleKind::Split(Grammar::Timestamped),
            r"(?i)^\[(?:\d{1,2}/\d{1,2}/\d{2,4},?\s*)?\d{1,2}:\d{2}(?::\d{2})?(?:\s*[ap]\.?\s*m\.?)?(?:,\s*\d{1,2}/\d{1,2}/\d{2,4})?\]\s*([^:]+?)\s*:\s*(.*?)\s*$",
        ),
        // D/M/YYYY, H:MM - Name: body
        SplitRule::new(
            "android_export",
            RuleKind::Split(Grammar::Timestamped),
            r"(?i)^\d{1,2}/\d{1,2}/\d{2,4},?\s+\d{1,2}:\d{2}(?::\d{2})?(?:\s*[ap]\.?\s*m\.?)?\s+-\s+([^:]+?)\s*:\s*(.*?)\s*$",
        ),
        // Name: body (letters and spaces only before the colon)
        SplitRule::new(
            "simple",
            RuleKind::Split(Grammar::Simple),
            r"^([\p{L}\p{M}\s]+?)\s*:\s*(.+?)\s*$",
        ),
        // N. Name / N) Name
        SplitRule::new(
            "numbered",
            RuleKind::Split(Grammar::Numbered),
            r"^\d{1,3}\s*[.)]\s*([\p{L}\p{M}\d'’\- ]*[\p{L}\p{M}\d])\s*$",
        ),
        // *LUNES 20 HS*, MIÉRCOLES 21:30 HS, MONDAY 8 PM
        SplitRule::new(
            "session_header",
            RuleKind::Header,
            r"^[\s*_~]*[\p{Lu}\s]+\d{1,2}(?:[:.]\d{2})?\s*(?:HS|HRS|PM|AM)[\s*_~.!]*$",
        ),
    ]
});

// ============================================================================
// SPLITTER
// ============================================================================

/// Split one raw line into sender + body
///
/// Invisible code points are stripped before matching; `raw_text` keeps the original.
pub fn split_line(line: &str) -> SplitOutcome {
    let cleaned = strip_invisible(line);
    let candidate = cleaned.trim();

    for rule in SPLIT_RULES.iter() {
        let Some(caps) = rule.regex.captures(candidate) else {
            continue;
        };

        let grammar = match rule.kind {
            RuleKind::Header => return SplitOutcome::RejectedHeader { rule: rule.id },
            RuleKind::Split(grammar) => grammar,
        };

        let sender = caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        let body = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let parsed = ParsedLine {
            raw_text: line.to_string(),
            sender,
            body,
            grammar,
            rule: rule.id,
        };

        return match grammar {
            Grammar::Timestamped => SplitOutcome::Timestamped(parsed),
            Grammar::Simple => SplitOutcome::Simple(parsed),
            Grammar::Numbered => SplitOutcome::Numbered(parsed),
        };
    }

    SplitOutcome::NoSplit {
        cleaned: candidate.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(outcome: &SplitOutcome) -> &ParsedLine {
        outcome.parsed().expect("line should split")
    }

    #[test]
    fn test_bracket_timestamp_with_date() {
        let outcome = split_line("[21:05, 10/3/2024] Juan Perez: +1");

        assert!(matches!(outcome, SplitOutcome::Timestamped(_)));
        let p = parsed(&outcome);
        assert_eq!(p.sender.as_deref(), Some("Juan Perez"));
        assert_eq!(p.body, "+1");
        assert_eq!(p.rule, "bracket_timestamp");
    }

    #[test]
    fn test_bracket_timestamp_time_only() {
        let outcome = split_line("[9:41] Ana: me anoto");
        let p = parsed(&outcome);

        assert_eq!(p.grammar, Grammar::Timestamped);
        assert_eq!(p.sender.as_deref(), Some("Ana"));
        assert_eq!(p.body, "me anoto");
    }

    #[test]
    fn test_bracket_timestamp_date_first_with_seconds() {
        let outcome = split_line("[10/3/24, 21:05:33] ~ Pedro: voy");
        let p = parsed(&outcome);

        assert_eq!(p.rule, "bracket_timestamp");
        assert_eq!(p.sender.as_deref(), Some("~ Pedro"));
        assert_eq!(p.body, "voy");
    }

    #[test]
    fn test_android_export() {
        let outcome = split_line("10/3/2024, 21:05 - Juan Perez: confirmo");
        let p = parsed(&outcome);

        assert_eq!(p.rule, "android_export");
        assert_eq!(p.grammar, Grammar::Timestamped);
        assert_eq!(p.sender.as_deref(), Some("Juan Perez"));
        assert_eq!(p.body, "confirmo");
    }

    #[test]
    fn test_simple_name_colon_body() {
        let outcome = split_line("Nuevo Jugador: confirmo");

        assert!(matches!(outcome, SplitOutcome::Simple(_)));
        let p = parsed(&outcome);
        assert_eq!(p.sender.as_deref(), Some("Nuevo Jugador"));
        assert_eq!(p.body, "confirmo");
    }

    #[test]
    fn test_simple_accepts_accents() {
        let outcome = split_line("María José: ahí estoy");
        let p = parsed(&outcome);

        assert_eq!(p.sender.as_deref(), Some("María José"));
        assert_eq!(p.body, "ahí estoy");
    }

    #[test]
    fn test_numbered_dot_and_paren() {
        let outcome = split_line("1. Carlos");
        assert!(matches!(outcome, SplitOutcome::Numbered(_)));
        let p = parsed(&outcome);
        assert_eq!(p.sender.as_deref(), Some("Carlos"));
        assert_eq!(p.body, "");

        let outcome = split_line("12) Ana-María O'Neill");
        let p = parsed(&outcome);
        assert_eq!(p.rule, "numbered");
        assert_eq!(p.sender.as_deref(), Some("Ana-María O'Neill"));
    }

    #[test]
    fn test_header_is_rejected() {
        let outcome = split_line("*LUNES 20 HS*");
        assert_eq!(outcome, SplitOutcome::RejectedHeader { rule: "session_header" });
        assert!(outcome.is_header());

        assert!(split_line("MIÉRCOLES 21:30 HS").is_header());
        assert!(split_line("MONDAY 8 PM").is_header());
    }

    #[test]
    fn test_lowercase_header_like_line_is_not_rejected() {
        let outcome = split_line("el lunes 20 hs juego");
        assert!(!outcome.is_header());
        assert!(matches!(outcome, SplitOutcome::NoSplit { .. }));
    }

    #[test]
    fn test_invisible_characters_are_stripped_before_matching() {
        let raw = "\u{200E}[21:05, 10/3/2024] Juan\u{2060} Perez: +1";
        let outcome = split_line(raw);
        let p = parsed(&outcome);

        assert_eq!(p.sender.as_deref(), Some("Juan Perez"));
        assert_eq!(p.raw_text, raw, "raw text is kept verbatim");
    }

    #[test]
    fn test_no_split_keeps_cleaned_text() {
        let outcome = split_line("  Flavio pago 7000\u{200B} ");
        assert_eq!(
            outcome,
            SplitOutcome::NoSplit {
                cleaned: "Flavio pago 7000".to_string()
            }
        );
        assert_eq!(outcome.rule(), None);
    }

    #[test]
    fn test_empty_body_does_not_split_as_simple() {
        assert!(matches!(split_line("Juan:"), SplitOutcome::NoSplit { .. }));
    }

    #[test]
    fn test_bracket_timestamp_with_empty_body() {
        let outcome = split_line("[21:05] Juan:");
        let p = parsed(&outcome);
        assert_eq!(p.sender.as_deref(), Some("Juan"));
        assert_eq!(p.body, "");
    }
}
