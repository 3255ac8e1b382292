// 🏷️ Intent Classifier - Confirmation / payment detection as a rule table
//
// Rules are data: each pattern carries a tag so callers (and tests) can tell
// which rule fired. Name-embedded payment rules run first and short-circuit:
//   "Flavio pago 7000"   → payment for Flavio   (payment_named_subject)
//   "pago de Maria"      → payment for Maria    (payment_named_object)
//   "pagué"              → payment for sender   (payment_generic)
//   "+1" / "me anoto"    → confirmation         (confirm_plus_one / confirm_token)
//
// Embedded names are case-sensitive (every word capitalized); verbs are not.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::normalizer::normalize_name;
use crate::resolver::MIN_NAME_CHARS;

/// Payment done, attributable to the sender on its own. Excludes "pagar" and "pago".
const GENERIC_PAY_VERB: &str = r"(?:listo\s+el\s+pago|pag(?:u[eé]|ado|ó)|deposit(?:ado|[óé])|transfer(?:encia|[ií])|enviado)";

/// After a name, the unaccented present forms also count ("Flavio pago 7000")
const PAY_VERB: &str = r"(?:listo\s+el\s+pago|pag(?:u[eé]|ado|[oó])|deposit(?:ado|[oóeé])|transfer(?:encia|[ií])|enviado)";

/// Nouns that introduce "<noun> de <Name>"
const PAY_NOUN: &str = r"(?:pag[oó]|transferencia|dep[oó]sito|env[ií]o)";

/// 1-3 capitalized words
const NAME: &str = r"\p{Lu}[\p{L}\p{M}]*(?:\s+\p{Lu}[\p{L}\p{M}]*){0,2}";

/// Adverbs allowed between a name and its verb ("Flavio ya pagó")
const NAME_ADVERB: &str = r"(?:ya|hoy|ayer|reci[eé]n|tambi[eé]n)";

/// Optional trailing amount ("7000", "$ 7.000", "7,500"); detected, never stored
const AMOUNT: &str = r"(?:\s*\$?\s*\d[\d.,]*)?";

/// Tokens that can sit where a name would but never are one
const FILLER_WORDS: &[&str] = &[
    "yo", "ya", "me", "te", "se", "le", "lo", "la", "el", "los", "las", "mi", "su", "ok", "listo",
    "hoy", "ayer", "recien", "recién", "tambien", "también", "todo", "todos", "bien", "ahi", "ahí",
    "ahora", "ella", "nosotros", "cancha", "partido", "cuota", "mes", "semana", "que", "hice",
    "hizo", "mande", "mandé", "envie", "envié", "voy", "confirmo", "presente", "asisto", "y",
    "e", "o", "u", "mañana", "manana", "despues", "después", "bueno", "cuanto", "cuánto",
    "cuando", "cuándo", "quien", "quién", "falta", "nadie", "alguien",
];

// ============================================================================
// RULE TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntentKind {
    Confirmation,
    /// Payment whose beneficiary is named inside the message
    NamedPayment,
    /// Payment attributed to the line's sender
    Payment,
}

struct IntentRule {
    id: &'static str,
    kind: IntentKind,
    regex: Regex,
}

impl IntentRule {
    fn new(id: &'static str, kind: IntentKind, pattern: &str) -> Self {
        Self {
            id,
            kind,
            regex: Regex::new(pattern).expect("invalid intent pattern"),
        }
    }
}

/// Evaluation order matters: named payments first.
static INTENT_RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        // <Name> <verb>[ <amount>]
        IntentRule::new(
            "payment_named_subject",
            IntentKind::NamedPayment,
            &format!(
                r"^(?P<name>{NAME})(?:\s+(?i:{NAME_ADVERB}))?\s+(?i:{PAY_VERB})\b{AMOUNT}\s*[.!]*\s*$"
            ),
        ),
        // <noun> de <Name>[ <amount>]
        IntentRule::new(
            "payment_named_object",
            IntentKind::NamedPayment,
            &format!(r"\b(?i:{PAY_NOUN}\s+de)\s+(?P<name>{NAME}){AMOUNT}\s*[.!]*\s*$"),
        ),
        IntentRule::new(
            "confirm_plus_one",
            IntentKind::Confirmation,
            r"(?:^|\W)\+1\b",
        ),
        IntentRule::new(
            "confirm_token",
            IntentKind::Confirmation,
            r"(?i)\b(?:voy|me\s+anoto|confirmo|presente|asisto|cuenta\s+conmigo|ah[ií]\s+estoy)\b",
        ),
        IntentRule::new(
            "payment_generic",
            IntentKind::Payment,
            &format!(r"(?i)\b{GENERIC_PAY_VERB}\b"),
        ),
    ]
});

static PAY_VERB_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(?:{PAY_VERB}|{PAY_NOUN})$")).expect("invalid verb pattern")
});

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Intent {
    pub is_confirmation: bool,
    pub is_payment: bool,

    /// Beneficiary named inside the message; overrides the line's sender
    pub payment_sender: Option<String>,

    /// Tag of the confirmation rule that fired
    pub confirmation_rule: Option<&'static str>,

    /// Tag of the payment rule that fired
    pub payment_rule: Option<&'static str>,
}

impl Intent {
    /// Nothing actionable in the body
    pub fn is_empty(&self) -> bool {
        !self.is_confirmation && !self.is_payment
    }

    /// Implicit confirmation for numbered roster lines
    pub fn implicit_confirmation() -> Self {
        Intent {
            is_confirmation: true,
            confirmation_rule: Some("numbered_implicit"),
            ..Intent::default()
        }
    }
}

/// A payment whose beneficiary is written in the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPayment {
    pub rule: &'static str,
    pub name: String,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Try the name-embedded payment rules only
pub fn match_named_payment(text: &str) -> Option<NamedPayment> {
    INTENT_RULES
        .iter()
        .filter(|rule| rule.kind == IntentKind::NamedPayment)
        .find_map(|rule| {
            let caps = rule.regex.captures(text)?;
            let name = strip_filler_words(caps.name("name")?.as_str())?;
            Some(NamedPayment { rule: rule.id, name })
        })
}

/// Classify a message body
///
/// A name-embedded payment short-circuits: the confirmation check is skipped.
pub fn classify(body: &str) -> Intent {
    if let Some(named) = match_named_payment(body) {
        return Intent {
            is_confirmation: false,
            is_payment: true,
            payment_sender: Some(named.name),
            confirmation_rule: None,
            payment_rule: Some(named.rule),
        };
    }

    let first_of = |kind: IntentKind| {
        INTENT_RULES
            .iter()
            .filter(|rule| rule.kind == kind)
            .find(|rule| rule.regex.is_match(body))
            .map(|rule| rule.id)
    };

    let confirmation_rule = first_of(IntentKind::Confirmation);
    let payment_rule = first_of(IntentKind::Payment);

    Intent {
        is_confirmation: confirmation_rule.is_some(),
        is_payment: payment_rule.is_some(),
        payment_sender: None,
        confirmation_rule,
        payment_rule,
    }
}

/// Drop pronouns/adverbs/verbs captured where a name was expected.
/// Returns None when what remains is too short to identify anyone.
fn strip_filler_words(candidate: &str) -> Option<String> {
    let kept: Vec<&str> = candidate
        .split_whitespace()
        .filter(|word| {
            let lower = word.to_lowercase();
            !FILLER_WORDS.contains(&lower.as_str()) && !PAY_VERB_EXACT.is_match(word)
        })
        .collect();

    let name = kept.join(" ");
    if normalize_name(&name).chars().count() < MIN_NAME_CHARS {
        return None;
    }
    Some(name)
}
