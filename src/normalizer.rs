// 🧹 Name Normalizer - Canonical display names from chat sender tokens
//
// "~ Juan  Pérez 🙂" → "Juan Pérez"
// "+54 9 11 5555-1234" → "" (no identifiable name)

use unicode_normalization::UnicodeNormalization;

/// Zero-width / bidi / soft-hyphen code points inserted by chat export tooling
pub fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
    )
}

/// Remove invisible code points, leaving everything else untouched
pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !is_invisible(*c)).collect()
}

/// Keep letters (any script, accents included) and whitespace, collapse runs, trim.
///
/// Idempotent: `normalize_name(&normalize_name(x)) == normalize_name(x)`.
/// An empty result means the token carries no identifiable name.
pub fn normalize_name(name: &str) -> String {
    // NFKC first so "Jose\u{301}" keeps its accent as one letter
    let composed: String = name.nfkc().collect();

    let letters: String = composed
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();

    letters.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "juan PEREZ" → "Juan Perez". Applied only to names of newly created members.
pub fn display_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut out: String = first.to_uppercase().collect();
                    out.extend(chars.flat_map(|c| c.to_lowercase()));
                    out
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
