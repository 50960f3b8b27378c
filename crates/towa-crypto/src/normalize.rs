//! Canonical forms of human-entered identity fields and answers.
//!
//! Sender and reader must derive byte-identical strings, otherwise every
//! letter sealed under the old form becomes unreadable. These functions are
//! frozen: changing them requires migrating existing envelopes.
//!
//! The whitespace set is the ECMAScript `\s` class rather than Rust's
//! `char::is_whitespace` (which adds U+0085 and drops U+FEFF), so envelopes
//! sealed by browser clients normalize the same way here.

/// Whether `c` belongs to the ECMAScript `\s` whitespace class.
pub fn is_separator(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000A}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000D}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// Lowercase and strip every whitespace character.
fn fold(value: &str) -> String {
    value
        .trim_matches(is_separator)
        .to_lowercase()
        .chars()
        .filter(|c| !is_separator(*c))
        .collect()
}

/// Normalize a secret answer.
///
/// ```
/// use towa_crypto::normalize::normalize_answer;
///
/// assert_eq!(normalize_answer("  Blue "), "blue");
/// assert_eq!(normalize_answer("Sky Blue"), "skyblue");
/// ```
pub fn normalize_answer(answer: &str) -> String {
    fold(answer)
}

/// Normalize a birth date by keeping only the ASCII digits.
pub fn normalize_dob(dob: &str) -> String {
    dob.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize a recipient identity: folded name followed by date digits.
///
/// ```
/// use towa_crypto::normalize::normalize_identity;
///
/// assert_eq!(
///     normalize_identity("Yamada Taro", "1990-01-02"),
///     normalize_identity("yamadataro", "19900102"),
/// );
/// ```
pub fn normalize_identity(name: &str, dob: &str) -> String {
    let mut identity = fold(name);
    identity.push_str(&normalize_dob(dob));
    identity
}
