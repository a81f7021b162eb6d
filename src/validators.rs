//! Field normalizers and validation predicates.
//!
//! All functions here are pure. The identity document check is the Spanish
//! DNI scheme: eight digits followed by a control letter taken from a fixed
//! 23-letter alphabet indexed by the number modulo 23.

use regex::Regex;
use std::sync::LazyLock;

/// Control letters indexed by `number % 23`.
pub const CHECK_LETTERS: &str = "TRWAGMYFPDXBNJZSQVHLCKE";

/// Minimum number of digits for a phone number to be considered valid.
pub const MIN_PHONE_DIGITS: usize = 9;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").unwrap_or_else(|e| panic!("invalid email regex: {e}"))
});

static DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{8})([A-Z])$").unwrap_or_else(|e| panic!("invalid document regex: {e}"))
});

pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && EMAIL_RE.is_match(email)
}

pub fn validate_phone(phone: &str) -> bool {
    !phone.is_empty()
        && phone.chars().all(|c| c.is_ascii_digit())
        && phone.chars().count() >= MIN_PHONE_DIGITS
}

/// Checks the mod-23 control letter of an identity document.
///
/// The value is upper-cased first; anything that is not exactly eight digits
/// plus one letter is invalid.
pub fn validate_identity_document(document: &str) -> bool {
    let upper = document.to_uppercase();
    let Some(caps) = DOCUMENT_RE.captures(&upper) else {
        return false;
    };
    let (Some(number), Some(letter)) = (caps.get(1), caps.get(2)) else {
        return false;
    };
    let Ok(number) = number.as_str().parse::<u32>() else {
        return false;
    };

    letter.as_str().chars().next() == expected_letter(number)
}

/// Control letter for a document number.
pub fn expected_letter(number: u32) -> Option<char> {
    CHECK_LETTERS
        .as_bytes()
        .get((number % 23) as usize)
        .copied()
        .map(char::from)
}

/// Removes whitespace and hyphens and upper-cases the document.
pub fn normalize_identity_document(document: &str) -> Option<String> {
    let normalized: String = document
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// Keeps only the digits of a phone number.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}
