//! Unicode-aware text cleanup shared by every pipeline stage.

use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

/// Strips diacritics and surrounding whitespace.
///
/// The value is NFD-decomposed so accented letters split into a base
/// character plus combining marks, and the marks are dropped. Absent, empty
/// and whitespace-only input all yield `None`, which keeps the function
/// idempotent.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let value = value?;
    if value.is_empty() {
        return None;
    }

    let stripped: String = value.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let trimmed = stripped.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Canonical form of a column header: accents stripped, trimmed, lower-cased,
/// spaces replaced by underscores.
///
/// `"Cod Cliente"`, `"cod_cliente"` and `"CÓD CLIENTE"` all map to
/// `"cod_cliente"`.
pub fn normalize_header(raw: &str) -> String {
    clean_text(Some(raw))
        .unwrap_or_default()
        .to_lowercase()
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_accents_and_whitespace() {
        assert_eq!(clean_text(Some("  José Núñez ")), Some("Jose Nunez".to_owned()));
        assert_eq!(clean_text(Some("Begoña")), Some("Begona".to_owned()));
        assert_eq!(clean_text(Some("Ç")), Some("C".to_owned()));
    }

    #[test]
    fn test_clean_text_absent_and_blank() {
        assert_eq!(clean_text(None), None);
        assert_eq!(clean_text(Some("")), None);
        assert_eq!(clean_text(Some("   \t")), None);
    }

    #[test]
    fn test_clean_text_keeps_leading_zeros() {
        assert_eq!(clean_text(Some(" 000123 ")), Some("000123".to_owned()));
    }

    #[test]
    fn test_clean_text_idempotent() {
        let samples = [
            "  Ángel  ",
            "plain",
            "",
            "   ",
            "a\u{0301}\u{0301}",
            "Müller-Lüdenscheidt",
            "\u{00A0}nbsp\u{00A0}",
        ];
        for s in samples {
            let once = clean_text(Some(s));
            let twice = clean_text(once.as_deref());
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_normalize_header_variants() {
        for raw in ["Cod Cliente", "cod_cliente", "CÓD CLIENTE", "  Cód Cliente "] {
            assert_eq!(normalize_header(raw), "cod_cliente", "header {raw:?}");
        }
        assert_eq!(normalize_header("Teléfono"), "telefono");
        assert_eq!(normalize_header("Fecha Exp"), "fecha_exp");
    }
}
