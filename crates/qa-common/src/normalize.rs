/// Text normalization used for every comparison the matcher makes.
///
/// Lowercases, applies canonical decomposition (NFD) and drops every combining
/// mark (general categories Mn, Mc and Me), so "Ação" and "acao" compare equal.
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize text for comparison: lowercase, diacritics removed.
///
/// # Examples
///
/// ```
/// use qa_common::normalize::normalize;
///
/// assert_eq!(normalize("ÁGUA"), "agua");
/// assert_eq!(normalize("Endereço de entrega"), "endereco de entrega");
/// ```
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Absent input stays absent.
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize)
}
