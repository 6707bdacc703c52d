//! Small helpers shared across crates.

/// Maximum length kept from a client-supplied filename.
const MAX_FILENAME_LEN: usize = 200;

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory components are dropped, control characters removed and the
/// result is never empty, so it can be embedded in blob names and local
/// scratch paths.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILENAME_LEN)
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}
