//! String conversion utilities.

/// Converts an empty `String` to `None`, otherwise returns `Some(value)`.
///
/// # Examples
///
/// ```
/// use heroes_domain::common::some_if_not_empty;
///
/// assert_eq!(some_if_not_empty("hello".to_string()), Some("hello".to_string()));
/// assert_eq!(some_if_not_empty(String::new()), None);
/// ```
pub fn some_if_not_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Lowercase, hyphen-separated identifier derived from a display name.
///
/// Runs of anything other than ASCII letters and digits collapse into a
/// single hyphen; leading and trailing hyphens are dropped.
///
/// # Examples
///
/// ```
/// use heroes_domain::common::slugify;
///
/// assert_eq!(slugify("Smart Hero"), "smart-hero");
/// assert_eq!(slugify("  Focus (Points) "), "focus-points");
/// ```
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_hyphen = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}
