//! Slug derivation from article titles.
//!
//! The slug doubles as the article's primary key and its URL path
//! segment, so it must be stable: it is computed once at submission
//! and never regenerated on later writes.

/// Derive a URL-safe slug from a title.
///
/// Lower-cases the input, collapses every maximal run of characters
/// outside `[a-z0-9]` into a single hyphen, and trims leading and
/// trailing hyphens. Pure and deterministic; no collision check.
/// Two titles that normalize identically map to the same slug, and the
/// later submission overwrites the earlier pending record.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

// -- Tests --------------------------------------------------------------------
