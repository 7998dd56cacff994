//! Shared helpers and constants.

use chrono::Utc;

pub const APP_NAME: &str = "rostra";

pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Derives a URL slug from a display name: lowercased, alphanumerics kept,
/// everything else collapsed into single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("General Discussion"), "general-discussion");
        assert_eq!(slugify("  Rust -- tips & tricks  "), "rust-tips-tricks");
        assert_eq!(slugify("Już jutro"), "już-jutro");
    }

    #[test]
    fn slugify_drops_leading_and_trailing_junk() {
        assert_eq!(slugify("---hello---"), "hello");
        assert_eq!(slugify(""), "");
    }
}
