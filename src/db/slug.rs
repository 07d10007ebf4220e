use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9_\s-]").unwrap();
    static ref SEPARATORS: Regex = Regex::new(r"[-\s]+").unwrap();
}

/// URL slug for titles and usernames: lowercase ASCII words joined by `-`.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    SEPARATORS
        .replace_all(cleaned.trim(), "-")
        .into_owned()
}
