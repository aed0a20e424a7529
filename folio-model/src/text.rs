//! Derived-field helpers: slugs and reading time.

use std::collections::HashSet;

/// Average reading speed used for [`read_time`].
pub const WORDS_PER_MINUTE: usize = 200;

/// Slug used when the source text has no alphanumeric characters.
pub const FALLBACK_SLUG: &str = "untitled";

/// Turns free text into a URL slug.
///
/// Lowercases, keeps ASCII letters and digits, turns whitespace, `-` and `_`
/// runs into a single hyphen and drops everything else. The result never
/// starts or ends with a hyphen.
///
/// ```
/// assert_eq!(folio_model::slugify("My First Post!"), "my-first-post");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut separator = false;
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if separator && !slug.is_empty() {
                slug.push('-');
            }
            separator = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            separator = true;
        }
    }
    slug
}

/// Returns `base` if it is free, otherwise `base-1`, `base-2`, ... the first
/// one not in `taken`.
#[must_use]
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    let base = if base.is_empty() { FALLBACK_SLUG } else { base };
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n: u64 = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in minutes: `max(1, ceil(words / 200))`.
#[must_use]
pub fn read_time(content: &str) -> u32 {
    let minutes = word_count(content).div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
