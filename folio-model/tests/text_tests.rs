use folio_model::{read_time, slugify, unique_slug, word_count, FALLBACK_SLUG};
use proptest::prelude::*;
use std::collections::HashSet;

// ── slugify ──────────────────────────────────────────────────────

#[test]
fn slugify_title_with_punctuation() {
    assert_eq!(slugify("My First Post!"), "my-first-post");
}

#[test]
fn slugify_collapses_separators() {
    assert_eq!(slugify("  Rust --  and __ WebAssembly  "), "rust-and-webassembly");
}

#[test]
fn slugify_drops_apostrophes_without_splitting() {
    assert_eq!(slugify("Don't Panic"), "dont-panic");
}

#[test]
fn slugify_keeps_digits() {
    assert_eq!(slugify("Top 10 Tips for 2024"), "top-10-tips-for-2024");
}

#[test]
fn slugify_punctuation_only_is_empty() {
    assert_eq!(slugify("?!*"), "");
}

// ── unique_slug ──────────────────────────────────────────────────

#[test]
fn unique_slug_free_base() {
    let taken = HashSet::new();
    assert_eq!(unique_slug("hello", &taken), "hello");
}

#[test]
fn unique_slug_appends_first_free_suffix() {
    let taken: HashSet<String> = ["hello", "hello-1"].iter().map(|s| s.to_string()).collect();
    assert_eq!(unique_slug("hello", &taken), "hello-2");
}

#[test]
fn unique_slug_empty_base_falls_back() {
    let taken = HashSet::new();
    assert_eq!(unique_slug("", &taken), FALLBACK_SLUG);
}

// ── read_time ────────────────────────────────────────────────────

#[test]
fn read_time_400_words_is_two_minutes() {
    let body = vec!["word"; 400].join(" ");
    assert_eq!(word_count(&body), 400);
    assert_eq!(read_time(&body), 2);
}

#[test]
fn read_time_rounds_up() {
    let body = vec!["word"; 201].join(" ");
    assert_eq!(read_time(&body), 2);
}

#[test]
fn read_time_minimum_is_one() {
    assert_eq!(read_time(""), 1);
    assert_eq!(read_time("short"), 1);
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn slug_charset_and_edges(text in "\\PC{0,80}") {
        let slug = slugify(&text);
        prop_assert!(
            slug.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        );
        prop_assert!(!slug.starts_with('-'));
        prop_assert!(!slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
    }

    #[test]
    fn slugify_is_idempotent(text in "[a-zA-Z0-9 _!?.-]{0,60}") {
        let once = slugify(&text);
        prop_assert_eq!(slugify(&once), once);
    }

    #[test]
    fn unique_slug_is_never_taken(base in "[a-z]{1,8}", n in 0usize..5) {
        let mut taken = HashSet::new();
        taken.insert(base.clone());
        for i in 1..=n {
            taken.insert(format!("{base}-{i}"));
        }
        let slug = unique_slug(&base, &taken);
        prop_assert!(!taken.contains(&slug));
        prop_assert_eq!(slug, format!("{base}-{}", n + 1));
    }
}
