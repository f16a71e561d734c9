//! Emphasis-stripping passes for factsheet notes.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Only inline emphasis is touched: headings, bullets and line breaks
//! pass through unchanged.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Run the full cleanup pipeline on raw note text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = text.to_string();

    result = strip_strong_emphasis(&result);
    result = strip_emphasis(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Strong emphasis
// ---------------------------------------------------------------------------

/// Unwrap `**bold**` and `__bold__`, keeping the enclosed text.
fn strip_strong_emphasis(text: &str) -> String {
    static STRONG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\*\*(.*?)\*\*|__(.*?)__").expect("valid regex")
    });

    STRONG_RE.replace_all(text, inner_text).to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Emphasis
// ---------------------------------------------------------------------------

/// Unwrap `*italic*` and `_italic_`, keeping the enclosed text.
///
/// Runs after [`strip_strong_emphasis`] so doubled markers are already gone.
fn strip_emphasis(text: &str) -> String {
    static EM_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\*(.*?)\*|_(.*?)_").expect("valid regex")
    });

    EM_RE.replace_all(text, inner_text).to_string()
}

/// Whichever alternative matched, return its captured content.
fn inner_text(caps: &Captures) -> String {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
