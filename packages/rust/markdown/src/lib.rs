//! Text preparation for factsheet notes.
//!
//! Notes arrive as lightly formatted Markdown. This crate removes inline
//! emphasis markers and segments the result into sentences, which the core
//! pipeline then classifies into topic buckets.

mod cleanup;
mod sentences;

use tracing::trace;

pub use sentences::{Sentences, split_sentences};

/// Remove paired emphasis markers (`**`, `__`, `*`, `_`), keeping their content.
///
/// Pairing is non-greedy and never spans a line break. Headings, list
/// bullets and newlines are left untouched, as are unpaired markers.
pub fn normalize(text: &str) -> String {
    cleanup::run_pipeline(text)
}

/// Normalize `notes` and split them into sentences.
pub fn note_sentences(notes: &str) -> Sentences {
    let normalized = normalize(notes);
    trace!(
        raw_len = notes.len(),
        normalized_len = normalized.len(),
        "normalized notes"
    );
    split_sentences(&normalized)
}
