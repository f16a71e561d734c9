//! Answer selection: question → bucket → bounded sentence excerpt.

use crate::buckets::{Bucket, BucketSet, KeywordTable};

/// Returned when neither the chosen bucket nor `summary` has any sentence.
pub const NOT_ENOUGH_INFORMATION: &str =
    "The available release notes do not contain enough information to answer this question.";

/// Default number of sentences joined into one answer.
pub const DEFAULT_ANSWER_SENTENCES: usize = 4;

// Kept separate from the sentence triggers on purpose: question wording
// ("advisories", "components", "different from") differs from note wording.
// The overlap between the two tables is listed as a review item in DESIGN.md.
const QUESTION_RULES: &[(Bucket, &[&str])] = &[
    (Bucket::Security, &["security", "cve", "vulnerab", "advisories"]),
    (Bucket::Pep, &["pep", "accepted wording", "changed status"]),
    (Bucket::Blocker, &["release blocker", "blocker"]),
    (Bucket::Regression, &["regression", "crash", "stability"]),
    (
        Bucket::Modules,
        &["module", "standard library", "libraries", "components"],
    ),
    (
        Bucket::Comparison,
        &["compare", "previous release", "different from"],
    ),
];

/// Triggers that route a question to a bucket, highest priority first.
pub static QUESTION_TRIGGERS: KeywordTable = KeywordTable::new(QUESTION_RULES);

/// Picks the answer text for a question from a factsheet's [`BucketSet`].
#[derive(Debug, Clone, Copy)]
pub struct AnswerSelector<'t> {
    table: &'t KeywordTable,
    max_sentences: usize,
}

impl Default for AnswerSelector<'static> {
    fn default() -> Self {
        Self::new(&QUESTION_TRIGGERS, DEFAULT_ANSWER_SENTENCES)
    }
}

impl<'t> AnswerSelector<'t> {
    pub fn new(table: &'t KeywordTable, max_sentences: usize) -> Self {
        Self {
            table,
            max_sentences,
        }
    }

    /// Bucket a question is answered from; `summary` when nothing matches.
    pub fn classify(&self, question: &str) -> Bucket {
        self.table
            .first_match(&question.to_lowercase())
            .unwrap_or(Bucket::Summary)
    }

    /// Build the answer for `question`.
    ///
    /// Uses the classified bucket, falling back to `summary` when it is empty
    /// and to [`NOT_ENOUGH_INFORMATION`] when that is empty too. At most
    /// `max_sentences` sentences are joined with single spaces.
    pub fn select(&self, question: &str, buckets: &BucketSet) -> String {
        let bucket = self.classify(question);

        let mut candidates = buckets.get(bucket);
        if candidates.is_empty() {
            candidates = buckets.get(Bucket::Summary);
        }
        if candidates.is_empty() {
            return NOT_ENOUGH_INFORMATION.to_string();
        }

        let take = candidates.len().min(self.max_sentences);
        candidates[..take].join(" ")
    }
}
