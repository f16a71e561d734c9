//! Topic buckets: keyword classification of note sentences.
//!
//! A [`KeywordTable`] is an ordered list of `(bucket, triggers)` rules tested
//! by lower-cased substring containment. The [`Bucketer`] uses
//! [`SENTENCE_TRIGGERS`] to sort every sentence of a factsheet into a
//! [`BucketSet`]; the answer selector keeps its own table for questions.

use serde::Serialize;
use tracing::trace;

// ---------------------------------------------------------------------------
// Bucket
// ---------------------------------------------------------------------------

/// Named topical category used to group sentences for answer retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Catch-all for sentences no topical trigger matched.
    Summary,
    Security,
    Cve,
    Pep,
    Blocker,
    Regression,
    Modules,
    Comparison,
}

impl Bucket {
    /// Every bucket, in declaration order.
    pub const ALL: [Bucket; 8] = [
        Self::Summary,
        Self::Security,
        Self::Cve,
        Self::Pep,
        Self::Blocker,
        Self::Regression,
        Self::Modules,
        Self::Comparison,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Security => "security",
            Self::Cve => "cve",
            Self::Pep => "pep",
            Self::Blocker => "blocker",
            Self::Regression => "regression",
            Self::Modules => "modules",
            Self::Comparison => "comparison",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// KeywordTable
// ---------------------------------------------------------------------------

/// Ordered `(bucket, substring triggers)` rules. Triggers must be lower-case.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable {
    rules: &'static [(Bucket, &'static [&'static str])],
}

impl KeywordTable {
    pub const fn new(rules: &'static [(Bucket, &'static [&'static str])]) -> Self {
        Self { rules }
    }

    /// Every bucket whose triggers occur in `lowered`, in table order.
    pub fn matches<'a>(&'a self, lowered: &'a str) -> impl Iterator<Item = Bucket> + 'a {
        self.rules
            .iter()
            .filter(move |(_, triggers)| triggers.iter().any(|t| lowered.contains(t)))
            .map(|(bucket, _)| *bucket)
    }

    /// The highest-priority bucket whose triggers occur in `lowered`.
    pub fn first_match(&self, lowered: &str) -> Option<Bucket> {
        self.matches(lowered).next()
    }

    pub fn rules(&self) -> &'static [(Bucket, &'static [&'static str])] {
        self.rules
    }
}

const SENTENCE_RULES: &[(Bucket, &[&str])] = &[
    (Bucket::Security, &["security", "vulnerab", "hardening"]),
    (Bucket::Cve, &["cve-", "cve "]),
    (Bucket::Pep, &["pep ", "pep-"]),
    (Bucket::Blocker, &["release blocker", "blocker"]),
    (
        Bucket::Regression,
        &["regression", "stability", "crash", "race condition"],
    ),
    (
        Bucket::Modules,
        &["module", "standard library", "stdlib", "library"],
    ),
    (
        Bucket::Comparison,
        &[
            "compare",
            "previous release",
            "follow-up",
            "maintenance release",
        ],
    ),
];

/// Triggers used to sort note sentences into topical buckets.
pub static SENTENCE_TRIGGERS: KeywordTable = KeywordTable::new(SENTENCE_RULES);

// ---------------------------------------------------------------------------
// BucketSet
// ---------------------------------------------------------------------------

/// Sentences of one factsheet grouped by bucket.
///
/// A sentence can sit in several topical buckets at once; sentences that hit
/// no topical bucket live in [`Bucket::Summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketSet {
    buckets: [Vec<String>; 8],
}

impl BucketSet {
    /// Sentences assigned to `bucket`, in note order.
    pub fn get(&self, bucket: Bucket) -> &[String] {
        &self.buckets[bucket.index()]
    }

    fn push(&mut self, bucket: Bucket, sentence: String) {
        self.buckets[bucket.index()].push(sentence);
    }

    /// True when no bucket holds a sentence.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Sentence count summed over all buckets (multi-bucket sentences count once per bucket).
    pub fn total_assignments(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Non-empty buckets with their sentences.
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &[String])> {
        Bucket::ALL
            .into_iter()
            .map(|b| (b, self.get(b)))
            .filter(|(_, sentences)| !sentences.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Bucketer
// ---------------------------------------------------------------------------

/// Sorts sentences into a [`BucketSet`] with a [`KeywordTable`].
#[derive(Debug, Clone, Copy)]
pub struct Bucketer<'t> {
    table: &'t KeywordTable,
}

impl Default for Bucketer<'static> {
    fn default() -> Self {
        Self::new(&SENTENCE_TRIGGERS)
    }
}

impl<'t> Bucketer<'t> {
    pub fn new(table: &'t KeywordTable) -> Self {
        Self { table }
    }

    /// Bucket a sentence sequence.
    ///
    /// If every sentence landed in a topical bucket, `summary` is backfilled
    /// with the first two sentences so a fallback answer always exists when
    /// the notes had any text at all.
    pub fn bucket<I>(&self, sentences: I) -> BucketSet
    where
        I: IntoIterator<Item = String>,
    {
        let mut set = BucketSet::default();
        let mut leading: Vec<String> = Vec::with_capacity(2);

        for sentence in sentences {
            if leading.len() < 2 {
                leading.push(sentence.clone());
            }

            let lowered = sentence.to_lowercase();
            let hits: Vec<Bucket> = self.table.matches(&lowered).collect();
            trace!(?hits, sentence = %sentence, "bucketed sentence");

            if hits.is_empty() {
                set.push(Bucket::Summary, sentence);
                continue;
            }
            for bucket in hits {
                set.push(bucket, sentence.clone());
            }
        }

        if set.get(Bucket::Summary).is_empty() {
            for sentence in leading {
                set.push(Bucket::Summary, sentence);
            }
        }

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_all(sentences: &[&str]) -> BucketSet {
        Bucketer::default().bucket(sentences.iter().map(|s| s.to_string()))
    }

    #[test]
    fn unmatched_sentences_go_to_summary() {
        let set = bucket_all(&["Python 3.12.2 was released in March 2024."]);
        assert_eq!(set.get(Bucket::Summary), ["Python 3.12.2 was released in March 2024."]);
        assert_eq!(set.total_assignments(), 1);
    }

    #[test]
    fn cve_sentence_lands_in_cve_and_modules() {
        let sentence = "CVE-2024-1234 affected the ssl module.";
        let set = bucket_all(&["Intro sentence.", sentence]);

        assert_eq!(set.get(Bucket::Cve), [sentence]);
        assert_eq!(set.get(Bucket::Modules), [sentence]);
        assert!(!set.get(Bucket::Summary).iter().any(|s| s == sentence));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let set = bucket_all(&["SECURITY hardening for PEP 706."]);
        assert_eq!(set.get(Bucket::Security).len(), 1);
        assert_eq!(set.get(Bucket::Pep).len(), 1);
    }

    #[test]
    fn summary_backfilled_with_first_two_sentences() {
        let set = bucket_all(&[
            "Fixed a crash in asyncio.",
            "A security fix landed.",
            "The stdlib got patches.",
        ]);
        assert_eq!(
            set.get(Bucket::Summary),
            ["Fixed a crash in asyncio.", "A security fix landed."]
        );
    }

    #[test]
    fn empty_input_gives_empty_set() {
        let set = bucket_all(&[]);
        assert!(set.is_empty());
        for bucket in Bucket::ALL {
            assert!(set.get(bucket).is_empty());
        }
    }

    #[test]
    fn every_sentence_assigned_at_least_once() {
        let sentences = [
            "Python 3.13.1 is a maintenance release.",
            "It fixes a race condition in threading.",
            "Nothing else.",
            "The release blocker was closed.",
        ];
        let set = bucket_all(&sentences);
        assert!(set.total_assignments() >= sentences.len());
        for sentence in sentences {
            assert!(
                set.iter().any(|(_, s)| s.iter().any(|x| x == sentence)),
                "{sentence} missing"
            );
        }
    }

    #[test]
    fn cve_trigger_needs_separator() {
        let set = bucket_all(&["Discussed cvedetails site."]);
        assert!(set.get(Bucket::Cve).is_empty());
    }

    #[test]
    fn library_counts_as_modules() {
        let set = bucket_all(&["The library was updated."]);
        assert_eq!(set.get(Bucket::Modules).len(), 1);
    }

    #[test]
    fn first_match_respects_table_order() {
        assert_eq!(
            SENTENCE_TRIGGERS.first_match("a crash in the security module"),
            Some(Bucket::Security)
        );
        assert_eq!(SENTENCE_TRIGGERS.first_match("nothing here"), None);
    }

    #[test]
    fn bucket_names() {
        assert_eq!(Bucket::Modules.to_string(), "modules");
        assert_eq!(Bucket::ALL.len(), 8);
    }
}
