//! Question paraphrasing strategies.
//!
//! A [`Paraphraser`] turns one question into surface variants that share its
//! answer. [`Verbatim`] is the identity; [`TemplateParaphraser`] applies
//! canned framings and whole-word substitutions.

use std::sync::LazyLock;

use regex::Regex;

use crate::questions::dedup_preserving_order;

/// Expands a question into variants. The first variant should be the input.
pub trait Paraphraser: Send + Sync {
    fn expand(&self, question: &str) -> Vec<String>;
}

/// Leaves every question as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Paraphraser for Verbatim {
    fn expand(&self, question: &str) -> Vec<String> {
        if question.trim().is_empty() {
            return Vec::new();
        }
        vec![question.to_string()]
    }
}

/// Framings tried right after the original question.
const LEADING_FRAMES: &[(&str, &str)] = &[("Can you explain ", "?"), ("In simple terms, ", "?")];

/// Framings tried after the substitution variants.
const TRAILING_FRAMES: &[(&str, &str)] = &[
    ("From the release notes, ", "?"),
    ("According to the documentation, ", "?"),
    ("If someone asked you, ", ", how would you answer?"),
    ("How would you summarize this: ", "?"),
    ("Based on the official changelog, ", "?"),
];

/// Each inner list is applied in sequence to produce one variant.
const SUBSTITUTION_CHAINS: &[&[(&str, &str)]] = &[
    &[
        ("Summarize", "Give an overview of"),
        ("What changed", "What are the main changes"),
        ("What is", "How would you describe"),
    ],
    &[
        ("Which", "Can you list which"),
        ("What kinds of", "What types of"),
        ("How does", "In what ways does"),
    ],
];

/// Cues that a question is about change between releases.
const CHANGE_CUES: &[&str] = &["compare", "changed", "difference", "different from"];

static COMPILED_CHAINS: LazyLock<Vec<Vec<(Regex, &'static str)>>> = LazyLock::new(|| {
    SUBSTITUTION_CHAINS
        .iter()
        .map(|chain| {
            chain
                .iter()
                .map(|(from, to)| {
                    let pattern = format!(r"\b{}\b", regex::escape(from));
                    (Regex::new(&pattern).expect("valid regex"), *to)
                })
                .collect()
        })
        .collect()
});

/// Canned paraphraser with a per-question variant cap.
#[derive(Debug, Clone, Copy)]
pub struct TemplateParaphraser {
    /// Variants kept per question, the original included. `0` keeps all.
    max_variants: usize,
}

impl TemplateParaphraser {
    pub fn new(max_variants: usize) -> Self {
        Self { max_variants }
    }
}

impl Paraphraser for TemplateParaphraser {
    fn expand(&self, question: &str) -> Vec<String> {
        if question.trim().is_empty() {
            return Vec::new();
        }

        let core = lower_first(question.trim_end_matches('?'));
        let framed = |(prefix, suffix): &(&str, &str)| format!("{prefix}{core}{suffix}");

        let mut variants = vec![question.to_string()];
        variants.extend(LEADING_FRAMES.iter().map(framed));
        variants.extend(COMPILED_CHAINS.iter().map(|chain| {
            chain
                .iter()
                .fold(question.to_string(), |acc, (re, to)| re.replace_all(&acc, *to).into_owned())
        }));
        variants.extend(TRAILING_FRAMES.iter().map(framed));

        if CHANGE_CUES.iter().any(|cue| core.contains(cue)) {
            variants.push(format!("In what ways is {core} different from the previous release?"));
        }

        let mut variants = dedup_preserving_order(variants);
        if self.max_variants > 0 {
            variants.truncate(self.max_variants);
        }
        variants
    }
}

/// Expand every question and deduplicate the combined list.
pub fn expand_all(questions: &[String], paraphraser: &dyn Paraphraser) -> Vec<String> {
    let expanded = questions
        .iter()
        .flat_map(|q| paraphraser.expand(q))
        .collect();
    dedup_preserving_order(expanded)
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
