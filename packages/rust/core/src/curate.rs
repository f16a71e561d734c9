//! Curation of plain question/answer corpora.
//!
//! Keeps pairs whose trimmed lengths fall inside the configured bounds,
//! rejects answers with leftover markup, removes case-insensitive duplicate
//! questions, and stops once the limit is reached.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument};

use releaseqa_shared::{CurateConfig, QaPair, Result};

use crate::jsonl::{JsonlWriter, read_jsonl_lenient};

/// Outcome of a curation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurateStats {
    pub kept: usize,
    pub too_short: usize,
    pub too_long: usize,
    pub markup: usize,
    pub duplicates: usize,
    /// Lines that were not valid JSON (file-level runs only).
    pub corrupted: usize,
}

/// Why a pair was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    TooShort,
    TooLong,
    Markup,
    Duplicate,
}

/// Filter `pairs` in order, returning the kept pairs (trimmed) and statistics.
pub fn curate_pairs<I>(pairs: I, bounds: &CurateConfig) -> (Vec<QaPair>, CurateStats)
where
    I: IntoIterator<Item = QaPair>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::new();
    let mut stats = CurateStats::default();

    for pair in pairs {
        if kept.len() >= bounds.limit {
            break;
        }

        let question = pair.question.trim();
        let answer = pair.answer.trim();

        match check(question, answer, bounds, &seen) {
            Some(Rejection::TooShort) => stats.too_short += 1,
            Some(Rejection::TooLong) => stats.too_long += 1,
            Some(Rejection::Markup) => stats.markup += 1,
            Some(Rejection::Duplicate) => stats.duplicates += 1,
            None => {
                seen.insert(question.to_lowercase());
                kept.push(QaPair {
                    question: question.to_string(),
                    answer: answer.to_string(),
                });
            }
        }
    }

    stats.kept = kept.len();
    (kept, stats)
}

fn check(
    question: &str,
    answer: &str,
    bounds: &CurateConfig,
    seen: &HashSet<String>,
) -> Option<Rejection> {
    let q_len = question.chars().count();
    let a_len = answer.chars().count();

    if q_len < bounds.min_question_len || a_len < bounds.min_answer_len {
        return Some(Rejection::TooShort);
    }
    if q_len > bounds.max_question_len || a_len > bounds.max_answer_len {
        return Some(Rejection::TooLong);
    }
    if answer.contains('<') || answer.contains('>') {
        return Some(Rejection::Markup);
    }
    if seen.contains(&question.to_lowercase()) {
        return Some(Rejection::Duplicate);
    }
    None
}

/// Curate a JSON Lines file of [`QaPair`]s into `output`.
#[instrument(skip(bounds), fields(input = %input.display(), output = %output.display()))]
pub fn curate_file(input: &Path, output: &Path, bounds: &CurateConfig) -> Result<CurateStats> {
    bounds.validate()?;

    let (pairs, corrupted) = read_jsonl_lenient::<QaPair>(input)?;
    let (kept, mut stats) = curate_pairs(pairs, bounds);
    stats.corrupted = corrupted;

    let mut writer = JsonlWriter::create(output)?;
    for pair in &kept {
        writer.write(pair)?;
    }
    writer.commit()?;

    info!(
        kept = stats.kept,
        too_short = stats.too_short,
        too_long = stats.too_long,
        markup = stats.markup,
        duplicates = stats.duplicates,
        corrupted = stats.corrupted,
        "curation complete"
    );
    Ok(stats)
}
