//! End-to-end `generate` pipeline: factsheets → buckets → questions → answers → JSONL.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, instrument};

use releaseqa_shared::{GenerateConfig, PruneRule, ReleaseQaError, Result, SourceRecord, TrainingEntry};

use crate::answer::{AnswerSelector, QUESTION_TRIGGERS};
use crate::buckets::Bucketer;
use crate::jsonl::{self, JsonlWriter};
use crate::paraphrase::{self, Paraphraser, TemplateParaphraser, Verbatim};
use crate::prune::Pruner;
use crate::questions::QuestionSynthesizer;

/// Result of the `generate` pipeline.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    /// Factsheet file that was read.
    pub input: PathBuf,
    /// Dataset file that was written.
    pub output: PathBuf,
    /// Number of factsheets processed.
    pub records: usize,
    /// Factsheets that needed defaulted fields.
    pub degraded: usize,
    /// Training entries written.
    pub entries: usize,
    /// Entries dropped by pruning rules.
    pub pruned: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Counts from an in-memory generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateStats {
    pub records: usize,
    pub entries: usize,
    pub pruned: usize,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each factsheet has been turned into entries.
    fn record_done(&self, sheet_id: &str, current: usize, total: usize, entries: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_done(&self, _sheet_id: &str, _current: usize, _total: usize, _entries: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

// ---------------------------------------------------------------------------
// Per-record pipeline
// ---------------------------------------------------------------------------

/// The per-factsheet stages, wired once per run.
pub struct RecordPipeline<'a> {
    system_prompt: &'a str,
    bucketer: Bucketer<'static>,
    synthesizer: QuestionSynthesizer<'a>,
    paraphraser: Box<dyn Paraphraser>,
    selector: AnswerSelector<'static>,
}

impl<'a> RecordPipeline<'a> {
    pub fn new(config: &'a GenerateConfig) -> Result<Self> {
        if config.answer_sentences == 0 {
            return Err(ReleaseQaError::validation(
                "answer_sentences must be at least 1",
            ));
        }

        let paraphraser: Box<dyn Paraphraser> = if config.paraphrase {
            Box::new(TemplateParaphraser::new(config.max_variants))
        } else {
            Box::new(Verbatim)
        };

        Ok(Self {
            system_prompt: &config.system_prompt,
            bucketer: Bucketer::default(),
            synthesizer: QuestionSynthesizer::new(&config.overrides),
            paraphraser,
            selector: AnswerSelector::new(&QUESTION_TRIGGERS, config.answer_sentences),
        })
    }

    /// Swap the paraphrasing strategy.
    pub fn with_paraphraser(mut self, paraphraser: Box<dyn Paraphraser>) -> Self {
        self.paraphraser = paraphraser;
        self
    }

    /// Build every training entry for one factsheet, in question order.
    pub fn entries_for(&self, record: &SourceRecord) -> Vec<TrainingEntry> {
        let buckets = self
            .bucketer
            .bucket(releaseqa_markdown::note_sentences(&record.detailed_notes));
        let base = self.synthesizer.synthesize(record);
        let questions = paraphrase::expand_all(&base, self.paraphraser.as_ref());

        debug!(
            sheet_id = %record.id,
            sentences = buckets.total_assignments(),
            base_questions = base.len(),
            questions = questions.len(),
            "prepared factsheet"
        );

        questions
            .into_iter()
            .map(|question| {
                let answer = self.selector.select(&question, &buckets);
                TrainingEntry::new(self.system_prompt, question, answer, record.id.clone())
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Generate entries for `records` in input order, handing each to `emit`.
///
/// Entries matching a pruning rule are skipped when `config.prune` is set.
pub fn generate_entries<F>(
    records: &[SourceRecord],
    config: &GenerateConfig,
    progress: &dyn ProgressReporter,
    mut emit: F,
) -> Result<GenerateStats>
where
    F: FnMut(TrainingEntry) -> Result<()>,
{
    let pipeline = RecordPipeline::new(config)?;
    let pruner = if config.prune {
        Pruner::new(&config.prune_rules)
    } else {
        Pruner::default()
    };

    let mut stats = GenerateStats::default();
    let total = records.len();

    for (i, record) in records.iter().enumerate() {
        let mut written = 0;
        for entry in pipeline.entries_for(record) {
            if pruner.should_drop(&entry) {
                stats.pruned += 1;
                continue;
            }
            emit(entry)?;
            written += 1;
        }

        stats.records += 1;
        stats.entries += written;
        progress.record_done(&record.id, i + 1, total, written);
    }

    Ok(stats)
}

/// Run the full `generate` pipeline from a factsheet file to a dataset file.
///
/// 1. Load every factsheet (any unparseable line aborts before output exists)
/// 2. Bucket notes, synthesize questions, select answers
/// 3. Write entries to a temporary file and rename it into place
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn generate_dataset(
    input: &Path,
    output: &Path,
    config: &GenerateConfig,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();

    progress.phase("Loading factsheets");
    let loaded = jsonl::read_records(input)?;
    info!(
        records = loaded.records.len(),
        degraded = loaded.degraded,
        "loaded factsheets"
    );

    progress.phase("Generating training entries");
    let mut writer = JsonlWriter::create(output)?;
    let stats = generate_entries(&loaded.records, config, progress, |entry| {
        writer.write(&entry)
    })?;
    writer.commit()?;

    let result = GenerateResult {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        records: stats.records,
        degraded: loaded.degraded,
        entries: stats.entries,
        pruned: stats.pruned,
        elapsed: start.elapsed(),
    };

    info!(
        records = result.records,
        entries = result.entries,
        pruned = result.pruned,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "generation complete"
    );
    progress.done(&result);

    Ok(result)
}

/// Re-normalize every message of an existing training dataset.
///
/// Entries are edited as raw JSON: only string `content` fields under
/// `messages` change, every other key and role passes through untouched.
/// Returns the number of entries written.
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn clean_dataset(input: &Path, output: &Path) -> Result<usize> {
    let entries = jsonl::read_values(input)?;

    let mut writer = JsonlWriter::create(output)?;
    for mut entry in entries {
        normalize_messages(&mut entry);
        writer.write(&entry)?;
    }
    let written = writer.commit()?;

    info!(entries = written, "cleaning complete");
    Ok(written)
}

fn normalize_messages(entry: &mut Value) {
    let Some(messages) = entry.get_mut("messages").and_then(Value::as_array_mut) else {
        return;
    };
    for message in messages {
        let Some(content) = message.get_mut("content") else {
            continue;
        };
        if let Some(text) = content.as_str() {
            *content = Value::String(releaseqa_markdown::normalize(text));
        }
    }
}

/// Counts from a pruning pass over an existing dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub kept: usize,
    pub dropped: usize,
}

/// Apply pruning rules to an existing training dataset.
///
/// The question is the first `user` message; entries without one are kept.
/// Kept entries are written back unchanged.
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn prune_dataset(input: &Path, output: &Path, rules: &[PruneRule]) -> Result<PruneStats> {
    let entries = jsonl::read_values(input)?;
    let pruner = Pruner::new(rules);

    let mut stats = PruneStats::default();
    let mut writer = JsonlWriter::create(output)?;
    for entry in &entries {
        let sheet = entry
            .get("source_sheet")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if user_question(entry).is_some_and(|q| pruner.matches(q, sheet)) {
            stats.dropped += 1;
            continue;
        }
        writer.write(entry)?;
        stats.kept += 1;
    }
    writer.commit()?;

    info!(
        input_entries = entries.len(),
        kept = stats.kept,
        dropped = stats.dropped,
        "pruning complete"
    );
    Ok(stats)
}

fn user_question(entry: &Value) -> Option<&str> {
    entry
        .get("messages")?
        .as_array()?
        .iter()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))?
        .get("content")?
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use releaseqa_shared::{Role, UNKNOWN_SHEET_ID};
    use serde_json::json;

    use crate::answer::NOT_ENOUGH_INFORMATION;

    fn fs1() -> SourceRecord {
        SourceRecord::from_json(&json!({
            "sheet_id": "fs1_py3122",
            "topic_title": "Python 3.12.2 Release Notes",
            "version": "3.12.2",
            "topic_type": "maintenance",
            "detailed_notes": "Python 3.12.2 was released in March 2024. It fixed several regressions from 3.12.1. No new modules were added."
        }))
    }

    fn collect(records: &[SourceRecord], config: &GenerateConfig) -> Vec<TrainingEntry> {
        let mut out = Vec::new();
        generate_entries(records, config, &SilentProgress, |e| {
            out.push(e);
            Ok(())
        })
        .expect("generate");
        out
    }

    fn answer_for<'e>(entries: &'e [TrainingEntry], question: &str) -> Option<&'e str> {
        entries
            .iter()
            .find(|e| e.question() == Some(question))
            .and_then(TrainingEntry::answer)
    }

    #[test]
    fn maintenance_scenario() {
        let entries = collect(&[fs1()], &GenerateConfig::default());

        assert!(answer_for(&entries, "What changed in Python 3.12.2?").is_some());
        assert!(answer_for(&entries, "What was added in Python 3.12.2, released in March 2024?").is_some());
        assert_eq!(
            answer_for(
                &entries,
                "What does Python 3.12.2 tell us about the stability of the 3.12.2 series?"
            ),
            Some("It fixed several regressions from 3.12.1.")
        );
        assert!(entries.iter().all(|e| e.source_sheet == "fs1_py3122"));
        assert!(entries.iter().all(|e| e.messages.len() == 3 && e.messages[0].role == Role::System));
    }

    #[test]
    fn empty_notes_answer_with_sentinel() {
        let record = SourceRecord::from_json(&json!({
            "sheet_id": "empty", "topic_title": "Nothing", "version": "3.0", "topic_type": "security", "detailed_notes": ""
        }));
        let entries = collect(&[record], &GenerateConfig::default());
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.answer() == Some(NOT_ENOUGH_INFORMATION)));
    }

    #[test]
    fn malformed_record_degrades_instead_of_failing() {
        let record = SourceRecord::from_json(&json!({ "detailed_notes": 17 }));
        let entries = collect(&[record], &GenerateConfig::default());
        assert_eq!(entries.len(), 18);
        assert!(entries.iter().all(|e| e.source_sheet == UNKNOWN_SHEET_ID));
        assert!(entries.iter().any(|e| e.question() == Some("What changed in this Python release?")));
    }

    #[test]
    fn paraphrase_expands_and_stays_unique() {
        let plain = collect(&[fs1()], &GenerateConfig::default());
        let config = GenerateConfig {
            paraphrase: true,
            max_variants: 5,
            ..GenerateConfig::default()
        };
        let expanded = collect(&[fs1()], &config);

        assert!(expanded.len() > plain.len());
        let unique: HashSet<&str> = expanded.iter().filter_map(TrainingEntry::question).collect();
        assert_eq!(unique.len(), expanded.len());
        assert!(unique.contains("Can you explain what changed in Python 3.12.2?"));
    }

    #[test]
    fn custom_paraphraser_plugs_in() {
        struct Shouting;
        impl Paraphraser for Shouting {
            fn expand(&self, question: &str) -> Vec<String> {
                vec![question.to_string(), question.to_uppercase()]
            }
        }

        let config = GenerateConfig::default();
        let pipeline = RecordPipeline::new(&config)
            .expect("pipeline")
            .with_paraphraser(Box::new(Shouting));
        let entries = pipeline.entries_for(&fs1());
        assert!(entries.iter().any(|e| e.question() == Some("WHAT CHANGED IN PYTHON 3.12.2?")));
    }

    #[test]
    fn pruning_drops_syntax_questions_for_other_sheets() {
        let record = SourceRecord::from_json(&json!({
            "sheet_id": "fs3_py3131", "version": "3.13.1", "detailed_notes": "Bugfix release."
        }));
        let config = GenerateConfig {
            prune: true,
            ..GenerateConfig::default()
        };

        let mut out = Vec::new();
        let stats = generate_entries(&[record], &config, &SilentProgress, |e| {
            out.push(e);
            Ok(())
        })
        .expect("generate");

        assert_eq!(stats.pruned, 1);
        assert_eq!(stats.entries, out.len());
        assert!(!out.iter().any(|e| e.question().is_some_and(|q| q.contains("syntax or language-level"))));

        let kept = collect(&[fs1()], &config);
        assert!(kept.iter().any(|e| e.question().is_some_and(|q| q.contains("syntax or language-level"))));
    }

    #[test]
    fn zero_answer_sentences_is_rejected() {
        let config = GenerateConfig {
            answer_sentences: 0,
            ..GenerateConfig::default()
        };
        let err = generate_entries(&[fs1()], &config, &SilentProgress, |_| Ok(())).unwrap_err();
        assert!(matches!(err, ReleaseQaError::Validation { .. }));
    }

    #[test]
    fn generate_dataset_writes_jsonl_in_input_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("python_factsheets.jsonl");
        let output = dir.path().join("training.jsonl");
        let lines = [
            json!({"sheet_id": "a", "version": "3.12.2", "detailed_notes": "One."}).to_string(),
            json!({"sheet_id": "b", "version": "3.12.3", "detailed_notes": "Two."}).to_string(),
        ];
        std::fs::write(&input, lines.join("\n")).expect("write input");

        let result =
            generate_dataset(&input, &output, &GenerateConfig::default(), &SilentProgress).expect("generate");
        assert_eq!(result.records, 2);
        assert_eq!(result.entries, 36);

        let written: Vec<TrainingEntry> = jsonl::read_jsonl(&output).expect("read output");
        assert_eq!(written.len(), 36);
        assert_eq!(written[0].source_sheet, "a");
        assert_eq!(written[35].source_sheet, "b");
    }

    #[test]
    fn unparseable_input_produces_no_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("bad.jsonl");
        let output = dir.path().join("training.jsonl");
        std::fs::write(&input, "{\"sheet_id\":\"a\"}\nnot json\n").expect("write input");

        let err = generate_dataset(&input, &output, &GenerateConfig::default(), &SilentProgress)
            .unwrap_err();
        assert!(matches!(err, ReleaseQaError::Parse { line: 2, .. }));
        assert!(!output.exists());
    }

    #[test]
    fn clean_dataset_strips_emphasis() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("raw.jsonl");
        let output = dir.path().join("cleaned.jsonl");
        let entry = TrainingEntry::new("sys", "What is **new**?", "The *ssl* module.", "fs1");
        std::fs::write(&input, serde_json::to_string(&entry).expect("serialize")).expect("write");

        assert_eq!(clean_dataset(&input, &output).expect("clean"), 1);
        let cleaned: Vec<TrainingEntry> = jsonl::read_jsonl(&output).expect("read");
        assert_eq!(cleaned[0].question(), Some("What is new?"));
        assert_eq!(cleaned[0].answer(), Some("The ssl module."));
    }

    #[test]
    fn clean_dataset_keeps_unknown_keys_and_roles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("raw.jsonl");
        let output = dir.path().join("cleaned.jsonl");
        let line = json!({
            "messages": [
                {"role": "tool", "content": "**done**", "name": "search"},
                {"role": "user", "content": "Why *this*?"}
            ],
            "source_sheet": "fs2",
            "split": "train"
        });
        std::fs::write(&input, line.to_string()).expect("write");

        assert_eq!(clean_dataset(&input, &output).expect("clean"), 1);
        let cleaned = jsonl::read_values(&output).expect("read");
        assert_eq!(
            cleaned[0],
            json!({
                "messages": [
                    {"role": "tool", "content": "done", "name": "search"},
                    {"role": "user", "content": "Why this?"}
                ],
                "source_sheet": "fs2",
                "split": "train"
            })
        );
    }

    #[test]
    fn prune_dataset_passes_extra_fields_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("v4.jsonl");
        let output = dir.path().join("v4.cleaned.jsonl");
        let kept = json!({
            "messages": [{"role": "developer", "content": "x"}, {"role": "user", "content": "Other?"}],
            "source_sheet": "fs6",
            "weight": 2
        });
        let dropped = json!({
            "messages": [{"role": "user", "content": "Any syntax or language-level changes?"}],
            "source_sheet": "fs6"
        });
        std::fs::write(&input, format!("{kept}\n{dropped}\n")).expect("write");

        let stats = prune_dataset(&input, &output, &GenerateConfig::default().prune_rules)
            .expect("prune");
        assert_eq!(stats, PruneStats { kept: 1, dropped: 1 });
        assert_eq!(jsonl::read_values(&output).expect("read"), vec![kept]);
    }

    #[test]
    fn prune_dataset_applies_rules() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("v4.jsonl");
        let output = dir.path().join("v4.cleaned.jsonl");
        let q = "Does Python 3.13.1 include any syntax or language-level changes according to the notes?";
        let lines = [
            serde_json::to_string(&TrainingEntry::new("s", q, "a", "fs6")).expect("serialize"),
            serde_json::to_string(&TrainingEntry::new("s", q, "a", "fs1_py3122")).expect("serialize"),
            serde_json::to_string(&TrainingEntry::new("s", "Other?", "a", "fs6")).expect("serialize"),
        ];
        std::fs::write(&input, lines.join("\n")).expect("write");

        let stats = prune_dataset(&input, &output, &GenerateConfig::default().prune_rules)
            .expect("prune");
        assert_eq!(stats, PruneStats { kept: 2, dropped: 1 });
    }
}
