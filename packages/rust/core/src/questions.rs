//! Question synthesis for a factsheet.
//!
//! Questions come from template groups selected by the record's metadata,
//! followed by literal evaluation questions looked up by sheet id. The result
//! is deduplicated by exact string, first occurrence wins.

use std::collections::HashSet;

use releaseqa_shared::{QuestionOverrides, SourceRecord};

/// Label used when a record has neither a version nor a title.
const FALLBACK_LABEL: &str = "this Python release";

/// Builds the question list for each factsheet.
#[derive(Debug, Clone, Copy)]
pub struct QuestionSynthesizer<'a> {
    overrides: &'a QuestionOverrides,
}

impl<'a> QuestionSynthesizer<'a> {
    pub fn new(overrides: &'a QuestionOverrides) -> Self {
        Self { overrides }
    }

    /// All questions for `record`, deduplicated, in template order.
    pub fn synthesize(&self, record: &SourceRecord) -> Vec<String> {
        let label = version_label(record);
        let title = if record.topic_title.is_empty() {
            label.clone()
        } else {
            record.topic_title.clone()
        };
        let topic_type = record.topic_type.to_lowercase();

        let mut questions = generic_questions(&label, record.version.as_deref());

        if topic_type.contains("security") {
            questions.extend(security_questions(&label));
        }
        if topic_type.contains("pep") {
            questions.extend(pep_questions(&label, &title));
        }
        if topic_type.contains("release-engineering") || title.to_lowercase().contains("blocker") {
            questions.extend(release_engineering_questions(&label));
        }

        questions.extend(self.overrides.get(&record.id).iter().cloned());

        dedup_preserving_order(questions)
    }
}

/// "Python 3.12.2" when the version is known, otherwise the topic title.
pub fn version_label(record: &SourceRecord) -> String {
    match record.version.as_deref() {
        Some(version) if !version.is_empty() => format!("Python {version}"),
        _ if !record.topic_title.is_empty() => record.topic_title.clone(),
        _ => FALLBACK_LABEL.to_string(),
    }
}

/// Drop exact duplicates, keeping the first occurrence of each string.
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Template groups
// ---------------------------------------------------------------------------

fn generic_questions(label: &str, version: Option<&str>) -> Vec<String> {
    let series = match version {
        Some(v) if !v.is_empty() => format!("the {v} series"),
        _ => "its release series".to_string(),
    };

    vec![
        format!("What changed in {label}?"),
        format!("What is {label} and what does this release focus on?"),
        format!("Is {label} mainly a bugfix release or does it add new features?"),
        format!("What kinds of improvements and bugfixes are included in {label}?"),
        format!("When was {label} released and why is it important?"),
        format!("How does {label} compare to the previous release in the same series?"),
        format!("What does {label} tell us about the stability of {series}?"),
        format!("Which parts of the interpreter or standard library were most affected in {label}?"),
        format!("Summarize the main goals of {label}."),
        format!("What did {label} contribute for users already on this major version?"),
        format!("From the release notes, how would you describe the role of {label} in its series?"),
        format!("Is {label} described as a maintenance release or a feature release?"),
        format!("What does the changelog highlight as the focus of {label}?"),
        format!("What is the overall scope of fixes and improvements in {label}?"),
        format!("How many bugfixes or improvements are roughly mentioned for {label}?"),
        format!("In which areas did {label} provide the most polish or stabilization?"),
        format!("Does {label} include any syntax or language-level changes according to the notes?"),
        format!("What does the documentation say about documentation and build changes in {label}?"),
    ]
}

fn security_questions(label: &str) -> Vec<String> {
    vec![
        format!("Which security fixes or advisories are mentioned in {label}?"),
        format!("Did {label} address any CVEs or vulnerabilities, and how?"),
        format!("What does the security section for {label} say about the vulnerabilities patched?"),
        format!("What kind of security hardening was done in {label}?"),
        format!("What kind of hardening does {label} apply to standard library or bundled components?"),
    ]
}

fn pep_questions(label: &str, title: &str) -> Vec<String> {
    vec![
        format!("Which PEPs related to {label} changed status according to {title}?"),
        format!("What does {title} say about how PEPs evolved between the alpha and beta phases of {label}?"),
        format!("What wording changes in Accepted PEPs are highlighted in {title}?"),
        format!("What does the summary say about PEP lifecycle and wording changes targeting {label}?"),
        format!("What kinds of clarifications were added to Accepted PEPs for {label}?"),
    ]
}

fn release_engineering_questions(label: &str) -> Vec<String> {
    vec![
        format!("What kinds of release blockers were tracked for {label}, and why did they matter?"),
        format!("What problems had to be fixed before {label} could be released?"),
        format!("How were release blockers for {label} tracked and resolved?"),
        format!("What does the overview say about typical categories of blockers for {label}?"),
        format!("What was the outcome of resolving release blockers for {label}?"),
        format!("Which regressions or crashes were resolved before {label} was released?"),
    ]
}
