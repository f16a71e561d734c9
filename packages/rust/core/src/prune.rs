//! Post-generation pruning of training entries.

use std::collections::HashSet;

use releaseqa_shared::{PruneRule, TrainingEntry};

/// Drops entries whose question matches a rule outside the rule's keep-list.
#[derive(Debug, Clone, Default)]
pub struct Pruner {
    rules: Vec<CompiledRule>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    phrase: String,
    keep_sheets: HashSet<String>,
}

impl Pruner {
    pub fn new(rules: &[PruneRule]) -> Self {
        let rules = rules
            .iter()
            .filter(|r| !r.phrase.trim().is_empty())
            .map(|r| CompiledRule {
                phrase: r.phrase.to_lowercase(),
                keep_sheets: r.keep_sheets.iter().cloned().collect(),
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True when some rule's phrase is in the question and the sheet is not exempt.
    pub fn should_drop(&self, entry: &TrainingEntry) -> bool {
        entry
            .question()
            .is_some_and(|question| self.matches(question, &entry.source_sheet))
    }

    /// Rule check on a bare question and sheet id.
    pub fn matches(&self, question: &str, source_sheet: &str) -> bool {
        let question = question.to_lowercase();
        self.rules.iter().any(|rule| {
            question.contains(&rule.phrase) && !rule.keep_sheets.contains(source_sheet)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use releaseqa_shared::AppConfig;

    fn entry(question: &str, sheet: &str) -> TrainingEntry {
        TrainingEntry::new("sys", question, "answer", sheet)
    }

    #[test]
    fn default_rule_drops_syntax_questions_outside_keep_list() {
        let pruner = Pruner::new(&AppConfig::default().prune);
        let q = "Does Python 3.13.1 include any syntax or language-level changes according to the notes?";

        assert!(pruner.should_drop(&entry(q, "fs6_3131_release_blockers")));
        assert!(!pruner.should_drop(&entry(q, "fs1_py3122")));
        assert!(!pruner.should_drop(&entry("What changed in Python 3.13.1?", "fs6")));
    }

    #[test]
    fn phrase_match_is_case_insensitive() {
        let pruner = Pruner::new(&[PruneRule {
            phrase: "Build Changes".into(),
            keep_sheets: vec![],
        }]);
        assert!(pruner.should_drop(&entry("Were there any build changes?", "fs1")));
    }

    #[test]
    fn blank_phrases_are_ignored() {
        let pruner = Pruner::new(&[PruneRule {
            phrase: "  ".into(),
            keep_sheets: vec![],
        }]);
        assert!(pruner.is_empty());
        assert!(!pruner.should_drop(&entry("Anything?", "fs1")));
    }
}
