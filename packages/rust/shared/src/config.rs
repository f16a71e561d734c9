//! Application configuration for ReleaseQA.
//!
//! User config lives at `~/.releaseqa/releaseqa.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReleaseQaError, Result};
use crate::types::DEFAULT_SYSTEM_PROMPT;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "releaseqa.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".releaseqa";

// ---------------------------------------------------------------------------
// Config structs (matching releaseqa.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Question paraphrase expansion.
    #[serde(default)]
    pub paraphrase: ParaphraseConfig,

    /// Q&A pair curation bounds.
    #[serde(default)]
    pub curate: CurateConfig,

    /// Entry pruning rules (`[[prune]]`).
    #[serde(default = "default_prune_rules")]
    pub prune: Vec<PruneRule>,

    /// Per-sheet evaluation questions.
    #[serde(default)]
    pub overrides: QuestionOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            paraphrase: ParaphraseConfig::default(),
            curate: CurateConfig::default(),
            prune: default_prune_rules(),
            overrides: QuestionOverrides::default(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// System instruction written as the first message of every entry.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum number of bucket sentences joined into one answer.
    #[serde(default = "default_answer_sentences")]
    pub answer_sentences: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            answer_sentences: default_answer_sentences(),
        }
    }
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
fn default_answer_sentences() -> usize {
    4
}

/// `[paraphrase]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParaphraseConfig {
    /// Expand every synthesized question into surface variants.
    #[serde(default)]
    pub enabled: bool,

    /// Variants kept per base question, the original included. `0` keeps all.
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,
}

impl Default for ParaphraseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_variants: default_max_variants(),
        }
    }
}

fn default_max_variants() -> usize {
    5
}

/// `[curate]` section. Lengths are counted in characters after trimming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurateConfig {
    #[serde(default = "default_min_question_len")]
    pub min_question_len: usize,
    #[serde(default = "default_max_question_len")]
    pub max_question_len: usize,
    #[serde(default = "default_min_answer_len")]
    pub min_answer_len: usize,
    #[serde(default = "default_max_answer_len")]
    pub max_answer_len: usize,
    /// Stop after this many accepted pairs.
    #[serde(default = "default_curate_limit")]
    pub limit: usize,
}

impl Default for CurateConfig {
    fn default() -> Self {
        Self {
            min_question_len: default_min_question_len(),
            max_question_len: default_max_question_len(),
            min_answer_len: default_min_answer_len(),
            max_answer_len: default_max_answer_len(),
            limit: default_curate_limit(),
        }
    }
}

impl CurateConfig {
    /// Reject bounds that can never accept a pair.
    pub fn validate(&self) -> Result<()> {
        if self.min_question_len > self.max_question_len {
            return Err(ReleaseQaError::validation(format!(
                "min_question_len ({}) exceeds max_question_len ({})",
                self.min_question_len, self.max_question_len
            )));
        }
        if self.min_answer_len > self.max_answer_len {
            return Err(ReleaseQaError::validation(format!(
                "min_answer_len ({}) exceeds max_answer_len ({})",
                self.min_answer_len, self.max_answer_len
            )));
        }
        Ok(())
    }
}

fn default_min_question_len() -> usize {
    20
}
fn default_max_question_len() -> usize {
    300
}
fn default_min_answer_len() -> usize {
    50
}
fn default_max_answer_len() -> usize {
    1000
}
fn default_curate_limit() -> usize {
    10_000
}

/// `[[prune]]` entry: drop entries whose question mentions `phrase`,
/// except for the sheets listed in `keep_sheets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneRule {
    /// Case-insensitive phrase searched for in the user question.
    pub phrase: String,
    /// Sheets for which the phrase is legitimate.
    #[serde(default)]
    pub keep_sheets: Vec<String>,
}

fn default_prune_rules() -> Vec<PruneRule> {
    vec![PruneRule {
        phrase: "syntax or language-level changes".into(),
        keep_sheets: vec!["fs1_py3122".into(), "fs2_py3123".into()],
    }]
}

// ---------------------------------------------------------------------------
// Question overrides
// ---------------------------------------------------------------------------

/// Literal evaluation questions keyed by sheet identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionOverrides(pub BTreeMap<String, Vec<String>>);

impl QuestionOverrides {
    /// An empty table.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Questions registered for `sheet_id`, empty when there are none.
    pub fn get(&self, sheet_id: &str) -> &[String] {
        self.0.get(sheet_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of sheets with overrides.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load a standalone overrides file.
    ///
    /// The file holds a single `[overrides]` table mapping sheet ids to arrays
    /// of questions, the same shape as the section in `releaseqa.toml`.
    pub fn load_from(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct OverridesFile {
            #[serde(default = "QuestionOverrides::empty")]
            overrides: QuestionOverrides,
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ReleaseQaError::io(path, e))?;
        let file: OverridesFile = toml::from_str(&content).map_err(|e| {
            ReleaseQaError::config(format!("failed to parse {}: {e}", path.display()))
        })?;

        tracing::debug!(?path, sheets = file.overrides.len(), "loaded question overrides");
        Ok(file.overrides)
    }
}

impl Default for QuestionOverrides {
    fn default() -> Self {
        let table = [
            (
                "fs1_py3122",
                vec!["What was added in Python 3.12.2, released in March 2024?"],
            ),
            (
                "fs2_py3123",
                vec![
                    "What specific bug fixes and security advisories were included in Python 3.12.3, released in April 2024?",
                ],
            ),
            (
                "fs4_py312x_mid2024_cves",
                vec![
                    "Which categories of CVEs were fixed in Python 3.12.x in mid-2024?",
                    "What kinds of modules or libraries were affected by the mid-2024 CVE fixes in Python 3.12.x?",
                    "How do the mid-2024 Python 3.12.x security fixes describe the CVEs and impacted components?",
                    "What is the overall picture of CVE-related changes in Python 3.12.x during mid-2024?",
                    "How were the mid-2024 CVE fixes delivered across Python 3.12.x releases?",
                    "Which CVEs were fixed in Python 3.12.x during mid-2024, and which modules were impacted?",
                ],
            ),
            (
                "fs5_peps_314_status_delta",
                vec![
                    "Which PEPs targeting Python 3.14 changed status between alpha and beta, and what changed in their Accepted wording?",
                ],
            ),
            (
                "fs6_3131_release_blockers",
                vec![
                    "What were the documented release blockers and notable open issues before the Python 3.13.1 release, and which of them were resolved by the time 3.13.1 shipped?",
                ],
            ),
        ];

        Self(
            table
                .into_iter()
                .map(|(id, qs)| (id.to_string(), qs.into_iter().map(String::from).collect()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Generation config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime generation configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// System instruction for every entry.
    pub system_prompt: String,
    /// Sentences joined into one answer.
    pub answer_sentences: usize,
    /// Whether paraphrase expansion runs.
    pub paraphrase: bool,
    /// Variant cap per base question (`0` = uncapped).
    pub max_variants: usize,
    /// Identifier-keyed evaluation questions.
    pub overrides: QuestionOverrides,
    /// Pruning rules, applied only when `prune` is set.
    pub prune_rules: Vec<PruneRule>,
    /// Whether to apply `prune_rules` before writing.
    pub prune: bool,
}

impl From<&AppConfig> for GenerateConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            system_prompt: config.defaults.system_prompt.clone(),
            answer_sentences: config.defaults.answer_sentences,
            paraphrase: config.paraphrase.enabled,
            max_variants: config.paraphrase.max_variants,
            overrides: config.overrides.clone(),
            prune_rules: config.prune.clone(),
            prune: false,
        }
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.releaseqa/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReleaseQaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.releaseqa/releaseqa.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReleaseQaError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ReleaseQaError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.curate.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReleaseQaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReleaseQaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReleaseQaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
