//! Run manifest: a JSON sidecar describing one generation run.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use releaseqa_shared::{GenerateConfig, ReleaseQaError, Result};

use crate::pipeline::GenerateResult;

/// Current schema version for the run manifest format.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// A file consumed or produced by the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
}

impl FileDigest {
    /// Hash the file at `path`.
    pub fn of(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ReleaseQaError::io(path, e))?;
        Ok(Self {
            path: path.display().to_string(),
            sha256: sha256_hex(&bytes),
            size_bytes: bytes.len() as u64,
        })
    }
}

/// Paraphrase settings recorded for reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParaphraseMeta {
    pub enabled: bool,
    pub max_variants: usize,
}

/// The manifest written next to a generated dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    /// Time-sortable run identifier (UUID v7).
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub tool_version: String,
    pub input: FileDigest,
    pub output: FileDigest,
    pub records: usize,
    pub degraded_records: usize,
    pub entries: usize,
    pub pruned: usize,
    pub paraphrase: ParaphraseMeta,
    pub answer_sentences: usize,
}

impl RunManifest {
    /// Describe a finished run, hashing its input and output files.
    pub fn build(
        result: &GenerateResult,
        config: &GenerateConfig,
        tool_version: &str,
    ) -> Result<Self> {
        Ok(Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            run_id: Uuid::now_v7(),
            created_at: Utc::now(),
            tool_version: tool_version.to_string(),
            input: FileDigest::of(&result.input)?,
            output: FileDigest::of(&result.output)?,
            records: result.records,
            degraded_records: result.degraded,
            entries: result.entries,
            pruned: result.pruned,
            paraphrase: ParaphraseMeta {
                enabled: config.paraphrase,
                max_variants: config.max_variants,
            },
            answer_sentences: config.answer_sentences,
        })
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ReleaseQaError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, format!("{json}\n")).map_err(|e| ReleaseQaError::io(path, e))?;
        info!(path = %path.display(), run_id = %self.run_id, "wrote run manifest");
        Ok(())
    }
}

/// Compute SHA-256 hash of content.
fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.jsonl");
        let output = dir.path().join("out.jsonl");
        std::fs::write(&input, "{}\n").expect("write input");
        std::fs::write(&output, "{}\n{}\n").expect("write output");

        let result = GenerateResult {
            input: input.clone(),
            output: output.clone(),
            records: 1,
            degraded: 1,
            entries: 2,
            pruned: 0,
            elapsed: Duration::from_millis(5),
        };
        let manifest =
            RunManifest::build(&result, &GenerateConfig::default(), "0.1.0").expect("build");
        assert_eq!(manifest.output.size_bytes, 6);
        assert_eq!(manifest.input.sha256.len(), 64);

        let path = dir.path().join("run.json");
        manifest.write(&path).expect("write");
        let parsed: RunManifest =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(parsed.run_id, manifest.run_id);
        assert_eq!(parsed.entries, 2);
        assert_eq!(parsed.schema_version, MANIFEST_SCHEMA_VERSION);
    }
}
