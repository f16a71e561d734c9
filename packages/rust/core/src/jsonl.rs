//! JSON Lines input and output.
//!
//! Readers load the whole file up front so a malformed line fails the run
//! before any output exists. [`JsonlWriter`] writes to a temporary file and
//! renames it over the target on [`JsonlWriter::commit`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use releaseqa_shared::{ReleaseQaError, Result, SourceRecord};

/// Factsheets read from a JSON Lines file.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<SourceRecord>,
    /// Records that needed at least one defaulted field.
    pub degraded: usize,
}

/// Parse every non-blank line of `path` as a JSON value.
///
/// Any unparseable line is an error pointing at its 1-based line number.
pub fn read_values(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| ReleaseQaError::io(path, e))?;

    let mut values = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str(line)
            .map_err(|e| ReleaseQaError::parse(path, idx + 1, e.to_string()))?;
        values.push(value);
    }

    debug!(path = %path.display(), lines = values.len(), "read JSON lines");
    Ok(values)
}

/// Load factsheets, defaulting missing or wrong-typed fields per record.
pub fn read_records(path: &Path) -> Result<LoadedRecords> {
    let values = read_values(path)?;
    let mut loaded = LoadedRecords {
        records: Vec::with_capacity(values.len()),
        degraded: 0,
    };

    for (idx, value) in values.iter().enumerate() {
        let record = SourceRecord::from_json(value);
        let missing = SourceRecord::degraded_fields(value);
        if !missing.is_empty() {
            warn!(
                record = idx + 1,
                sheet_id = %record.id,
                ?missing,
                "factsheet has missing or malformed fields, using defaults"
            );
            loaded.degraded += 1;
        }
        loaded.records.push(record);
    }

    Ok(loaded)
}

/// Deserialize every non-blank line as `T`, failing on the first bad line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path).map_err(|e| ReleaseQaError::io(path, e))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line.trim())
                .map_err(|e| ReleaseQaError::parse(path, idx + 1, e.to_string()))
        })
        .collect()
}

/// Deserialize every non-blank line as `T`, skipping lines that do not parse.
///
/// Returns the parsed items and the number of skipped lines.
pub fn read_jsonl_lenient<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize)> {
    let content = std::fs::read_to_string(path).map_err(|e| ReleaseQaError::io(path, e))?;

    let mut items = Vec::new();
    let mut skipped = 0;
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(line = idx + 1, error = %e, "skipping corrupted line");
                skipped += 1;
            }
        }
    }

    Ok((items, skipped))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Line-oriented JSON writer with write-then-rename semantics.
///
/// Dropping the writer without committing removes the temporary file and
/// leaves any existing target untouched.
pub struct JsonlWriter {
    target: PathBuf,
    temp: PathBuf,
    out: Option<BufWriter<File>>,
    written: usize,
    committed: bool,
}

impl JsonlWriter {
    /// Create the temporary file next to `target`, creating parent dirs.
    pub fn create(target: &Path) -> Result<Self> {
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| ReleaseQaError::io(parent, e))?;

        let file_name = target
            .file_name()
            .ok_or_else(|| {
                ReleaseQaError::validation(format!(
                    "output path '{}' has no file name",
                    target.display()
                ))
            })?
            .to_string_lossy();
        let temp = parent.join(format!(".{file_name}.tmp"));

        let file = File::create(&temp).map_err(|e| ReleaseQaError::io(&temp, e))?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            out: Some(BufWriter::new(file)),
            written: 0,
            committed: false,
        })
    }

    /// Serialize `item` as one line.
    pub fn write<T: Serialize>(&mut self, item: &T) -> Result<()> {
        let line = serde_json::to_string(item)?;
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| ReleaseQaError::validation("writer already committed"))?;

        out.write_all(line.as_bytes())
            .and_then(|()| out.write_all(b"\n"))
            .map_err(|e| ReleaseQaError::io(&self.temp, e))?;

        self.written += 1;
        Ok(())
    }

    /// Lines written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and move the temporary file over the target. Returns lines written.
    pub fn commit(mut self) -> Result<usize> {
        if let Some(out) = self.out.take() {
            let file = out
                .into_inner()
                .map_err(|e| ReleaseQaError::io(&self.temp, e.into_error()))?;
            file.sync_all()
                .map_err(|e| ReleaseQaError::io(&self.temp, e))?;
        }

        std::fs::rename(&self.temp, &self.target)
            .map_err(|e| ReleaseQaError::io(&self.target, e))?;
        self.committed = true;

        debug!(path = %self.target.display(), lines = self.written, "committed JSON lines");
        Ok(self.written)
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.out = None;
            let _ = std::fs::remove_file(&self.temp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use releaseqa_shared::{QaPair, UNKNOWN_SHEET_ID};

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    #[test]
    fn read_records_skips_blank_lines_and_counts_degraded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            dir.path(),
            "sheets.jsonl",
            concat!(
                r#"{"sheet_id":"fs1","topic_title":"T","version":"3.12.2","topic_type":"maintenance","detailed_notes":"N."}"#,
                "\n\n",
                r#"{"topic_title":"No id"}"#,
                "\n"
            ),
        );

        let loaded = read_records(&path).expect("read");
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.degraded, 1);
        assert_eq!(loaded.records[1].id, UNKNOWN_SHEET_ID);
    }

    #[test]
    fn unparseable_line_is_fatal_with_line_number() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "bad.jsonl", "{\"sheet_id\":\"a\"}\n{not json\n");

        let err = read_records(&path).unwrap_err();
        match err {
            ReleaseQaError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_values(&dir.path().join("absent.jsonl")).unwrap_err();
        assert!(matches!(err, ReleaseQaError::Io { .. }));
    }

    #[test]
    fn lenient_reader_skips_corrupted_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            dir.path(),
            "pairs.jsonl",
            "{\"question\":\"q\",\"answer\":\"a\"}\n{oops\n{\"question\":\"q2\",\"answer\":\"a2\"}\n",
        );

        let (pairs, skipped): (Vec<QaPair>, usize) = read_jsonl_lenient(&path).expect("read");
        assert_eq!(pairs.len(), 2);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn writer_commits_atomically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("out").join("data.jsonl");

        let mut writer = JsonlWriter::create(&target).expect("create");
        writer.write(&QaPair { question: "Q?".into(), answer: "Ünïcode A.".into() }).expect("write");
        assert!(!target.exists());
        assert_eq!(writer.commit().expect("commit"), 1);

        let content = std::fs::read_to_string(&target).expect("read back");
        assert_eq!(content, "{\"question\":\"Q?\",\"answer\":\"Ünïcode A.\"}\n");
        assert!(!dir.path().join("out").join(".data.jsonl.tmp").exists());
    }

    #[test]
    fn dropped_writer_leaves_no_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("data.jsonl");
        {
            let mut writer = JsonlWriter::create(&target).expect("create");
            writer.write(&serde_json::json!({"a": 1})).expect("write");
        }
        assert!(!target.exists());
        assert!(!dir.path().join(".data.jsonl.tmp").exists());
    }
}
