//! Core domain types for ReleaseQA datasets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier used when a factsheet carries neither `sheet_id` nor `id`.
pub const UNKNOWN_SHEET_ID: &str = "unknown_sheet";

/// System instruction placed at the head of every training exchange.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful Python programming assistant. \
     Answer concisely and accurately based on the Python release information.";

// ---------------------------------------------------------------------------
// SourceRecord
// ---------------------------------------------------------------------------

/// One factsheet: a structured unit of release-history text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Unique identifier within a run (`sheet_id` in the wire format).
    #[serde(rename = "sheet_id", alias = "id")]
    pub id: String,
    /// Human-readable topic, e.g. "Python 3.12.2 Release Notes".
    #[serde(default)]
    pub topic_title: String,
    /// Release version, e.g. "3.12.2". Empty strings are treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form category label ("maintenance", "security", "pep-status", ...).
    #[serde(default)]
    pub topic_type: String,
    /// Long-form notes the answers are mined from.
    #[serde(default)]
    pub detailed_notes: String,
}

impl SourceRecord {
    /// Keys every well-formed factsheet carries.
    const FIELDS: [&'static str; 3] = ["topic_title", "topic_type", "detailed_notes"];

    /// Build a record from an arbitrary JSON value.
    ///
    /// Missing or wrong-typed keys fall back to defaults instead of failing:
    /// the identifier becomes [`UNKNOWN_SHEET_ID`], strings become empty and
    /// the version becomes `None`.
    pub fn from_json(value: &Value) -> Self {
        let id = string_field(value, "sheet_id")
            .or_else(|| string_field(value, "id"))
            .unwrap_or_else(|| UNKNOWN_SHEET_ID.to_string());

        Self {
            id,
            topic_title: string_field(value, "topic_title").unwrap_or_default(),
            version: string_field(value, "version").filter(|v| !v.is_empty()),
            topic_type: string_field(value, "topic_type").unwrap_or_default(),
            detailed_notes: string_field(value, "detailed_notes").unwrap_or_default(),
        }
    }

    /// Names of the fields that had to be defaulted when reading `value`.
    pub fn degraded_fields(value: &Value) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if string_field(value, "sheet_id").is_none() && string_field(value, "id").is_none() {
            missing.push("sheet_id");
        }
        for key in Self::FIELDS {
            if string_field(value, key).is_none() {
                missing.push(key);
            }
        }
        // `version` is optional; only a present non-string value is malformed.
        if value.get("version").is_some_and(|v| !v.is_string() && !v.is_null()) {
            missing.push("version");
        }
        missing
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

// ---------------------------------------------------------------------------
// TrainingEntry
// ---------------------------------------------------------------------------

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn of a training exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The persisted output unit: system/user/assistant exchange plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEntry {
    pub messages: Vec<ChatMessage>,
    /// Identifier of the factsheet the exchange was generated from.
    #[serde(default)]
    pub source_sheet: String,
}

impl TrainingEntry {
    /// Package a question/answer pair. Never fails.
    pub fn new(
        system_prompt: &str,
        question: impl Into<String>,
        answer: impl Into<String>,
        source_sheet: impl Into<String>,
    ) -> Self {
        Self {
            messages: vec![
                ChatMessage::new(Role::System, system_prompt),
                ChatMessage::new(Role::User, question),
                ChatMessage::new(Role::Assistant, answer),
            ],
            source_sheet: source_sheet.into(),
        }
    }

    /// The first user turn, if any.
    pub fn question(&self) -> Option<&str> {
        self.content_of(Role::User)
    }

    /// The first assistant turn, if any.
    pub fn answer(&self) -> Option<&str> {
        self.content_of(Role::Assistant)
    }

    fn content_of(&self, role: Role) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }
}

// ---------------------------------------------------------------------------
// QaPair
// ---------------------------------------------------------------------------

/// A plain question/answer pair, as used by general Q&A corpora.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_from_complete_json() {
        let value = json!({
            "sheet_id": "fs1_py3122",
            "topic_title": "Python 3.12.2 Release Notes",
            "version": "3.12.2",
            "topic_type": "maintenance",
            "detailed_notes": "Python 3.12.2 was released in March 2024."
        });
        let record = SourceRecord::from_json(&value);
        assert_eq!(record.id, "fs1_py3122");
        assert_eq!(record.version.as_deref(), Some("3.12.2"));
        assert!(SourceRecord::degraded_fields(&value).is_empty());
    }

    #[test]
    fn record_falls_back_on_missing_and_wrong_typed_fields() {
        let value = json!({ "version": 3.12, "topic_type": null });
        let record = SourceRecord::from_json(&value);
        assert_eq!(record.id, UNKNOWN_SHEET_ID);
        assert_eq!(record.version, None);
        assert_eq!(record.topic_type, "");
        assert_eq!(record.detailed_notes, "");

        let degraded = SourceRecord::degraded_fields(&value);
        assert!(degraded.contains(&"sheet_id"));
        assert!(degraded.contains(&"version"));
    }

    #[test]
    fn versionless_record_is_not_degraded() {
        let value = json!({
            "sheet_id": "fs5_peps_314_status_delta",
            "topic_title": "PEP status delta",
            "topic_type": "pep-status",
            "detailed_notes": "PEP 750 was accepted."
        });
        assert!(SourceRecord::degraded_fields(&value).is_empty());

        let explicit_null = json!({
            "sheet_id": "fs5", "topic_title": "T", "version": null,
            "topic_type": "pep", "detailed_notes": "N."
        });
        assert!(SourceRecord::degraded_fields(&explicit_null).is_empty());
    }

    #[test]
    fn record_accepts_plain_id_key() {
        let record = SourceRecord::from_json(&json!({ "id": "fs9" }));
        assert_eq!(record.id, "fs9");
    }

    #[test]
    fn non_object_json_degrades_to_defaults() {
        let record = SourceRecord::from_json(&json!(42));
        assert_eq!(record.id, UNKNOWN_SHEET_ID);
        assert_eq!(record.topic_title, "");
    }

    #[test]
    fn empty_version_is_absent() {
        let record = SourceRecord::from_json(&json!({ "sheet_id": "x", "version": "" }));
        assert_eq!(record.version, None);
    }

    #[test]
    fn training_entry_wire_shape() {
        let entry = TrainingEntry::new(DEFAULT_SYSTEM_PROMPT, "Q?", "A.", "fs1");
        let value = serde_json::to_value(&entry).expect("serialize");

        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "Q?");
        assert_eq!(value["messages"][2]["role"], "assistant");
        assert_eq!(value["messages"][2]["content"], "A.");
        assert_eq!(value["source_sheet"], "fs1");
    }

    #[test]
    fn training_entry_accessors() {
        let entry = TrainingEntry::new("sys", "Q?", "A.", "fs1");
        assert_eq!(entry.question(), Some("Q?"));
        assert_eq!(entry.answer(), Some("A."));
    }
}
