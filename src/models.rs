// Typed records for the backend payloads. Every field the backend may omit
// is an `Option`, so a missing key shows up as `None` instead of a guess.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notebook {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub source_count: Option<u64>,
    pub note_count: Option<u64>,
    #[serde(alias = "created")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    Text,
    File,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Option<SourceKind>,
    pub notebook_id: Option<String>,
    pub title: Option<String>,
    /// Set when the backend is still processing the new source.
    pub source_id: Option<String>,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Url => "url",
            SourceKind::Text => "text",
            SourceKind::File => "file",
            SourceKind::Other => "other",
        }
    }
}

/// What a new source is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    Url(String),
    Text(String),
    File(PathBuf),
}

impl SourceInput {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceInput::Url(_) => SourceKind::Url,
            SourceInput::Text(_) => SourceKind::Text,
            SourceInput::File(_) => SourceKind::File,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    Human,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub content: Option<String>,
    pub title: Option<String>,
    pub notebook_id: Option<String>,
    pub note_type: Option<NoteType>,
}

/// Acknowledgement of a write. Some endpoints answer with an empty body, so
/// nothing here is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Created {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transformation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub prompt: Option<String>,
    #[serde(default)]
    pub apply_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub id: String,
    pub provider: Option<String>,
    #[serde(alias = "name")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Text,
    Vector,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    #[serde(default)]
    pub results: Vec<SearchHit>,
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformationOutput {
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Podcast {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub episode_profile: Option<String>,
    pub speaker_profile: Option<String>,
}

/// A backend command (background job) as reported by `/commands/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: Option<f64>,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl Command {
    /// The job's own reference, whichever key the backend used for it.
    pub fn reference(&self) -> Option<&str> {
        [&self.id, &self.job_id, &self.command_id]
            .into_iter()
            .find_map(|v| v.as_deref())
    }
}

/// Job state. Anything the backend reports that is not one of the known
/// states is kept verbatim and counts as still in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Other("unknown".to_string())
    }
}

impl JobStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Other(v) => v.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|v| Self::parse(&v)).unwrap_or_default())
    }
}

impl Serialize for JobStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// Progress shows up as a bare number, a numeric string, or an object with a
// `percentage` key depending on the command type.
fn lenient_percent<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        serde_json::Value::Object(map) => map.get("percentage").and_then(|p| p.as_f64()),
        _ => None,
    }))
}

// Request bodies.

#[derive(Debug, Serialize)]
pub struct NewNotebook<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewNote<'a> {
    pub content: &'a str,
    pub note_type: NoteType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebook_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    #[serde(rename = "type")]
    pub search_type: SearchType,
    pub limit: u32,
    pub search_sources: bool,
    pub search_notes: bool,
}

#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
    pub strategy_model: &'a str,
    pub answer_model: &'a str,
    pub final_answer_model: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewTransformation<'a> {
    pub name: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub prompt: &'a str,
    pub apply_default: bool,
}

#[derive(Debug, Serialize)]
pub struct ExecuteTransformation<'a> {
    pub transformation_id: &'a str,
    pub input_text: &'a str,
    pub model_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewPodcast<'a> {
    pub name: &'a str,
    pub content: &'a str,
    pub episode_profile: &'a str,
    pub speaker_profile: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_status_is_kept_and_not_terminal() {
        let cmd: Command = serde_json::from_value(json!({"status": "queued"})).unwrap();
        assert_eq!(cmd.status, JobStatus::Other("queued".into()));
        assert!(!cmd.status.is_terminal());
    }

    #[test]
    fn missing_status_reads_as_unknown() {
        let cmd: Command = serde_json::from_value(json!({"job_id": "command:abc"})).unwrap();
        assert_eq!(cmd.reference(), Some("command:abc"));
        assert_eq!(cmd.status.as_str(), "unknown");
        assert_eq!(cmd.progress, None);
    }

    #[test]
    fn several_reference_keys_decode_together() {
        let cmd: Command = serde_json::from_value(json!({
            "id": "command:1",
            "job_id": "command:1",
            "command_id": "command:1",
            "status": "completed"
        }))
        .unwrap();
        assert_eq!(cmd.status, JobStatus::Completed);
        assert_eq!(cmd.reference(), Some("command:1"));

        let cmd: Command =
            serde_json::from_value(json!({"command_id": "command:2", "status": "running"})).unwrap();
        assert_eq!(cmd.reference(), Some("command:2"));
    }

    #[test]
    fn empty_write_acknowledgement_decodes() {
        let ack: Created = serde_json::from_value(json!({})).unwrap();
        assert_eq!(ack, Created::default());
    }

    #[test]
    fn terminal_states() {
        for s in ["completed", "failed", "cancelled"] {
            assert!(JobStatus::parse(s).is_terminal(), "{s}");
        }
        for s in ["pending", "running", "new"] {
            assert!(!JobStatus::parse(s).is_terminal(), "{s}");
        }
        assert!(!JobStatus::Completed.is_terminal_failure());
        assert!(JobStatus::Failed.is_terminal_failure());
    }

    #[test]
    fn progress_shapes() {
        let n: Command = serde_json::from_value(json!({"status": "running", "progress": 40})).unwrap();
        assert_eq!(n.progress, Some(40.0));
        let s: Command = serde_json::from_value(json!({"progress": "55%"})).unwrap();
        assert_eq!(s.progress, Some(55.0));
        let o: Command =
            serde_json::from_value(json!({"progress": {"current": 1, "percentage": 12.5}})).unwrap();
        assert_eq!(o.progress, Some(12.5));
        let junk: Command = serde_json::from_value(json!({"progress": [1]})).unwrap();
        assert_eq!(junk.progress, None);
    }

    #[test]
    fn aliases_for_backend_field_names() {
        let nb: Notebook =
            serde_json::from_value(json!({"id": "n1", "name": "Research", "created": "2024-01-01"}))
                .unwrap();
        assert_eq!(nb.created_at.as_deref(), Some("2024-01-01"));
        let m: Model =
            serde_json::from_value(json!({"id": "m1", "provider": "openai", "name": "gpt-4o"}))
                .unwrap();
        assert_eq!(m.model_name.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn unknown_source_type_does_not_fail() {
        let src: Source = serde_json::from_value(json!({"id": "s1", "type": "youtube"})).unwrap();
        assert_eq!(src.kind, Some(SourceKind::Other));
    }

    #[test]
    fn note_body_skips_absent_fields() {
        let body = serde_json::to_value(NewNote {
            content: "hello",
            note_type: NoteType::Ai,
            title: None,
            notebook_id: Some("n1"),
        })
        .unwrap();
        assert_eq!(body, json!({"content": "hello", "note_type": "ai", "notebook_id": "n1"}));
    }
}
