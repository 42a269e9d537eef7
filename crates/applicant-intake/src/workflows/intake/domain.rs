use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Input family of a question; selects which validation rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Text,
    Email,
    Textarea,
    File,
    Tel,
    Url,
    Radio,
    Number,
}

impl QuestionKind {
    /// Single-line inputs are trimmed before they are stored.
    pub const fn is_single_line(self) -> bool {
        !matches!(self, QuestionKind::Textarea | QuestionKind::File)
    }
}

/// Field definition from the question catalog. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: QuestionKind,
    pub placeholder: &'static str,
    pub is_optional: bool,
    #[serde(skip_serializing_if = "has_no_choices")]
    pub choices: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

fn has_no_choices(choices: &&'static [&'static str]) -> bool {
    choices.is_empty()
}

impl Question {
    pub fn new(
        id: &'static str,
        kind: QuestionKind,
        label: &'static str,
        placeholder: &'static str,
    ) -> Self {
        Self {
            id,
            label,
            kind,
            placeholder,
            is_optional: false,
            choices: &[],
            max_length: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn with_choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Handle to the bytes of an uploaded file. Path-backed content is only read when the
/// payload is transmitted.
#[derive(Clone, PartialEq, Eq)]
pub enum FileContent {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileContent::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            FileContent::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Opaque binary attachment: original name, declared MIME type, size, and content handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAttachment {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(skip)]
    content: FileContent,
}

impl FileAttachment {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            content: FileContent::Memory(bytes),
        }
    }

    pub fn from_path(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            content: FileContent::Path(path.into()),
        }
    }

    pub fn content(&self) -> &FileContent {
        &self.content
    }

    /// Extension of the original file name including the leading dot, or empty.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(OsStr::to_str)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }

    pub async fn read_content(&self) -> std::io::Result<Vec<u8>> {
        match &self.content {
            FileContent::Memory(bytes) => Ok(bytes.to_vec()),
            FileContent::Path(path) => tokio::fs::read(path).await,
        }
    }
}

/// Stored answer for a single question. Numbers travel as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    File(FileAttachment),
}

impl AnswerValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            AnswerValue::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileAttachment> {
        match self {
            AnswerValue::File(file) => Some(file),
            AnswerValue::Text(_) => None,
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<FileAttachment> for AnswerValue {
    fn from(value: FileAttachment) -> Self {
        AnswerValue::File(value)
    }
}

/// Answers keyed by question id. Iteration order is sorted by id so payloads are
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerMap {
    entries: BTreeMap<String, AnswerValue>,
}

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&AnswerValue> {
        self.entries.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(AnswerValue::as_text)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Store an answer, returning the value it replaced.
    pub fn insert(&mut self, id: &str, value: AnswerValue) -> Option<AnswerValue> {
        self.entries.insert(id.to_string(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AnswerValue)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (K, AnswerValue)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(id, value)| (id.into(), value))
                .collect(),
        }
    }
}

/// Category chosen at the branch selector; picks which track is spliced into the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicantTrack {
    Experienced,
    Fresher,
}

impl ApplicantTrack {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantTrack::Experienced => "Experienced",
            ApplicantTrack::Fresher => "Fresher",
        }
    }

    /// Parse the literal carried by the selector's choice buttons.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "Experienced" => Some(ApplicantTrack::Experienced),
            "Fresher" => Some(ApplicantTrack::Fresher),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicantTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
