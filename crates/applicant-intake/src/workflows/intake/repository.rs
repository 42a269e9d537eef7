use serde::{Deserialize, Serialize};

use super::domain::{AnswerMap, AnswerValue, Question};
use super::flow::FlowState;
use super::validation::ValidationError;

/// Identifier wrapper for intake sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Lifecycle of a session. `Submitting` is the in-flight guard blocking a second submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Collecting,
    Submitting,
    Submitted,
}

/// Repository record. The flow is dropped once the application has been delivered.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub status: SessionStatus,
    pub flow: Option<FlowState>,
    pub submitted_filename: Option<String>,
}

impl SessionRecord {
    pub fn collecting(id: SessionId, flow: FlowState) -> Self {
        Self {
            id,
            status: SessionStatus::Collecting,
            flow: Some(flow),
            submitted_filename: None,
        }
    }

    pub fn view(&self) -> PresentationView {
        let flow = self.flow.as_ref();
        let progress = flow.map(FlowState::progress);
        PresentationView {
            session_id: self.id.clone(),
            status: self.status,
            current_question: flow.and_then(FlowState::current_question).cloned(),
            position: progress.map_or(0, |progress| progress.position),
            sequence_length: progress.map_or(0, |progress| progress.sequence_length),
            current_answer: flow.and_then(FlowState::current_answer).cloned(),
            last_error: flow.and_then(FlowState::last_error).map(ErrorView::from),
            answers: flow.map(|flow| flow.answers().clone()).unwrap_or_default(),
            submitted_filename: self.submitted_filename.clone(),
        }
    }
}

/// Everything a rendering adapter needs: the question to show, progress, the stored answer
/// for pre-fill, the last rejection, and the answers for the live preview.
#[derive(Debug, Clone, Serialize)]
pub struct PresentationView {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub current_question: Option<Question>,
    pub position: usize,
    pub sequence_length: usize,
    pub current_answer: Option<AnswerValue>,
    pub last_error: Option<ErrorView>,
    pub answers: AnswerMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub code: &'static str,
    pub message: String,
}

impl From<&ValidationError> for ErrorView {
    fn from(error: &ValidationError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
    /// Replace the stored record only while its status is still `expected`.
    fn update_if(
        &self,
        record: SessionRecord,
        expected: SessionStatus,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
    fn remove(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed status (expected {expected:?}, found {found:?})")]
    StaleStatus {
        expected: SessionStatus,
        found: SessionStatus,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
