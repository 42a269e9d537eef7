use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{AnswerValue, FileAttachment};
use super::flow::{FlowEngine, FlowState};
use super::repository::{
    RepositoryError, SessionId, SessionRecord, SessionRepository, SessionStatus,
};
use super::submission::{build_payload, SubmissionPayload};
use super::transmission::{SubmissionTransport, TransmissionError};
use super::validation::ValidationError;

/// Service composing the flow engine, session repository, and outbound transport.
pub struct IntakeService<R, T> {
    engine: Arc<FlowEngine>,
    repository: Arc<R>,
    transport: Arc<T>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("intake-{id:06}"))
}

/// Returned once the endpoint has accepted the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub session_id: SessionId,
    pub filename: String,
    pub fields: Vec<String>,
}

impl<R, T> IntakeService<R, T>
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    pub fn new(repository: Arc<R>, transport: Arc<T>, engine: FlowEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            repository,
            transport,
        }
    }

    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    /// Open a new session positioned on the first question.
    pub fn start(&self) -> Result<SessionRecord, IntakeServiceError> {
        let record = SessionRecord::collecting(next_session_id(), self.engine.start());
        let stored = self.repository.insert(record)?;
        info!(session = %stored.id.0, "intake session started");
        Ok(stored)
    }

    pub fn get(&self, id: &SessionId) -> Result<SessionRecord, IntakeServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Commit an answer for the current question. Rejections are stored on the session so
    /// the next view shows them.
    pub fn answer(
        &self,
        id: &SessionId,
        raw: AnswerValue,
    ) -> Result<SessionRecord, IntakeServiceError> {
        let (mut record, mut flow) = self.collecting(id)?;
        let result = self.engine.record_answer(&mut flow, raw);
        record.flow = Some(flow);
        self.repository
            .update_if(record.clone(), SessionStatus::Collecting)
            .map_err(IntakeServiceError::from_stale)?;

        result?;
        Ok(record)
    }

    pub fn attach(
        &self,
        id: &SessionId,
        file: FileAttachment,
    ) -> Result<SessionRecord, IntakeServiceError> {
        self.answer(id, AnswerValue::File(file))
    }

    pub fn back(&self, id: &SessionId) -> Result<SessionRecord, IntakeServiceError> {
        let (mut record, mut flow) = self.collecting(id)?;
        flow.go_back();
        record.flow = Some(flow);
        self.repository
            .update_if(record.clone(), SessionStatus::Collecting)
            .map_err(IntakeServiceError::from_stale)?;
        Ok(record)
    }

    /// Throw away every answer and start over. Allowed unless a submission is in flight.
    pub fn restart(&self, id: &SessionId) -> Result<SessionRecord, IntakeServiceError> {
        let current = self.get(id)?;
        if current.status == SessionStatus::Submitting {
            return Err(IntakeServiceError::AlreadySubmitting);
        }

        let record = SessionRecord::collecting(current.id.clone(), self.engine.start());
        self.repository
            .update_if(record.clone(), current.status)
            .map_err(IntakeServiceError::from_stale)?;
        info!(session = %record.id.0, "intake session restarted");
        Ok(record)
    }

    /// Forget the session entirely.
    pub fn discard(&self, id: &SessionId) -> Result<(), IntakeServiceError> {
        let current = self.get(id)?;
        if current.status == SessionStatus::Submitting {
            return Err(IntakeServiceError::AlreadySubmitting);
        }
        self.repository.remove(id)?;
        Ok(())
    }

    pub async fn submit(&self, id: &SessionId) -> Result<SubmissionReceipt, IntakeServiceError> {
        self.submit_on(id, Utc::now().date_naive()).await
    }

    /// Deliver a completed session, stamping the transmitted filename with `today`.
    ///
    /// The session is flagged `Submitting` before the request goes out; a failure flips it
    /// back to `Collecting` with the flow untouched, so a retry sends the same payload. Delivery
    /// runs on its own task and settles the session even if the caller stops waiting.
    pub async fn submit_on(
        &self,
        id: &SessionId,
        today: NaiveDate,
    ) -> Result<SubmissionReceipt, IntakeServiceError> {
        let (mut record, flow) = self.collecting(id)?;
        if !flow.is_terminal() {
            return Err(IntakeServiceError::NotTerminal {
                position: flow.position(),
                sequence_length: flow.sequence().len(),
            });
        }

        let payload = build_payload(flow.answers(), today);
        record.flow = Some(flow);
        record.status = SessionStatus::Submitting;
        self.repository
            .update_if(record.clone(), SessionStatus::Collecting)
            .map_err(IntakeServiceError::from_stale)?;
        info!(
            session = %record.id.0,
            filename = payload.resume_filename(),
            "submitting application"
        );

        let delivery = tokio::spawn(deliver(
            Arc::clone(&self.repository),
            Arc::clone(&self.transport),
            record.clone(),
            payload,
        ));
        match delivery.await {
            Ok(outcome) => outcome,
            Err(join) => {
                error!(session = %record.id.0, error = %join, "submission task aborted");
                record.status = SessionStatus::Collecting;
                self.repository
                    .update_if(record, SessionStatus::Submitting)
                    .map_err(IntakeServiceError::from_stale)?;
                Err(TransmissionError::Aborted(join.to_string()).into())
            }
        }
    }

    fn collecting(
        &self,
        id: &SessionId,
    ) -> Result<(SessionRecord, FlowState), IntakeServiceError> {
        let mut record = self.get(id)?;
        match record.status {
            SessionStatus::Collecting => {}
            SessionStatus::Submitting => return Err(IntakeServiceError::AlreadySubmitting),
            SessionStatus::Submitted => return Err(IntakeServiceError::AlreadySubmitted),
        }
        let flow = record
            .flow
            .take()
            .ok_or_else(|| RepositoryError::Unavailable(format!("session {} has no flow", id.0)))?;
        Ok((record, flow))
    }
}

async fn deliver<R, T>(
    repository: Arc<R>,
    transport: Arc<T>,
    mut record: SessionRecord,
    payload: SubmissionPayload,
) -> Result<SubmissionReceipt, IntakeServiceError>
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    if let Err(error) = transport.transmit(&payload).await {
        warn!(session = %record.id.0, %error, "application submission failed");
        record.status = SessionStatus::Collecting;
        repository
            .update_if(record, SessionStatus::Submitting)
            .map_err(IntakeServiceError::from_stale)?;
        return Err(IntakeServiceError::Transmission(error));
    }

    record.status = SessionStatus::Submitted;
    record.flow = None;
    record.submitted_filename = Some(payload.resume_filename().to_string());
    repository
        .update_if(record.clone(), SessionStatus::Submitting)
        .map_err(IntakeServiceError::from_stale)?;
    info!(session = %record.id.0, "application submitted");

    Ok(SubmissionReceipt {
        session_id: record.id,
        filename: payload.resume_filename().to_string(),
        fields: payload
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("all questions must be answered before submitting (at {position} of {sequence_length})")]
    NotTerminal {
        position: usize,
        sequence_length: usize,
    },
    #[error("a submission is already in progress")]
    AlreadySubmitting,
    #[error("this application has already been submitted")]
    AlreadySubmitted,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transmission(#[from] TransmissionError),
}

impl IntakeServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            IntakeServiceError::Validation(error) => error.code(),
            IntakeServiceError::NotTerminal { .. } => "not_terminal",
            IntakeServiceError::AlreadySubmitting => "already_submitting",
            IntakeServiceError::AlreadySubmitted => "already_submitted",
            IntakeServiceError::Repository(RepositoryError::NotFound) => "session_not_found",
            IntakeServiceError::Repository(_) => "repository_error",
            IntakeServiceError::Transmission(_) => "transmission_failed",
        }
    }

    /// A concurrent status change means another request got there first.
    fn from_stale(error: RepositoryError) -> Self {
        match error {
            RepositoryError::StaleStatus {
                found: SessionStatus::Submitting,
                ..
            } => IntakeServiceError::AlreadySubmitting,
            RepositoryError::StaleStatus {
                found: SessionStatus::Submitted,
                ..
            } => IntakeServiceError::AlreadySubmitted,
            other => IntakeServiceError::Repository(other),
        }
    }
}
