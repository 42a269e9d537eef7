use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::intake::domain::{AnswerValue, FileAttachment};
use crate::workflows::intake::flow::{FlowEngine, FlowState};
use crate::workflows::intake::repository::{
    RepositoryError, SessionId, SessionRecord, SessionRepository, SessionStatus,
};
use crate::workflows::intake::submission::SubmissionPayload;
use crate::workflows::intake::transmission::{SubmissionTransport, TransmissionError};
use crate::workflows::intake::{intake_router, IntakeService};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 10).expect("valid date")
}

pub(super) fn resume(name: &str, size: usize) -> FileAttachment {
    FileAttachment::from_bytes(name, "application/pdf", vec![b'%'; size])
}

pub(super) fn docx_resume(name: &str, size: usize) -> FileAttachment {
    FileAttachment::from_bytes(
        name,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        vec![0u8; size],
    )
}

/// Answers up to and including the selector.
pub(super) fn base_answers(track: &str) -> Vec<AnswerValue> {
    [
        "Jane  O'Doe!!",
        "jane.doe@example.com",
        "+91 9876543210",
        "",
        track,
    ]
    .map(AnswerValue::from)
    .to_vec()
}

pub(super) fn fresher_answers() -> Vec<AnswerValue> {
    let mut answers = base_answers("Fresher");
    answers.extend(
        [
            "Distributed systems",
            "2024",
            "Built a retrieval demo over course notes.",
            "Bengaluru",
            "Curious and persistent.",
        ]
        .map(AnswerValue::from),
    );
    answers.push(resume("cv.pdf", 1024).into());
    answers
}

pub(super) fn experienced_answers() -> Vec<AnswerValue> {
    let mut answers = base_answers("Experienced");
    answers.extend(
        [
            "6 years",
            "30 days",
            "18 LPA",
            "24 LPA",
            "Pune",
            "Led the payments platform team.",
        ]
        .map(AnswerValue::from),
    );
    answers.push(docx_resume("resume.docx", 2048).into());
    answers
}

pub(super) fn answer_all(engine: &FlowEngine, state: &mut FlowState, answers: Vec<AnswerValue>) {
    for answer in answers {
        engine
            .record_answer(state, answer)
            .expect("scripted answer is valid");
    }
}

pub(super) fn build_service<T>(
    transport: Arc<T>,
) -> (IntakeService<MemoryRepository, T>, Arc<MemoryRepository>)
where
    T: SubmissionTransport + 'static,
{
    let repository = Arc::new(MemoryRepository::default());
    let service = IntakeService::new(repository.clone(), transport, FlowEngine::standard());
    (service, repository)
}

/// Drive a fresh session to the terminal position.
pub(super) fn completed_session<T>(
    service: &IntakeService<MemoryRepository, T>,
    answers: Vec<AnswerValue>,
) -> SessionId
where
    T: SubmissionTransport + 'static,
{
    let record = service.start().expect("session starts");
    for answer in answers {
        service
            .answer(&record.id, answer)
            .expect("scripted answer is valid");
    }
    record.id
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_if(
        &self,
        record: SessionRecord,
        expected: SessionStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if current.status != expected {
            return Err(RepositoryError::StaleStatus {
                expected,
                found: current.status,
            });
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn update_if(
        &self,
        _record: SessionRecord,
        _expected: SessionStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

/// Accepts every payload and remembers it.
#[derive(Default)]
pub(super) struct RecordingTransport {
    payloads: Mutex<Vec<SubmissionPayload>>,
}

impl RecordingTransport {
    pub(super) fn payloads(&self) -> Vec<SubmissionPayload> {
        self.payloads.lock().expect("transport mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionTransport for RecordingTransport {
    async fn transmit(&self, payload: &SubmissionPayload) -> Result<(), TransmissionError> {
        self.payloads
            .lock()
            .expect("transport mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

/// Fails the first `failures` attempts with a network error, then accepts.
pub(super) struct FlakyTransport {
    remaining_failures: AtomicUsize,
    attempts: Mutex<Vec<SubmissionPayload>>,
}

impl FlakyTransport {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn attempts(&self) -> Vec<SubmissionPayload> {
        self.attempts.lock().expect("transport mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionTransport for FlakyTransport {
    async fn transmit(&self, payload: &SubmissionPayload) -> Result<(), TransmissionError> {
        self.attempts
            .lock()
            .expect("transport mutex poisoned")
            .push(payload.clone());
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            Err(TransmissionError::Network("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Holds every transmission until released so in-flight behavior can be observed.
#[derive(Default)]
pub(super) struct GatedTransport {
    pub(super) entered: Notify,
    pub(super) release: Notify,
    fail: bool,
}

impl GatedTransport {
    /// Gate that reports a network failure once released.
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SubmissionTransport for GatedTransport {
    async fn transmit(&self, _payload: &SubmissionPayload) -> Result<(), TransmissionError> {
        self.entered.notify_one();
        self.release.notified().await;
        if self.fail {
            Err(TransmissionError::Network("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Blows up mid-delivery.
pub(super) struct PanickingTransport;

#[async_trait]
impl SubmissionTransport for PanickingTransport {
    async fn transmit(&self, _payload: &SubmissionPayload) -> Result<(), TransmissionError> {
        panic!("transport crashed")
    }
}

/// Wait until the session leaves `Submitting`.
pub(super) async fn settled_status<T>(
    service: &IntakeService<MemoryRepository, T>,
    id: &SessionId,
) -> SessionStatus
where
    T: SubmissionTransport + 'static,
{
    for _ in 0..200 {
        let status = service.get(id).expect("session exists").status;
        if status != SessionStatus::Submitting {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never left Submitting")
}

pub(super) fn router_with_service<T>(service: IntakeService<MemoryRepository, T>) -> axum::Router
where
    T: SubmissionTransport + 'static,
{
    intake_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
