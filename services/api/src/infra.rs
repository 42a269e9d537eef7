use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use applicant_intake::workflows::intake::{
    PayloadValue, RepositoryError, SessionId, SessionRecord, SessionRepository, SessionStatus,
    SubmissionPayload, SubmissionTransport, TransmissionError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for InMemorySessionRepository {
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
        match guard.get(&record.id) {
            Some(current) if current.status == expected => {
                guard.insert(record.id.clone(), record);
                Ok(())
            }
            Some(current) => Err(RepositoryError::StaleStatus {
                expected,
                found: current.status,
            }),
            None => Err(RepositoryError::NotFound),
        }
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

/// Logs the payload instead of sending it. Used by the demo unless `--transmit` is given.
#[derive(Default, Clone)]
pub(crate) struct DryRunTransport {
    delivered: Arc<Mutex<Vec<SubmissionPayload>>>,
}

impl DryRunTransport {
    pub(crate) fn delivered(&self) -> Vec<SubmissionPayload> {
        self.delivered
            .lock()
            .expect("transport mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl SubmissionTransport for DryRunTransport {
    async fn transmit(&self, payload: &SubmissionPayload) -> Result<(), TransmissionError> {
        let attachments = payload
            .fields()
            .iter()
            .filter(|field| matches!(field.value, PayloadValue::File { .. }))
            .count();
        info!(
            filename = payload.resume_filename(),
            fields = payload.fields().len(),
            attachments,
            "dry run: payload not transmitted"
        );
        self.delivered
            .lock()
            .expect("transport mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
