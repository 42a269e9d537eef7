use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::workflows::intake::catalog::FULL_NAME_ID;
use crate::workflows::intake::repository::{
    RepositoryError, SessionId, SessionRepository, SessionStatus,
};
use crate::workflows::intake::transmission::TransmissionError;
use crate::workflows::intake::validation::ValidationError;
use crate::workflows::intake::{FlowEngine, IntakeService, IntakeServiceError};

#[test]
fn session_ids_are_unique() {
    let (service, _) = build_service(Arc::new(RecordingTransport::default()));

    let ids: HashSet<_> = (0..25)
        .map(|_| service.start().expect("session starts").id)
        .collect();

    assert_eq!(ids.len(), 25);
    assert!(ids.iter().all(|id| id.0.starts_with("intake-")));
}

#[test]
fn rejected_answer_is_visible_on_the_next_view() {
    let (service, _) = build_service(Arc::new(RecordingTransport::default()));
    let record = service.start().expect("session starts");

    match service.answer(&record.id, "".into()) {
        Err(IntakeServiceError::Validation(ValidationError::Required)) => {}
        other => panic!("expected required error, got {other:?}"),
    }

    let view = service.get(&record.id).expect("session exists").view();
    assert_eq!(view.position, 0);
    let error = view.last_error.expect("error recorded");
    assert_eq!(error.code, "required");
    assert_eq!(error.message, "This field is required.");
}

#[test]
fn view_exposes_prefill_and_progress() {
    let (service, _) = build_service(Arc::new(RecordingTransport::default()));
    let record = service.start().expect("session starts");
    service
        .answer(&record.id, "Jane Doe".into())
        .expect("name accepted");
    let record = service.back(&record.id).expect("back works");

    let view = record.view();
    assert_eq!(view.position, 0);
    assert_eq!(view.sequence_length, 5);
    assert_eq!(
        view.current_question.map(|question| question.id),
        Some(FULL_NAME_ID)
    );
    assert_eq!(
        view.current_answer.as_ref().and_then(|answer| answer.as_text()),
        Some("Jane Doe")
    );
    assert_eq!(view.answers.len(), 1);
}

#[tokio::test]
async fn submit_requires_terminal_position() {
    let (service, _) = build_service(Arc::new(RecordingTransport::default()));
    let record = service.start().expect("session starts");

    match service.submit_on(&record.id, today()).await {
        Err(IntakeServiceError::NotTerminal {
            position,
            sequence_length,
        }) => {
            assert_eq!(position, 0);
            assert_eq!(sequence_length, 5);
        }
        other => panic!("expected not terminal, got {other:?}"),
    }
}

#[tokio::test]
async fn successful_submit_discards_flow_and_blocks_resubmission() {
    let transport = Arc::new(RecordingTransport::default());
    let (service, repository) = build_service(transport.clone());
    let id = completed_session(&service, fresher_answers());

    let receipt = service
        .submit_on(&id, today())
        .await
        .expect("submission succeeds");

    assert_eq!(receipt.session_id, id);
    assert_eq!(receipt.filename, "2025-11-10-Jane-ODoe.pdf");
    assert!(receipt.fields.iter().any(|field| field == "filename"));
    assert_eq!(transport.payloads().len(), 1);

    let stored = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, SessionStatus::Submitted);
    assert!(stored.flow.is_none());
    assert_eq!(
        stored.view().submitted_filename.as_deref(),
        Some("2025-11-10-Jane-ODoe.pdf")
    );

    match service.submit_on(&id, today()).await {
        Err(IntakeServiceError::AlreadySubmitted) => {}
        other => panic!("expected already submitted, got {other:?}"),
    }
    match service.answer(&id, "late".into()) {
        Err(IntakeServiceError::AlreadySubmitted) => {}
        other => panic!("expected already submitted, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_submit_keeps_answers_and_retry_sends_same_payload() {
    let transport = Arc::new(FlakyTransport::failing(1));
    let (service, repository) = build_service(transport.clone());
    let id = completed_session(&service, experienced_answers());

    match service.submit_on(&id, today()).await {
        Err(IntakeServiceError::Transmission(error)) => assert_eq!(
            error.user_message(),
            "Sorry, there was an error submitting your application. Please try again."
        ),
        other => panic!("expected transmission failure, got {other:?}"),
    }

    let stored = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, SessionStatus::Collecting);
    let flow = stored.flow.expect("flow retained");
    assert!(flow.is_terminal());
    assert_eq!(flow.answers().len(), 12);

    service
        .submit_on(&id, today())
        .await
        .expect("retry succeeds");

    let attempts = transport.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0], attempts[1]);
    assert_eq!(attempts[0].resume_filename(), "2025-11-10-Jane-ODoe.docx");
}

#[tokio::test]
async fn in_flight_submission_blocks_a_second_submit() {
    let transport = Arc::new(GatedTransport::default());
    let (service, _) = build_service(transport.clone());
    let service = Arc::new(service);
    let id = completed_session(&service, fresher_answers());

    let pending = tokio::spawn({
        let service = service.clone();
        let id = id.clone();
        async move { service.submit_on(&id, today()).await }
    });
    transport.entered.notified().await;

    match service.submit_on(&id, today()).await {
        Err(IntakeServiceError::AlreadySubmitting) => {}
        other => panic!("expected already submitting, got {other:?}"),
    }
    match service.restart(&id) {
        Err(IntakeServiceError::AlreadySubmitting) => {}
        other => panic!("expected already submitting, got {other:?}"),
    }
    match service.back(&id) {
        Err(IntakeServiceError::AlreadySubmitting) => {}
        other => panic!("expected already submitting, got {other:?}"),
    }
    assert_eq!(
        service.get(&id).expect("session exists").status,
        SessionStatus::Submitting
    );

    transport.release.notify_one();
    let receipt = pending
        .await
        .expect("task joins")
        .expect("first submission succeeds");
    assert_eq!(receipt.session_id, id);
}

#[tokio::test]
async fn abandoned_submission_still_settles_as_submitted() {
    let transport = Arc::new(GatedTransport::default());
    let (service, _) = build_service(transport.clone());
    let id = completed_session(&service, fresher_answers());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), service.submit_on(&id, today()));
    assert!(abandoned.await.is_err(), "caller gives up while the gate is closed");

    transport.release.notify_one();
    assert_eq!(
        settled_status(&service, &id).await,
        SessionStatus::Submitted,
    );
    match service.submit_on(&id, today()).await {
        Err(IntakeServiceError::AlreadySubmitted) => {}
        other => panic!("expected already submitted, got {other:?}"),
    }
}

#[tokio::test]
async fn abandoned_failing_submission_returns_to_collecting() {
    let transport = Arc::new(GatedTransport::failing());
    let (service, _) = build_service(transport.clone());
    let id = completed_session(&service, fresher_answers());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), service.submit_on(&id, today()));
    assert!(abandoned.await.is_err(), "caller gives up while the gate is closed");

    transport.release.notify_one();
    assert_eq!(
        settled_status(&service, &id).await,
        SessionStatus::Collecting,
    );
    let record = service.get(&id).expect("session exists");
    assert!(record.flow.expect("flow retained").is_terminal());
    service.restart(&id).expect("restart allowed after the failure");
}

#[tokio::test]
async fn crashed_transport_releases_the_submitting_flag() {
    let (service, _) = build_service(Arc::new(PanickingTransport));
    let id = completed_session(&service, fresher_answers());

    match service.submit_on(&id, today()).await {
        Err(IntakeServiceError::Transmission(TransmissionError::Aborted(_))) => {}
        other => panic!("expected aborted submission, got {other:?}"),
    }
    assert_eq!(
        service.get(&id).expect("session exists").status,
        SessionStatus::Collecting
    );
}

#[tokio::test]
async fn restart_after_submission_opens_a_fresh_flow() {
    let (service, _) = build_service(Arc::new(RecordingTransport::default()));
    let id = completed_session(&service, fresher_answers());
    service
        .submit_on(&id, today())
        .await
        .expect("submission succeeds");

    let record = service.restart(&id).expect("restart allowed");

    assert_eq!(record.id, id);
    assert_eq!(record.status, SessionStatus::Collecting);
    let view = record.view();
    assert_eq!(view.position, 0);
    assert!(view.answers.is_empty());
    assert!(view.submitted_filename.is_none());
}

#[test]
fn discard_forgets_the_session() {
    let (service, _) = build_service(Arc::new(RecordingTransport::default()));
    let record = service.start().expect("session starts");

    service.discard(&record.id).expect("discard works");

    match service.get(&record.id) {
        Err(IntakeServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn get_propagates_repository_failures() {
    let service = IntakeService::new(
        Arc::new(UnavailableRepository),
        Arc::new(RecordingTransport::default()),
        FlowEngine::standard(),
    );

    match service.get(&SessionId("intake-000001".to_string())) {
        Err(IntakeServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected unavailable repository, got {other:?}"),
    }
    match service.start() {
        Err(error) => assert_eq!(error.code(), "repository_error"),
        Ok(record) => panic!("expected failure, got {record:?}"),
    }
}
