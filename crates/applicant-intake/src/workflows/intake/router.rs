use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AnswerValue, FileAttachment};
use super::repository::{
    PresentationView, RepositoryError, SessionId, SessionRecord, SessionRepository,
};
use super::service::{IntakeService, IntakeServiceError};
use super::transmission::SubmissionTransport;

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Request bodies may exceed the upload cap so oversize files reach the validator and get a
/// proper rejection instead of a bare 413.
pub const MAX_REQUEST_BYTES: usize = 8 * 1024 * 1024;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub value: String,
}

/// Router builder exposing the conversational intake flow over HTTP.
pub fn intake_router<R, T>(service: Arc<IntakeService<R, T>>) -> Router
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    Router::new()
        .route("/api/v1/intake/questions", get(questions_handler::<R, T>))
        .route("/api/v1/intake/sessions", post(start_handler::<R, T>))
        .route(
            "/api/v1/intake/sessions/:session_id",
            get(view_handler::<R, T>).delete(discard_handler::<R, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/answers",
            post(answer_handler::<R, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/attachments",
            post(attachment_handler::<R, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/back",
            post(back_handler::<R, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/restart",
            post(restart_handler::<R, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/submit",
            post(submit_handler::<R, T>),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(service)
}

pub(crate) async fn questions_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    let groups: Vec<_> = service
        .engine()
        .catalog()
        .groups()
        .map(|(group, questions)| {
            json!({
                "group": group,
                "label": group.label(),
                "questions": questions,
            })
        })
        .collect();
    (StatusCode::OK, axum::Json(json!({ "groups": groups }))).into_response()
}

pub(crate) async fn start_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    match service.start() {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(error) => error_response(error, None),
    }
}

pub(crate) async fn view_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    let id = SessionId(session_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => error_response(error, None),
    }
}

pub(crate) async fn answer_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    let id = SessionId(session_id);
    let result = service.answer(&id, AnswerValue::Text(request.value));
    session_response(&service, &id, result)
}

pub(crate) async fn attachment_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    let id = SessionId(session_id);
    let result = match read_file_field(&mut multipart).await {
        Ok(Some(file)) => service.attach(&id, file),
        // an empty upload still goes through validation so required files are reported
        Ok(None) => service.answer(&id, AnswerValue::Text(String::new())),
        Err(error) => return error.into_response(),
    };
    session_response(&service, &id, result)
}

pub(crate) async fn back_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    let id = SessionId(session_id);
    let result = service.back(&id);
    session_response(&service, &id, result)
}

pub(crate) async fn restart_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    let id = SessionId(session_id);
    let result = service.restart(&id);
    session_response(&service, &id, result)
}

pub(crate) async fn discard_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    match service.discard(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error, None),
    }
}

pub(crate) async fn submit_handler<R, T>(
    State(service): State<Arc<IntakeService<R, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    let id = SessionId(session_id);
    match service.submit(&id).await {
        Ok(receipt) => (StatusCode::ACCEPTED, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error, None),
    }
}

fn session_response<R, T>(
    service: &IntakeService<R, T>,
    id: &SessionId,
    result: Result<SessionRecord, IntakeServiceError>,
) -> Response
where
    R: SessionRepository + 'static,
    T: SubmissionTransport + 'static,
{
    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error @ IntakeServiceError::Validation(_)) => {
            let view = service.get(id).ok().map(|record| record.view());
            error_response(error, view)
        }
        Err(error) => error_response(error, None),
    }
}

fn error_response(error: IntakeServiceError, session: Option<PresentationView>) -> Response {
    let status = match &error {
        IntakeServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IntakeServiceError::NotTerminal { .. }
        | IntakeServiceError::AlreadySubmitting
        | IntakeServiceError::AlreadySubmitted
        | IntakeServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        IntakeServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        IntakeServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        IntakeServiceError::Transmission(_) => StatusCode::BAD_GATEWAY,
    };
    let message = match &error {
        IntakeServiceError::Transmission(transmission) => transmission.user_message().to_string(),
        other => other.to_string(),
    };

    let mut payload = json!({
        "error": message,
        "code": error.code(),
    });
    if let Some(view) = session {
        payload["session"] = json!(view);
    }
    (status, axum::Json(payload)).into_response()
}

async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<FileAttachment>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let bytes = field.bytes().await?;
        if name.is_empty() && bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(FileAttachment::from_bytes(
            name,
            mime_type,
            bytes.to_vec(),
        )));
    }
    Ok(None)
}
