//! Applicant intake flow.
//!
//! A [`QuestionCatalog`] supplies grouped questions, the [`FlowEngine`] walks an applicant
//! through them one at a time (splicing in a track once the branch selector is answered),
//! and [`IntakeService`] persists sessions and hands completed answers to a
//! [`SubmissionTransport`].

pub mod catalog;
pub mod domain;
pub mod flow;
pub mod repository;
pub mod router;
pub mod service;
pub mod submission;
pub mod transmission;
pub mod validation;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, CatalogGroup, QuestionCatalog};
pub use domain::{
    AnswerMap, AnswerValue, ApplicantTrack, FileAttachment, FileContent, Question, QuestionKind,
};
pub use flow::{expand, AnswerOutcome, FlowEngine, FlowProgress, FlowState};
pub use repository::{
    ErrorView, PresentationView, RepositoryError, SessionId, SessionRecord, SessionRepository,
    SessionStatus,
};
pub use router::intake_router;
pub use service::{IntakeService, IntakeServiceError, SubmissionReceipt};
pub use submission::{
    build_payload, sanitize_applicant_name, PayloadField, PayloadValue, SubmissionPayload,
};
pub use transmission::{HttpTransport, SubmissionTransport, TransmissionError};
pub use validation::{ValidationError, ValidationPolicy, Validator};
