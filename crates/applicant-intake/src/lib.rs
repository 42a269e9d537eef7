//! Conversational job-applicant intake: a question catalog, per-answer validation, a
//! branching flow engine, and multipart delivery of the completed application.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
