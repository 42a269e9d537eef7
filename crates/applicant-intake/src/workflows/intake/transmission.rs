use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

use super::submission::{PayloadValue, SubmissionPayload};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const RETRY_MESSAGE: &str =
    "Sorry, there was an error submitting your application. Please try again.";

/// Failures delivering a payload. All of them leave the flow untouched so the applicant can
/// resubmit.
#[derive(Debug, thiserror::Error)]
pub enum TransmissionError {
    #[error("submission endpoint unreachable: {0}")]
    Network(String),
    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
    #[error("attachment '{name}' could not be read: {source}")]
    Attachment {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("attachment '{name}' declares an unusable MIME type '{mime_type}'")]
    AttachmentType { name: String, mime_type: String },
    #[error("submission was interrupted before it settled: {0}")]
    Aborted(String),
}

impl TransmissionError {
    /// Message shown to the applicant instead of the internal error.
    pub fn user_message(&self) -> &'static str {
        RETRY_MESSAGE
    }
}

/// Outbound delivery of a completed application.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn transmit(&self, payload: &SubmissionPayload) -> Result<(), TransmissionError>;
}

/// POSTs the payload as `multipart/form-data`. Any HTTP response counts as delivered.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    async fn transmit(&self, payload: &SubmissionPayload) -> Result<(), TransmissionError> {
        let form = multipart_form(payload).await?;

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransmissionError::Timeout(self.timeout)
                } else {
                    TransmissionError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            info!(%status, filename = payload.resume_filename(), "application delivered");
        } else {
            warn!(
                %status,
                endpoint = %self.endpoint,
                "intake endpoint answered with a non-success status"
            );
        }

        Ok(())
    }
}

/// Build the multipart body, reading attachment content only now.
pub async fn multipart_form(payload: &SubmissionPayload) -> Result<Form, TransmissionError> {
    let mut form = Form::new();
    for field in payload.fields() {
        form = match &field.value {
            PayloadValue::Text(text) => form.text(field.name.clone(), text.clone()),
            PayloadValue::File {
                attachment,
                transmitted_filename,
            } => {
                let bytes =
                    attachment
                        .read_content()
                        .await
                        .map_err(|source| TransmissionError::Attachment {
                            name: attachment.name.clone(),
                            source,
                        })?;
                let part = Part::bytes(bytes)
                    .file_name(transmitted_filename.clone())
                    .mime_str(&attachment.mime_type)
                    .map_err(|_| TransmissionError::AttachmentType {
                        name: attachment.name.clone(),
                        mime_type: attachment.mime_type.clone(),
                    })?;
                form.part(field.name.clone(), part)
            }
        };
    }
    Ok(form)
}
