use chrono::NaiveDate;

use super::catalog::{FILENAME_FIELD, FULL_NAME_ID, RESUME_ID};
use super::domain::{AnswerMap, AnswerValue, FileAttachment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValue {
    Text(String),
    File {
        attachment: FileAttachment,
        transmitted_filename: String,
    },
}

/// One multipart field. Names repeat when more than one file is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadField {
    pub name: String,
    pub value: PayloadValue,
}

/// Write-once, transport-ready view of a completed answer map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    date_stamp: NaiveDate,
    resume_filename: String,
    fields: Vec<PayloadField>,
}

impl SubmissionPayload {
    pub fn date_stamp(&self) -> NaiveDate {
        self.date_stamp
    }

    /// Name the resume is transmitted under, e.g. `2025-11-10-Jane-Doe.pdf`.
    pub fn resume_filename(&self) -> &str {
        &self.resume_filename
    }

    pub fn fields(&self) -> &[PayloadField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&PayloadValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn attachments(&self) -> impl Iterator<Item = (&str, &FileAttachment, &str)> {
        self.fields.iter().filter_map(|field| match &field.value {
            PayloadValue::File {
                attachment,
                transmitted_filename,
            } => Some((
                field.name.as_str(),
                attachment,
                transmitted_filename.as_str(),
            )),
            PayloadValue::Text(_) => None,
        })
    }
}

pub fn build_payload(answers: &AnswerMap, today: NaiveDate) -> SubmissionPayload {
    let applicant = sanitize_applicant_name(answers.text(FULL_NAME_ID).unwrap_or_default());
    let resume_extension = answers
        .get(RESUME_ID)
        .and_then(AnswerValue::as_file)
        .map(FileAttachment::extension)
        .unwrap_or_default();
    let resume_filename = transmitted_filename(today, &applicant, &resume_extension);

    let mut fields = Vec::with_capacity(answers.len() + 1);
    for (id, value) in answers.iter() {
        match value {
            AnswerValue::Text(text) => fields.push(PayloadField {
                name: id.to_string(),
                value: PayloadValue::Text(text.clone()),
            }),
            AnswerValue::File(attachment) => {
                let filename = transmitted_filename(today, &applicant, &attachment.extension());
                fields.push(PayloadField {
                    name: FILENAME_FIELD.to_string(),
                    value: PayloadValue::Text(filename.clone()),
                });
                fields.push(PayloadField {
                    name: id.to_string(),
                    value: PayloadValue::File {
                        attachment: attachment.clone(),
                        transmitted_filename: filename,
                    },
                });
            }
        }
    }

    SubmissionPayload {
        date_stamp: today,
        resume_filename,
        fields,
    }
}

/// `{date}-{name}{extension}`; the name segment is dropped when nothing survives sanitizing.
pub fn transmitted_filename(today: NaiveDate, sanitized_name: &str, extension: &str) -> String {
    let date = today.format("%Y-%m-%d");
    if sanitized_name.is_empty() {
        format!("{date}{extension}")
    } else {
        format!("{date}-{sanitized_name}{extension}")
    }
}

/// Keep ASCII word characters and hyphens, turn whitespace runs into single hyphens, and
/// collapse repeated hyphens. No leading or trailing hyphen survives.
pub fn sanitize_applicant_name(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
