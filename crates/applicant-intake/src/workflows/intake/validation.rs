use mime::Mime;
use regex::Regex;

use super::catalog::{PHOTO_ID, RESUME_ID};
use super::domain::{AnswerValue, FileAttachment, Question, QuestionKind};

/// Upload cap applied to every file answer (2 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

/// Ten digits, optionally preceded by the +91 country code and a hyphen or space.
pub const DEFAULT_PHONE_PATTERN: &str = r"^(\+91[-\s]?)?[0-9]{10}$";

/// Printable ASCII other than `@` on both sides of the `@`, with a dot in the domain.
const EMAIL_PATTERN: &str = r"^[\x21-\x3F\x41-\x7E]+@[\x21-\x3F\x41-\x7E]+\.[\x21-\x3F\x41-\x7E]+$";
const URL_PATTERN: &str = r"^(https?://)?(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&/=]*)$";

const MSWORD: &str = "application/msword";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Rejection reasons surfaced next to the field. Messages are shown to applicants as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Please enter a valid 10-digit phone number.")]
    InvalidPhone,
    #[error("Please enter a valid URL.")]
    InvalidUrl,
    #[error("Please choose one of the offered options.")]
    UnknownChoice { choice: String },
    #[error("File is too large. Maximum size is {}MB.", .max / (1024 * 1024))]
    FileTooLarge { size: u64, max: u64 },
    #[error("Invalid file type. Please upload a JPG, PNG, or GIF image.")]
    InvalidImageType { mime_type: String },
    #[error("Invalid file type. Please upload a PDF or DOC file.")]
    InvalidDocumentType { mime_type: String },
    #[error("Please upload a file.")]
    ExpectedFile,
    #[error("This question expects a typed answer, not a file.")]
    UnexpectedFile,
    #[error("There is no question left to answer.")]
    NoActiveQuestion,
}

impl ValidationError {
    pub const fn code(&self) -> &'static str {
        match self {
            ValidationError::Required => "required",
            ValidationError::InvalidEmail => "invalid_email",
            ValidationError::InvalidPhone => "invalid_phone",
            ValidationError::InvalidUrl => "invalid_url",
            ValidationError::UnknownChoice { .. } => "unknown_choice",
            ValidationError::FileTooLarge { .. } => "file_too_large",
            ValidationError::InvalidImageType { .. } => "invalid_image_type",
            ValidationError::InvalidDocumentType { .. } => "invalid_document_type",
            ValidationError::ExpectedFile => "expected_file",
            ValidationError::UnexpectedFile => "unexpected_file",
            ValidationError::NoActiveQuestion => "no_active_question",
        }
    }
}

/// Pattern set behind the format rules. The phone rule is regional and can be swapped.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    email: Regex,
    phone: Regex,
    url: Regex,
    max_file_bytes: u64,
}

impl ValidationPolicy {
    pub fn standard() -> Self {
        Self {
            email: Regex::new(EMAIL_PATTERN).expect("email pattern compiles"),
            phone: Regex::new(DEFAULT_PHONE_PATTERN).expect("phone pattern compiles"),
            url: Regex::new(URL_PATTERN).expect("url pattern compiles"),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_phone_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.phone = Regex::new(pattern)?;
        Ok(self)
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    pub fn is_valid_email(&self, value: &str) -> bool {
        self.email.is_match(value)
    }

    pub fn is_valid_phone(&self, value: &str) -> bool {
        self.phone.is_match(value)
    }

    pub fn is_valid_url(&self, value: &str) -> bool {
        self.url.is_match(value)
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Pure per-question validation. Never touches stored answers.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Check `raw` against the question and return the value to store.
    pub fn validate(
        &self,
        question: &Question,
        raw: AnswerValue,
    ) -> Result<AnswerValue, ValidationError> {
        match raw {
            AnswerValue::Text(text) => self.validate_text(question, text),
            AnswerValue::File(file) => self.validate_file(question, file),
        }
    }

    fn validate_text(
        &self,
        question: &Question,
        text: String,
    ) -> Result<AnswerValue, ValidationError> {
        let mut value = if question.kind.is_single_line() {
            text.trim().to_string()
        } else {
            text
        };

        if value.trim().is_empty() {
            return if question.is_optional {
                Ok(AnswerValue::Text(String::new()))
            } else {
                Err(ValidationError::Required)
            };
        }

        match question.kind {
            QuestionKind::File => return Err(ValidationError::ExpectedFile),
            QuestionKind::Email if !self.policy.is_valid_email(&value) => {
                return Err(ValidationError::InvalidEmail)
            }
            QuestionKind::Tel if !self.policy.is_valid_phone(&value) => {
                return Err(ValidationError::InvalidPhone)
            }
            QuestionKind::Url if !self.policy.is_valid_url(&value) => {
                return Err(ValidationError::InvalidUrl)
            }
            QuestionKind::Radio
                if !question.choices.is_empty() && !question.choices.contains(&value.as_str()) =>
            {
                return Err(ValidationError::UnknownChoice { choice: value })
            }
            QuestionKind::Textarea => {
                if let Some(max_length) = question.max_length {
                    if value.chars().count() > max_length {
                        value = value.chars().take(max_length).collect();
                    }
                }
            }
            _ => {}
        }

        Ok(AnswerValue::Text(value))
    }

    fn validate_file(
        &self,
        question: &Question,
        file: FileAttachment,
    ) -> Result<AnswerValue, ValidationError> {
        if question.kind != QuestionKind::File {
            return Err(ValidationError::UnexpectedFile);
        }

        let max = self.policy.max_file_bytes;
        if file.size > max {
            return Err(ValidationError::FileTooLarge {
                size: file.size,
                max,
            });
        }

        match question.id {
            PHOTO_ID if !is_accepted_image(&file.mime_type) => {
                Err(ValidationError::InvalidImageType {
                    mime_type: file.mime_type,
                })
            }
            RESUME_ID if !is_accepted_document(&file.mime_type) => {
                Err(ValidationError::InvalidDocumentType {
                    mime_type: file.mime_type,
                })
            }
            _ => Ok(AnswerValue::File(file)),
        }
    }
}

fn essence(declared: &str) -> Option<Mime> {
    declared.trim().parse::<Mime>().ok()
}

fn is_accepted_image(declared: &str) -> bool {
    essence(declared).is_some_and(|parsed| {
        [mime::IMAGE_JPEG, mime::IMAGE_PNG, mime::IMAGE_GIF]
            .iter()
            .any(|accepted| accepted.essence_str() == parsed.essence_str())
    })
}

fn is_accepted_document(declared: &str) -> bool {
    essence(declared).is_some_and(|parsed| {
        let essence = parsed.essence_str();
        essence == mime::APPLICATION_PDF.essence_str() || essence == MSWORD || essence == DOCX
    })
}
