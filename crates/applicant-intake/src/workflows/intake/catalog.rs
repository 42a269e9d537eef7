use std::collections::HashSet;

use serde::Serialize;

use super::domain::{ApplicantTrack, Question, QuestionKind};

pub const FULL_NAME_ID: &str = "fullName";
pub const APPLICANT_TYPE_ID: &str = "applicantType";
pub const RESUME_ID: &str = "resume";
/// Photo uploads are validated but the question is not offered in any group.
pub const PHOTO_ID: &str = "photo";
/// Payload field carrying the transmitted filename; no question may use it as an id.
pub const FILENAME_FIELD: &str = "filename";

const TRACK_CHOICES: &[&str] = &["Experienced", "Fresher"];

/// Ordered question groups making up the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogGroup {
    Base,
    Selector,
    Experienced,
    Fresher,
    Common,
    Final,
}

impl CatalogGroup {
    pub const ALL: [CatalogGroup; 6] = [
        CatalogGroup::Base,
        CatalogGroup::Selector,
        CatalogGroup::Experienced,
        CatalogGroup::Fresher,
        CatalogGroup::Common,
        CatalogGroup::Final,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CatalogGroup::Base => "Base",
            CatalogGroup::Selector => "Applicant type",
            CatalogGroup::Experienced => "Experienced track",
            CatalogGroup::Fresher => "Fresher track",
            CatalogGroup::Common => "Common",
            CatalogGroup::Final => "Final",
        }
    }
}

/// Catalog construction failures. These are programming errors, never user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("question id '{0}' is defined more than once")]
    DuplicateId(&'static str),
    #[error("question id '{0}' collides with a reserved payload field")]
    ReservedId(&'static str),
    #[error("branch selector '{id}' must offer the choices Experienced and Fresher")]
    SelectorChoices { id: &'static str },
}

/// Read-only provider of the six question groups.
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    base: Vec<Question>,
    selector: Question,
    experienced: Vec<Question>,
    fresher: Vec<Question>,
    common: Vec<Question>,
    final_questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn new(
        base: Vec<Question>,
        selector: Question,
        experienced: Vec<Question>,
        fresher: Vec<Question>,
        common: Vec<Question>,
        final_questions: Vec<Question>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            base,
            selector,
            experienced,
            fresher,
            common,
            final_questions,
        };
        catalog.check_invariants()?;
        Ok(catalog)
    }

    pub fn standard() -> Self {
        Self::new(
            standard_base_questions(),
            standard_selector_question(),
            standard_experienced_questions(),
            standard_fresher_questions(),
            standard_common_questions(),
            standard_final_questions(),
        )
        .expect("standard catalog ids are unique")
    }

    pub fn group(&self, group: CatalogGroup) -> &[Question] {
        match group {
            CatalogGroup::Base => &self.base,
            CatalogGroup::Selector => std::slice::from_ref(&self.selector),
            CatalogGroup::Experienced => &self.experienced,
            CatalogGroup::Fresher => &self.fresher,
            CatalogGroup::Common => &self.common,
            CatalogGroup::Final => &self.final_questions,
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = (CatalogGroup, &[Question])> {
        CatalogGroup::ALL
            .into_iter()
            .map(move |group| (group, self.group(group)))
    }

    pub fn selector(&self) -> &Question {
        &self.selector
    }

    pub fn track(&self, track: ApplicantTrack) -> &[Question] {
        match track {
            ApplicantTrack::Experienced => &self.experienced,
            ApplicantTrack::Fresher => &self.fresher,
        }
    }

    /// Sequence shown before the applicant type is known: base questions then the selector.
    pub fn initial_sequence(&self) -> Vec<Question> {
        self.base
            .iter()
            .chain(std::iter::once(&self.selector))
            .cloned()
            .collect()
    }

    /// Questions appended after the selector once a track is chosen.
    pub fn branch_tail(&self, track: ApplicantTrack) -> impl Iterator<Item = &Question> {
        self.track(track)
            .iter()
            .chain(self.common.iter())
            .chain(self.final_questions.iter())
    }

    pub fn all_questions(&self) -> impl Iterator<Item = &Question> {
        self.groups().flat_map(|(_, questions)| questions.iter())
    }

    pub fn find(&self, id: &str) -> Option<&Question> {
        self.all_questions().find(|question| question.id == id)
    }

    fn check_invariants(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for question in self.all_questions() {
            if question.id == FILENAME_FIELD {
                return Err(CatalogError::ReservedId(question.id));
            }
            if !seen.insert(question.id) {
                return Err(CatalogError::DuplicateId(question.id));
            }
        }

        let offers_every_track = [ApplicantTrack::Experienced, ApplicantTrack::Fresher]
            .into_iter()
            .all(|track| self.selector.choices.contains(&track.label()));
        let only_tracks = self
            .selector
            .choices
            .iter()
            .all(|choice| ApplicantTrack::from_choice(choice).is_some());
        if self.selector.kind != QuestionKind::Radio || !offers_every_track || !only_tracks {
            return Err(CatalogError::SelectorChoices {
                id: self.selector.id,
            });
        }

        Ok(())
    }
}

impl Default for QuestionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_base_questions() -> Vec<Question> {
    vec![
        Question::new(
            FULL_NAME_ID,
            QuestionKind::Text,
            "Let's start with your full name.",
            "e.g., Jane Doe",
        ),
        Question::new(
            "email",
            QuestionKind::Email,
            "Great! What is your email address?",
            "e.g., jane.doe@example.com",
        ),
        Question::new(
            "phone",
            QuestionKind::Tel,
            "And a phone number we can reach you at?",
            "e.g., +91 98765 43210",
        ),
        Question::new(
            "portfolio",
            QuestionKind::Url,
            "Share your LinkedIn profile URL. (optional)",
            "e.g., https://linkedin.com/in/jane-doe",
        )
        .optional(),
    ]
}

fn standard_selector_question() -> Question {
    Question::new(
        APPLICANT_TYPE_ID,
        QuestionKind::Radio,
        "Are you an experienced professional or a fresher?",
        "",
    )
    .with_choices(TRACK_CHOICES)
}

fn standard_experienced_questions() -> Vec<Question> {
    vec![
        Question::new(
            "yearOfExperience",
            QuestionKind::Text,
            "What is your years of experience?",
            "e.g., 5 years",
        ),
        Question::new(
            "noticePeriod",
            QuestionKind::Text,
            "What is your notice period?",
            "e.g., 30 days, Immediately available",
        ),
        Question::new(
            "currentCTC",
            QuestionKind::Text,
            "What is your current CTC (Cost To Company)?",
            "e.g., 10 LPA",
        ),
        Question::new(
            "expectedCTC",
            QuestionKind::Text,
            "And what is your expected CTC?",
            "e.g., 15 LPA",
        ),
    ]
}

fn standard_fresher_questions() -> Vec<Question> {
    vec![
        Question::new(
            "learningInterests",
            QuestionKind::Textarea,
            "What are your work-related learning interests?",
            "e.g., Web development, Machine learning...",
        ),
        Question::new(
            "graduationYear",
            QuestionKind::Number,
            "When did you complete your college degree?",
            "e.g., 2024",
        ),
        Question::new(
            "aiKnowledge",
            QuestionKind::Textarea,
            "Tell us about your AI knowledge and experience.",
            "e.g., I have a basic understanding of AI and its applications.",
        )
        .with_max_length(500),
    ]
}

fn standard_common_questions() -> Vec<Question> {
    vec![Question::new(
        "city",
        QuestionKind::Text,
        "Which city do you live in?",
        "e.g., Bengaluru",
    )]
}

fn standard_final_questions() -> Vec<Question> {
    vec![
        Question::new(
            "bio",
            QuestionKind::Textarea,
            "Tell us a bit about yourself. What makes you a great fit?",
            "Describe your skills, experience, and passion...",
        )
        .with_max_length(500),
        Question::new(
            RESUME_ID,
            QuestionKind::File,
            "Please upload your resume.",
            "Upload Resume (PDF, DOC)",
        ),
    ]
}
