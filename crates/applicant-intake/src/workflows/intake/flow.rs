use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::catalog::QuestionCatalog;
use super::domain::{AnswerMap, AnswerValue, ApplicantTrack, Question};
use super::validation::{ValidationError, Validator};

/// What a successfully recorded answer did to the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Advanced,
    Expanded {
        track: ApplicantTrack,
        sequence_length: usize,
    },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowProgress {
    pub position: usize,
    pub sequence_length: usize,
}

/// Linear question sequence, cursor, and accumulated answers for one applicant.
///
/// `position == sequence.len()` means every question has been answered and the form is
/// waiting to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowState {
    sequence: Vec<Question>,
    position: usize,
    answers: AnswerMap,
    last_error: Option<ValidationError>,
}

impl FlowState {
    pub fn new(sequence: Vec<Question>) -> Self {
        Self {
            sequence,
            position: 0,
            answers: AnswerMap::new(),
            last_error: None,
        }
    }

    pub fn sequence(&self) -> &[Question] {
        &self.sequence
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn last_error(&self) -> Option<&ValidationError> {
        self.last_error.as_ref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.sequence.get(self.position)
    }

    /// Previously stored answer for the current question, used to pre-fill the editor.
    pub fn current_answer(&self) -> Option<&AnswerValue> {
        self.current_question()
            .and_then(|question| self.answers.get(question.id))
    }

    pub fn is_terminal(&self) -> bool {
        self.position == self.sequence.len()
    }

    pub fn progress(&self) -> FlowProgress {
        FlowProgress {
            position: self.position,
            sequence_length: self.sequence.len(),
        }
    }

    /// Step back one question. Returns `false` at the first question.
    pub fn go_back(&mut self) -> bool {
        self.last_error = None;
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        true
    }

    fn reject(&mut self, error: ValidationError) -> ValidationError {
        self.last_error = Some(error.clone());
        error
    }
}

/// Replace everything after the selector at `position` with the chosen track followed by
/// the common and final groups.
pub fn expand(
    sequence: &[Question],
    position: usize,
    track: ApplicantTrack,
    catalog: &QuestionCatalog,
) -> Vec<Question> {
    let keep = position.saturating_add(1).min(sequence.len());
    sequence[..keep]
        .iter()
        .chain(catalog.branch_tail(track))
        .cloned()
        .collect()
}

/// Drives a [`FlowState`] through the catalog, validating every answer on the way.
#[derive(Debug, Clone)]
pub struct FlowEngine {
    catalog: Arc<QuestionCatalog>,
    validator: Arc<Validator>,
}

impl FlowEngine {
    pub fn new(catalog: Arc<QuestionCatalog>, validator: Validator) -> Self {
        Self {
            catalog,
            validator: Arc::new(validator),
        }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(QuestionCatalog::standard()), Validator::default())
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn start(&self) -> FlowState {
        FlowState::new(self.catalog.initial_sequence())
    }

    /// Validate `raw` against the current question and advance.
    ///
    /// On rejection the state keeps its sequence, position and answers; only
    /// `last_error` changes.
    pub fn record_answer(
        &self,
        state: &mut FlowState,
        raw: AnswerValue,
    ) -> Result<AnswerOutcome, ValidationError> {
        let Some(question) = state.current_question().cloned() else {
            return Err(state.reject(ValidationError::NoActiveQuestion));
        };

        let value = match self.validator.validate(&question, raw) {
            Ok(value) => value,
            Err(error) => {
                debug!(question = question.id, code = error.code(), "answer rejected");
                return Err(state.reject(error));
            }
        };

        let branch = if question.id == self.catalog.selector().id {
            let choice = value.as_text().unwrap_or_default();
            match ApplicantTrack::from_choice(choice) {
                Some(track) => Some(track),
                None => {
                    return Err(state.reject(ValidationError::UnknownChoice {
                        choice: choice.to_string(),
                    }))
                }
            }
        } else {
            None
        };

        state.answers.insert(question.id, value);
        state.last_error = None;

        if let Some(track) = branch {
            state.sequence = expand(&state.sequence, state.position, track, &self.catalog);
            state.position += 1;
            info!(
                %track,
                sequence_length = state.sequence.len(),
                "applicant track selected"
            );
            return Ok(AnswerOutcome::Expanded {
                track,
                sequence_length: state.sequence.len(),
            });
        }

        state.position += 1;
        debug!(
            question = question.id,
            position = state.position,
            sequence_length = state.sequence.len(),
            "answer recorded"
        );

        if state.is_terminal() {
            Ok(AnswerOutcome::Completed)
        } else {
            Ok(AnswerOutcome::Advanced)
        }
    }
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::standard()
    }
}
