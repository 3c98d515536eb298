//! Structural validation of generator output.
//!
//! Invalid output is an expected outcome, not an error: callers get a
//! boolean from [`SchemaValidator::validate`], or the first failure from
//! [`SchemaValidator::check`] when they want to log why.

use serde_json::Value;

use crate::types::{Candidate, ItemKind};

/// Number of choices every item carries.
pub const CHOICE_COUNT: usize = 4;

/// Top-level text fields, checked in order after presence.
const TEXT_FIELDS: [&str; 3] = ["question", "explanation", "topic"];

/// All top-level fields that must be present.
const REQUIRED_FIELDS: [&str; 5] = ["question", "question_type", "explanation", "topic", "options"];

/// Text fields every choice must carry.
const CHOICE_TEXT_FIELDS: [&str; 4] = ["option", "explanation", "reason", "study_topic"];

/// First reason a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("candidate is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must be a non-empty string")]
    EmptyField(&'static str),

    #[error("unsupported question type")]
    UnsupportedKind,

    #[error("expected 4 options, got {0}")]
    ChoiceCount(usize),

    #[error("option {index} is not a JSON object")]
    ChoiceNotAnObject { index: usize },

    #[error("option {index} is missing `{field}`")]
    ChoiceMissingField { index: usize, field: &'static str },

    #[error("option {index} field `{field}` must be a non-empty string")]
    ChoiceEmptyField { index: usize, field: &'static str },

    #[error("option {index} `is_correct` must be a boolean")]
    ChoiceCorrectnessNotBool { index: usize },

    #[error("expected exactly one correct option, got {0}")]
    CorrectCount(usize),
}

/// Pure, stateless structural checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaValidator {
    require_single_correct: bool,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::strict()
    }
}

impl SchemaValidator {
    /// Structure plus exactly one correct option.
    pub fn strict() -> Self {
        Self {
            require_single_correct: true,
        }
    }

    /// Structure only; any number of options may be marked correct.
    pub fn structural() -> Self {
        Self {
            require_single_correct: false,
        }
    }

    /// Create from the config flag.
    pub fn new(require_single_correct: bool) -> Self {
        Self {
            require_single_correct,
        }
    }

    /// Check a candidate.
    pub fn validate(&self, candidate: &Candidate) -> bool {
        self.check(candidate).is_ok()
    }

    /// Check a candidate, returning the first failure.
    pub fn check(&self, candidate: &Candidate) -> Result<(), ValidationFailure> {
        let object = candidate
            .raw()
            .as_object()
            .ok_or(ValidationFailure::NotAnObject)?;

        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(ValidationFailure::MissingField(field));
            }
        }

        for field in TEXT_FIELDS {
            if !is_non_empty_str(&object[field]) {
                return Err(ValidationFailure::EmptyField(field));
            }
        }

        if object["question_type"].as_str() != Some(ItemKind::MultipleChoice.as_str()) {
            return Err(ValidationFailure::UnsupportedKind);
        }

        let choices = match object["options"].as_array() {
            Some(choices) if choices.len() == CHOICE_COUNT => choices,
            Some(choices) => return Err(ValidationFailure::ChoiceCount(choices.len())),
            None => return Err(ValidationFailure::ChoiceCount(0)),
        };

        let mut correct = 0;
        for (index, choice) in choices.iter().enumerate() {
            let choice = choice
                .as_object()
                .ok_or(ValidationFailure::ChoiceNotAnObject { index })?;

            for field in CHOICE_TEXT_FIELDS {
                match choice.get(field) {
                    None => return Err(ValidationFailure::ChoiceMissingField { index, field }),
                    Some(value) if !is_non_empty_str(value) => {
                        return Err(ValidationFailure::ChoiceEmptyField { index, field })
                    }
                    Some(_) => {}
                }
            }

            match choice.get("is_correct") {
                None => {
                    return Err(ValidationFailure::ChoiceMissingField {
                        index,
                        field: "is_correct",
                    })
                }
                Some(Value::Bool(true)) => correct += 1,
                Some(Value::Bool(false)) => {}
                Some(_) => return Err(ValidationFailure::ChoiceCorrectnessNotBool { index }),
            }
        }

        if self.require_single_correct && correct != 1 {
            return Err(ValidationFailure::CorrectCount(correct));
        }

        Ok(())
    }
}

fn is_non_empty_str(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}
