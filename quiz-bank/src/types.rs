//! Core item types.
//!
//! Field names on the wire follow the persisted `questions.json` record shape,
//! so corpora written by earlier deployments load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exam track an item belongs to. Partitions the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Undergraduate medical entrance
    #[serde(rename = "NEET UG")]
    NeetUg,
    /// Postgraduate medical entrance
    #[serde(rename = "NEET PG")]
    NeetPg,
    /// Master of Dental Surgery
    #[serde(rename = "MDS")]
    Mds,
    /// Civil services examination
    #[serde(rename = "UPSC")]
    Upsc,
}

impl Category {
    /// Every recognised category.
    pub const ALL: [Category; 4] = [
        Category::NeetUg,
        Category::NeetPg,
        Category::Mds,
        Category::Upsc,
    ];

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::NeetUg => "NEET UG",
            Category::NeetPg => "NEET PG",
            Category::Mds => "MDS",
            Category::Upsc => "UPSC",
        }
    }

    /// What questions for this track should focus on.
    pub fn focus(&self) -> &'static str {
        match self {
            Category::NeetUg => {
                "Focus on applying biological concepts to medical scenarios, including questions on human physiology, biochemistry, and anatomy."
            }
            Category::NeetPg => {
                "Emphasize clinical applications, patient management, and problem-solving skills required at the postgraduate medical level."
            }
            Category::Mds => {
                "Cover in-depth dental scenarios, clinical case studies, and advanced dental techniques relevant to Master in Dental Surgery."
            }
            Category::Upsc => {
                "Involve broad socio-economic impacts, governance, and administrative strategies essential for civil services examination."
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category string that is not one of [`Category::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Item kind. Only multiple choice is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    #[serde(rename = "MCQ")]
    MultipleChoice,
}

impl ItemKind {
    /// Tag used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::MultipleChoice => "MCQ",
        }
    }
}

/// One of an item's four options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Option text shown to the learner
    #[serde(rename = "option")]
    pub text: String,
    /// Whether this is the correct option
    pub is_correct: bool,
    /// Explanation of the option
    pub explanation: String,
    /// Why the option is wrong, shown when it was picked incorrectly
    #[serde(rename = "reason")]
    pub reason_if_wrong: String,
    /// Study topic to revisit
    #[serde(rename = "study_topic")]
    pub related_topic: String,
}

/// A validated, admitted question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Assigned at admission, never by the generator
    pub id: String,
    /// Exam track
    #[serde(rename = "examType")]
    pub category: Category,
    /// Question text; the deduplication key
    #[serde(rename = "question")]
    pub primary_text: String,
    #[serde(rename = "question_type")]
    pub kind: ItemKind,
    /// Explanation of the correct answer
    #[serde(rename = "explanation")]
    pub rationale: String,
    /// Classification label
    pub topic: String,
    /// Exactly four options
    #[serde(rename = "options")]
    pub choices: Vec<Choice>,
    /// When the item was admitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Item {
    /// The correct choice, if the item has one.
    pub fn correct_choice(&self) -> Option<&Choice> {
        self.choices.iter().find(|c| c.is_correct)
    }

    /// Expose the stored record to the validator again.
    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(serde_json::to_value(self).unwrap_or(serde_json::Value::Null))
    }
}

/// Untrusted generator output. Nothing about its shape is assumed until
/// [`crate::SchemaValidator`] has accepted it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate(serde_json::Value);

/// The subset of a candidate that becomes an item. Ids and categories
/// supplied by the generator are ignored.
#[derive(Deserialize)]
struct ItemDraft {
    question: String,
    question_type: ItemKind,
    explanation: String,
    topic: String,
    options: Vec<Choice>,
}

impl Candidate {
    /// Wrap a raw JSON value.
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    /// The raw JSON.
    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }

    /// The question text, when present as a string.
    pub fn primary_text(&self) -> Option<&str> {
        self.0.get("question").and_then(|v| v.as_str())
    }

    /// Promote to an [`Item`] with the admission-time id and category.
    pub fn into_item(self, id: String, category: Category) -> Result<Item, serde_json::Error> {
        let draft: ItemDraft = serde_json::from_value(self.0)?;
        Ok(Item {
            id,
            category,
            primary_text: draft.question,
            kind: draft.question_type,
            rationale: draft.explanation,
            topic: draft.topic,
            choices: draft.options,
            created_at: None,
        })
    }
}

impl From<serde_json::Value> for Candidate {
    fn from(raw: serde_json::Value) -> Self {
        Self::new(raw)
    }
}
