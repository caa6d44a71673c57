//! Question/answer model for human-interaction nodes
//!
//! The engine side builds a `Question` from a node's prompt and the
//! labels of its outgoing edges; an `Interviewer` implementation turns
//! it into an `Answer`. A queue-backed interviewer that times out
//! produces a distinguished `Timeout` answer rather than blocking
//! forever.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of question presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    /// A yes/no decision
    YesNo,
    /// Pick one of several choices
    MultipleChoice,
    /// Free-text answer
    Freeform,
    /// Confirm before proceeding
    Confirmation,
}

/// A single selectable choice for multiple-choice questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Selection key, e.g. a menu index
    pub key: String,
    /// Display label
    pub label: String,
}

impl Choice {
    /// Create a choice from key and label
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// A question posed to the user during pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Question text
    pub text: String,
    /// Classification of the question
    pub question_type: QuestionType,
    /// Ordered selectable choices, empty for freeform questions
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Default answer when the user gives none
    #[serde(default)]
    pub default: Option<String>,
    /// Wait bound in seconds
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// Run-scoped stage identifier (the asking node's id)
    #[serde(default)]
    pub stage: String,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Question {
    /// Create a question with the given text and type
    pub fn new(text: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            text: text.into(),
            question_type,
            choices: Vec::new(),
            default: None,
            timeout_seconds: None,
            stage: String::new(),
            metadata: HashMap::new(),
        }
    }

    /// Set the selectable choices
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    /// Set the stage identifier
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }
}

/// Canonical answer value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerValue {
    /// Affirmative
    Yes,
    /// Negative
    No,
    /// The user skipped the question
    Skipped,
    /// The wait bound elapsed before an answer arrived
    Timeout,
    /// A free-text or choice-key value
    Text(String),
}

impl AnswerValue {
    /// The canonical string form
    pub fn as_str(&self) -> &str {
        match self {
            AnswerValue::Yes => "YES",
            AnswerValue::No => "NO",
            AnswerValue::Skipped => "SKIPPED",
            AnswerValue::Timeout => "TIMEOUT",
            AnswerValue::Text(s) => s,
        }
    }
}

/// The user's response to a `Question`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answer {
    /// Canonical value, if any
    pub value: Option<AnswerValue>,
    /// The selected choice for multiple-choice questions
    pub selected: Option<Choice>,
    /// Raw answer text
    pub text: String,
}

impl Answer {
    /// An affirmative answer
    pub fn yes() -> Self {
        Self {
            value: Some(AnswerValue::Yes),
            selected: None,
            text: "YES".to_string(),
        }
    }

    /// A negative answer
    pub fn no() -> Self {
        Self {
            value: Some(AnswerValue::No),
            selected: None,
            text: "NO".to_string(),
        }
    }

    /// A timed-out answer
    pub fn timeout() -> Self {
        Self {
            value: Some(AnswerValue::Timeout),
            selected: None,
            text: String::new(),
        }
    }

    /// A free-text answer
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            value: Some(AnswerValue::Text(text.clone())),
            selected: None,
            text,
        }
    }

    /// An answer selecting the given choice
    pub fn choice(choice: Choice) -> Self {
        Self {
            value: Some(AnswerValue::Text(choice.key.clone())),
            text: choice.label.clone(),
            selected: Some(choice),
        }
    }

    /// True for an affirmative answer
    pub fn is_yes(&self) -> bool {
        self.value == Some(AnswerValue::Yes)
    }

    /// True for a negative answer
    pub fn is_no(&self) -> bool {
        self.value == Some(AnswerValue::No)
    }

    /// True if the user skipped the question
    pub fn was_skipped(&self) -> bool {
        self.value == Some(AnswerValue::Skipped)
    }

    /// True if the wait bound elapsed
    pub fn timed_out(&self) -> bool {
        self.value == Some(AnswerValue::Timeout)
    }
}

/// Extract an accelerator key from a choice label.
///
/// Recognizes `[K] label`, `K) label`, and `K - label`, where `K` is a
/// single alphanumeric key. Returns `(key, clean_label)`, or
/// `("", label)` unchanged when no accelerator is present.
pub fn parse_accelerator(label: &str) -> (String, String) {
    let label = label.trim();
    let chars: Vec<char> = label.chars().collect();

    // [K] label
    if chars.len() >= 3 && chars[0] == '[' && chars[1].is_alphanumeric() && chars[2] == ']' {
        let rest: String = chars[3..].iter().collect();
        return (chars[1].to_string(), rest.trim().to_string());
    }

    // K) label
    if chars.len() >= 2 && chars[0].is_alphanumeric() && chars[1] == ')' {
        let rest: String = chars[2..].iter().collect();
        return (chars[0].to_string(), rest.trim().to_string());
    }

    // K - label
    if chars.len() >= 2 && chars[0].is_alphanumeric() {
        let rest: String = chars[1..].iter().collect();
        let trimmed = rest.trim_start();
        if let Some(stripped) = trimmed.strip_prefix('-') {
            if stripped.starts_with(char::is_whitespace) {
                return (chars[0].to_string(), stripped.trim().to_string());
            }
        }
    }

    (String::new(), label.to_string())
}
