use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Agent,
    User,
}

/// A single entry in a session conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_exercise: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User, false)
    }

    pub fn agent(content: impl Into<String>, is_exercise: bool) -> Self {
        Self::new(content, Sender::Agent, is_exercise)
    }

    fn new(content: impl Into<String>, sender: Sender, is_exercise: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            is_exercise,
        }
    }

    pub fn is_from_agent(&self) -> bool {
        self.sender == Sender::Agent
    }
}

/// Which scripted rule produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Anxiety,
    Sadness,
    NegativeThought,
    ExerciseEscalation,
    Reflective,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Anxiety => "anxiety",
            RuleKind::Sadness => "sadness",
            RuleKind::NegativeThought => "negative_thought",
            RuleKind::ExerciseEscalation => "exercise_escalation",
            RuleKind::Reflective => "reflective",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub is_exercise: bool,
    pub rule: RuleKind,
}

#[derive(Error, Debug)]
pub enum SereneError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Journal error: {0}")]
    JournalError(String),

    #[error("Validation failed for '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SereneError>;

/// Chooses the agent's reply to the latest user text.
///
/// `history` is the conversation as it stood before the user's message was
/// appended. Implementations must be pure: the same inputs give the same reply.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait Responder: Send + Sync {
    fn respond(&self, history: &[Message], latest_user_text: &str) -> Reply;

    /// Follow-up content delivered after a reply flagged as an exercise.
    fn exercise_worksheet(&self) -> String;
}
