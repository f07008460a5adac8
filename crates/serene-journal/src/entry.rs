use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serene_core::{Result, SereneError};
use uuid::Uuid;

pub const NEW_ENTRY_TITLE: &str = "New Entry";

const MOOD_LABELS: [&str; 5] = ["Very Bad", "Bad", "Neutral", "Good", "Very Good"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl JournalEntry {
    /// Blank entry as created by the "new entry" action.
    pub fn blank() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: NEW_ENTRY_TITLE.to_string(),
            content: String::new(),
            date: Utc::now(),
            mood: None,
            tags: Vec::new(),
        }
    }

    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::blank()
        }
    }

    pub fn with_mood(mut self, mood: u8) -> Result<Self> {
        validate_mood(mood)?;
        self.mood = Some(mood);
        Ok(self)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn mood_label(&self) -> &'static str {
        mood_label(self.mood)
    }

    /// Case-insensitive match on title, content or any tag.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.content.to_lowercase().contains(&term)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
    }

    /// First `max` tags plus how many were left out.
    pub fn tag_preview(&self, max: usize) -> (&[String], usize) {
        let shown = self.tags.len().min(max);
        (&self.tags[..shown], self.tags.len() - shown)
    }
}

pub fn mood_label(mood: Option<u8>) -> &'static str {
    match mood {
        Some(m @ 1..=5) => MOOD_LABELS[usize::from(m) - 1],
        _ => "No mood",
    }
}

pub(crate) fn validate_mood(mood: u8) -> Result<()> {
    if (1..=5).contains(&mood) {
        Ok(())
    } else {
        Err(SereneError::ValidationError {
            field: "mood".to_string(),
            message: format!("mood must be between 1 and 5, got {}", mood),
        })
    }
}
