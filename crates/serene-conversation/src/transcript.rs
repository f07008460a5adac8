use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serene_core::{Message, Result, Sender};
use std::fs;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::conversation::Conversation;

/// Standalone export of a finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub conversation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub exported_at: DateTime<Utc>,
    pub message_count: usize,
    pub user_messages: usize,
    pub exercises: usize,
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn from_conversation(conversation: &Conversation) -> Self {
        let messages = conversation.messages().to_vec();
        Self {
            conversation_id: conversation.id(),
            started_at: conversation.started_at(),
            exported_at: Utc::now(),
            message_count: messages.len(),
            user_messages: messages.iter().filter(|m| m.sender == Sender::User).count(),
            exercises: conversation.exercise_count(),
            messages,
        }
    }

    pub fn write_json(&self, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(output_path, json)?;

        info!("Exported conversation {} to {:?}", self.conversation_id, output_path);
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_transcript_counts() {
        let mut conversation = Conversation::with_greeting("Hello");
        conversation.push(Message::user("I keep having negative thoughts"));
        conversation.push(Message::agent("reply", true));
        conversation.push(Message::agent("worksheet", true));

        let transcript = Transcript::from_conversation(&conversation);
        assert_eq!(transcript.conversation_id, conversation.id());
        assert_eq!(transcript.message_count, 4);
        assert_eq!(transcript.user_messages, 1);
        assert_eq!(transcript.exercises, 2);
    }

    #[test]
    fn test_export_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("exports").join("session.json");

        let mut conversation = Conversation::with_greeting("Hello");
        conversation.push(Message::user("hi"));

        Transcript::from_conversation(&conversation).write_json(&path).unwrap();
        assert!(path.exists());

        let loaded = Transcript::read_json(&path).unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[1].content, "hi");
    }
}
