use chrono::{DateTime, Utc};
use serene_core::Message;
use uuid::Uuid;

/// Append-only, ordered log of the messages exchanged in one session.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: Uuid,
    started_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Start a conversation with the agent's opening message.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(Message::agent(greeting, false));
        conversation
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn exercise_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_exercise).count()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serene_core::Sender;

    #[test]
    fn test_greeting_starts_conversation() {
        let conversation = Conversation::with_greeting("Hello");
        assert_eq!(conversation.len(), 1);
        let first = conversation.last().unwrap();
        assert_eq!(first.sender, Sender::Agent);
        assert_eq!(first.content, "Hello");
        assert!(!first.is_exercise);
    }

    #[test]
    fn test_push_preserves_order() {
        let mut conversation = Conversation::new();
        assert!(conversation.is_empty());

        conversation.push(Message::user("one"));
        conversation.push(Message::agent("two", true));
        conversation.push(Message::user("three"));

        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(conversation.exercise_count(), 1);
    }
}
