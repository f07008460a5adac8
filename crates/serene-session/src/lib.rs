//! CBT chat session.
//!
//! A session owns one conversation. Each user message is answered by the
//! session's [`Responder`]; the reply (and the exercise worksheet, when the
//! reply calls for one) is appended later by a delivery task. Every delivery
//! task is tied to the session's cancellation token, so closing or dropping
//! the session stops pending replies from landing in a discarded conversation.

use rand::Rng;
use serene_config::SessionSettings;
use serene_conversation::{Conversation, ResponseSelector};
use serene_core::{Message, Responder, RuleKind};
use serene_metrics::SelectionMetrics;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

mod delivery;

use delivery::Delivery;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(Message),
    AgentTyping,
    /// Every delivery scheduled for a turn has run.
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing was recorded.
    Ignored,
    Scheduled { rule: RuleKind, is_exercise: bool },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,

    #[error("agent is still replying to the previous message")]
    AgentTyping,
}

pub(crate) struct SessionState {
    pub(crate) conversation: Conversation,
    pub(crate) metrics: SelectionMetrics,
    pub(crate) typing: bool,
}

pub struct CbtSession {
    settings: SessionSettings,
    responder: Arc<dyn Responder>,
    state: Arc<Mutex<SessionState>>,
    deliveries: Mutex<JoinSet<()>>,
    cancel: CancellationToken,
    events: broadcast::Sender<SessionEvent>,
}

impl CbtSession {
    /// Session driven by the scripted keyword selector.
    pub fn scripted(settings: SessionSettings) -> Self {
        let responder = Arc::new(ResponseSelector::new(settings.exercise_after_messages));
        Self::new(settings, responder)
    }

    pub fn new(settings: SessionSettings, responder: Arc<dyn Responder>) -> Self {
        let conversation = Conversation::with_greeting(settings.greeting.clone());
        Self::from_conversation(settings, responder, conversation)
    }

    /// Resume from an existing conversation instead of a fresh greeting.
    pub fn from_conversation(
        settings: SessionSettings,
        responder: Arc<dyn Responder>,
        conversation: Conversation,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!("Started CBT session {}", conversation.id());

        Self {
            settings,
            responder,
            state: Arc::new(Mutex::new(SessionState {
                conversation,
                metrics: SelectionMetrics::new(),
                typing: false,
            })),
            deliveries: Mutex::new(JoinSet::new()),
            cancel: CancellationToken::new(),
            events,
        }
    }

    /// Record a user message and schedule the agent's reply.
    #[instrument(skip(self, text))]
    pub async fn send(&self, text: &str) -> Result<SendOutcome, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Closed);
        }

        let mut state = self.state.lock().await;

        // close() may have run while this send waited for the lock.
        if self.cancel.is_cancelled() {
            return Err(SessionError::Closed);
        }
        if text.trim().is_empty() {
            state.metrics.record_ignored_input();
            debug!("Ignoring blank input");
            return Ok(SendOutcome::Ignored);
        }
        if state.typing {
            return Err(SessionError::AgentTyping);
        }

        // The reply is chosen against the conversation as it was before this message.
        let reply = self.responder.respond(state.conversation.messages(), text);
        state.metrics.record_selection(reply.rule);

        let user_message = state.conversation.push(Message::user(text)).clone();
        state.typing = true;
        drop(state);

        let _ = self.events.send(SessionEvent::MessageAppended(user_message));
        let _ = self.events.send(SessionEvent::AgentTyping);

        let outcome = SendOutcome::Scheduled {
            rule: reply.rule,
            is_exercise: reply.is_exercise,
        };

        let worksheet = reply
            .is_exercise
            .then(|| self.responder.exercise_worksheet());
        let delivery = Delivery {
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            cancel: self.cancel.child_token(),
            reply,
            reply_delay: self.reply_delay(),
            worksheet,
            exercise_delay: self.settings.exercise_delay(),
        };

        let mut deliveries = self.deliveries.lock().await;
        while let Some(finished) = deliveries.try_join_next() {
            if let Err(e) = finished {
                warn!("Reply delivery task failed: {}", e);
            }
        }
        deliveries.spawn(delivery.run());

        Ok(outcome)
    }

    /// Wait until every scheduled reply has been delivered.
    pub async fn wait_idle(&self) {
        let mut deliveries = self.deliveries.lock().await;
        while let Some(finished) = deliveries.join_next().await {
            if let Err(e) = finished {
                warn!("Reply delivery task failed: {}", e);
            }
        }
    }

    /// Cancel pending replies and wait for their tasks to stop.
    ///
    /// Once this returns the conversation no longer changes.
    pub async fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("Closing CBT session");
        }
        self.cancel.cancel();
        self.wait_idle().await;
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn is_typing(&self) -> bool {
        self.state.lock().await.typing
    }

    pub async fn transcript(&self) -> Conversation {
        self.state.lock().await.conversation.clone()
    }

    pub async fn metrics(&self) -> SelectionMetrics {
        self.state.lock().await.metrics.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> BroadcastStream<SessionEvent> {
        BroadcastStream::new(self.subscribe())
    }

    fn reply_delay(&self) -> Duration {
        let min = self.settings.reply_delay_min_ms;
        let max = self.settings.reply_delay_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Drop for CbtSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_blocked_on_lock_fails_once_closed() {
        let session = Arc::new(CbtSession::scripted(SessionSettings::immediate()));

        let guard = session.state.lock().await;
        let pending = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.send("hello").await }
        });
        tokio::task::yield_now().await;

        session.close().await;
        drop(guard);

        assert_eq!(pending.await.unwrap(), Err(SessionError::Closed));
        assert_eq!(session.transcript().await.len(), 1);
        assert!(!session.is_typing().await);
    }
}
