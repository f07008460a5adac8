use serene_core::{Message, Reply};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{SessionEvent, SessionState};

/// One scheduled agent turn: the reply, then the worksheet if the reply asked for it.
pub(crate) struct Delivery {
    pub(crate) state: Arc<Mutex<SessionState>>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) cancel: CancellationToken,
    pub(crate) reply: Reply,
    pub(crate) reply_delay: Duration,
    pub(crate) worksheet: Option<String>,
    pub(crate) exercise_delay: Duration,
}

impl Delivery {
    pub(crate) async fn run(self) {
        let reply = Message::agent(self.reply.text.clone(), self.reply.is_exercise);
        if !self.append_after(self.reply_delay, reply, false).await {
            return;
        }

        if let Some(worksheet) = self.worksheet.clone() {
            let exercise = Message::agent(worksheet, true);
            if !self.append_after(self.exercise_delay, exercise, true).await {
                return;
            }
        }

        let _ = self.events.send(SessionEvent::Settled);
    }

    /// Returns false when the session was cancelled before the message landed.
    async fn append_after(&self, delay: Duration, message: Message, is_worksheet: bool) -> bool {
        let elapsed = tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        };

        let mut state = self.state.lock().await;

        // Re-check under the lock: close() may have fired after the timer.
        if !elapsed || self.cancel.is_cancelled() {
            state.metrics.record_cancelled();
            debug!("Dropped pending {} after cancellation", kind(is_worksheet));
            return false;
        }

        if is_worksheet {
            state.metrics.record_exercise();
        } else {
            state.typing = false;
            state.metrics.record_reply();
        }
        let appended = state.conversation.push(message).clone();
        drop(state);

        debug!("Delivered {} {}", kind(is_worksheet), appended.id);
        let _ = self.events.send(SessionEvent::MessageAppended(appended));
        true
    }
}

fn kind(is_worksheet: bool) -> &'static str {
    if is_worksheet {
        "exercise worksheet"
    } else {
        "reply"
    }
}
