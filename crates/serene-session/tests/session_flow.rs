use std::sync::Arc;
use std::time::Duration;

use serene_config::{SessionSettings, DEFAULT_GREETING};
use serene_conversation::{Conversation, EXERCISE_WORKSHEET};
use serene_core::{Message, MockResponder, Reply, RuleKind, Sender};
use serene_session::{CbtSession, SendOutcome, SessionError, SessionEvent};
use tokio_stream::StreamExt;

fn paced_settings() -> SessionSettings {
    SessionSettings {
        reply_delay_min_ms: 1000,
        reply_delay_max_ms: 3000,
        exercise_delay_ms: 1500,
        ..SessionSettings::default()
    }
}

fn prior_messages(count: usize) -> Conversation {
    let mut conversation = Conversation::with_greeting(DEFAULT_GREETING);
    for i in 1..count {
        if i % 2 == 1 {
            conversation.push(Message::user(format!("user message {i}")));
        } else {
            conversation.push(Message::agent(format!("agent message {i}"), false));
        }
    }
    conversation
}

#[tokio::test(start_paused = true)]
async fn anxious_message_gets_single_reply() {
    let session = CbtSession::scripted(paced_settings());

    let outcome = session.send("I feel anxious about work").await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Scheduled {
            rule: RuleKind::Anxiety,
            is_exercise: false
        }
    );

    session.wait_idle().await;

    let transcript = session.transcript().await;
    let messages = transcript.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].sender, Sender::User);
    assert_eq!(messages[1].content, "I feel anxious about work");
    assert_eq!(messages[2].sender, Sender::Agent);
    assert!(messages[2].content.contains("anxious"));
    assert!(!messages[2].is_exercise);
    assert!(!session.is_typing().await);
}

#[tokio::test(start_paused = true)]
async fn long_conversation_escalates_to_exercise() {
    let conversation = prior_messages(5);
    assert_eq!(conversation.len(), 5);

    let session = CbtSession::from_conversation(
        paced_settings(),
        Arc::new(serene_conversation::ResponseSelector::default()),
        conversation,
    );

    let outcome = session.send("I don't know, just tired").await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Scheduled {
            rule: RuleKind::ExerciseEscalation,
            is_exercise: true
        }
    );

    session.wait_idle().await;

    let transcript = session.transcript().await;
    let messages = transcript.messages();
    // user message + reply + worksheet
    assert_eq!(messages.len(), 8);
    assert!(messages[6].is_exercise);
    assert_eq!(messages[7].content, EXERCISE_WORKSHEET);
    assert!(messages[7].is_exercise);
    assert_eq!(messages[7].sender, Sender::Agent);

    let metrics = session.metrics().await;
    assert_eq!(metrics.replies_delivered, 1);
    assert_eq!(metrics.exercises_delivered, 1);
}

#[tokio::test(start_paused = true)]
async fn thought_reply_is_followed_by_worksheet_after_delay() {
    let session = CbtSession::scripted(SessionSettings {
        reply_delay_min_ms: 1000,
        reply_delay_max_ms: 1000,
        exercise_delay_ms: 1500,
        ..SessionSettings::default()
    });

    session.send("I keep having this thought").await.unwrap();
    assert!(session.is_typing().await);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 3);
    assert!(transcript.last().unwrap().is_exercise);
    assert!(!session.is_typing().await);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript.last().unwrap().content, EXERCISE_WORKSHEET);
}

#[tokio::test(start_paused = true)]
async fn blank_input_is_ignored() {
    let session = CbtSession::scripted(paced_settings());

    assert_eq!(session.send("").await.unwrap(), SendOutcome::Ignored);
    assert_eq!(session.send("   \n\t").await.unwrap(), SendOutcome::Ignored);

    session.wait_idle().await;
    assert_eq!(session.transcript().await.len(), 1);
    assert!(!session.is_typing().await);
    assert_eq!(session.metrics().await.ignored_inputs, 2);
}

#[tokio::test(start_paused = true)]
async fn send_while_typing_is_rejected() {
    let session = CbtSession::scripted(paced_settings());

    session.send("hello").await.unwrap();
    let err = session.send("are you there?").await.unwrap_err();
    assert_eq!(err, SessionError::AgentTyping);

    session.wait_idle().await;
    assert_eq!(session.transcript().await.len(), 3);

    // Typing is over once the reply lands.
    session.send("ok").await.unwrap();
    session.wait_idle().await;
    assert_eq!(session.transcript().await.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_reply() {
    let session = CbtSession::scripted(paced_settings());

    session.send("negative thoughts everywhere").await.unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;

    session.close().await;
    assert!(session.is_closed());

    // Well past both delays: nothing else may land.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.last().unwrap().sender, Sender::User);
    assert_eq!(session.metrics().await.cancelled_deliveries, 1);

    assert_eq!(session.send("hello?").await.unwrap_err(), SessionError::Closed);
}

#[tokio::test(start_paused = true)]
async fn close_between_reply_and_worksheet_drops_worksheet() {
    let session = CbtSession::scripted(SessionSettings {
        reply_delay_min_ms: 100,
        reply_delay_max_ms: 100,
        exercise_delay_ms: 1500,
        ..SessionSettings::default()
    });

    session.send("negative").await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.transcript().await.len(), 3);

    session.close().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript.exercise_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn responder_sees_history_before_user_message() {
    let mut responder = MockResponder::new();
    responder
        .expect_respond()
        .withf(|history, text| history.len() == 1 && text == "hello")
        .times(1)
        .returning(|_, _| Reply {
            text: "scripted".to_string(),
            is_exercise: true,
            rule: RuleKind::ExerciseEscalation,
        });
    responder
        .expect_exercise_worksheet()
        .times(1)
        .returning(|| "worksheet".to_string());

    let session = CbtSession::new(SessionSettings::immediate(), Arc::new(responder));
    session.send("hello").await.unwrap();
    session.wait_idle().await;

    let contents: Vec<String> = session
        .transcript()
        .await
        .messages()
        .iter()
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(contents, vec![DEFAULT_GREETING, "hello", "scripted", "worksheet"]);
}

#[tokio::test(start_paused = true)]
async fn events_follow_delivery_order() {
    let session = CbtSession::scripted(SessionSettings::immediate());
    let mut events = session.events();

    session.send("thought").await.unwrap();
    session.wait_idle().await;

    let mut received = Vec::new();
    for _ in 0..5 {
        received.push(events.next().await.unwrap().unwrap());
    }

    assert!(matches!(&received[0], SessionEvent::MessageAppended(m) if m.sender == Sender::User));
    assert_eq!(received[1], SessionEvent::AgentTyping);
    assert!(matches!(
        &received[2],
        SessionEvent::MessageAppended(m) if m.is_exercise && m.content != EXERCISE_WORKSHEET
    ));
    assert!(matches!(
        &received[3],
        SessionEvent::MessageAppended(m) if m.content == EXERCISE_WORKSHEET
    ));
    assert_eq!(received[4], SessionEvent::Settled);
}
