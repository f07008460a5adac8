//! Scripted CBT response selection.
//!
//! Replies are chosen by an ordered keyword table matched against the
//! lower-cased user text. The first rule whose keywords appear wins; when no
//! keyword matches, the length of the conversation decides between escalating
//! to a structured exercise and a generic reflective prompt.

use serene_core::{Message, Reply, Responder, RuleKind};
use tracing::debug;

pub const EXERCISE_WORKSHEET: &str = "**Cognitive Restructuring: Identifying Negative Thoughts**

Let's practice identifying and challenging negative thought patterns. This exercise will help you recognize when unhelpful thoughts arise and develop more balanced perspectives.

**Step 1:** Think of a recent situation that caused you stress or negative emotions.

**Step 2:** Write down the automatic thoughts that came to mind in that situation.

**Step 3:** Ask yourself:
- Is this thought realistic?
- What evidence do I have for and against this thought?
- What would I tell a friend in this situation?

**Step 4:** Try to reframe the thought in a more balanced way.

Take your time with this exercise. You can work through it step by step, and I'll be here to guide you through each part.";

const ESCALATION_REPLY: &str = "Based on what you've shared, I think it would be helpful to try a structured exercise together.";

const REFLECTIVE_REPLY: &str = "Thank you for sharing that with me. It's important that you feel comfortable expressing yourself here. Can you tell me more about how this affects your daily life?";

struct KeywordRule {
    kind: RuleKind,
    keywords: &'static [&'static str],
    text: &'static str,
    is_exercise: bool,
}

impl KeywordRule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }

    fn reply(&self) -> Reply {
        Reply {
            text: self.text.to_string(),
            is_exercise: self.is_exercise,
            rule: self.kind,
        }
    }
}

// Priority order matters: earlier rules shadow later ones.
static KEYWORD_RULES: [KeywordRule; 3] = [
    KeywordRule {
        kind: RuleKind::Anxiety,
        keywords: &["anxious", "anxiety"],
        text: "I understand you're feeling anxious. Anxiety is a common experience, and there are effective ways to manage it. Can you tell me more about what specifically is making you feel anxious right now?",
        is_exercise: false,
    },
    KeywordRule {
        kind: RuleKind::Sadness,
        keywords: &["sad", "depression"],
        text: "I hear that you're feeling sad. It takes courage to share that. Let's explore this together. When did you first notice these feelings, and what thoughts tend to come up when you feel this way?",
        is_exercise: false,
    },
    KeywordRule {
        kind: RuleKind::NegativeThought,
        keywords: &["negative", "thought"],
        text: "Negative thoughts can feel overwhelming. Let's work on identifying and examining these thoughts together.",
        is_exercise: true,
    },
];

#[derive(Debug, Clone)]
pub struct ResponseSelector {
    exercise_after_messages: usize,
}

impl ResponseSelector {
    /// `exercise_after_messages` counts every prior message, agent replies included.
    pub fn new(exercise_after_messages: usize) -> Self {
        Self { exercise_after_messages }
    }

    pub fn select(&self, history: &[Message], latest_user_text: &str) -> Reply {
        let lowered = latest_user_text.to_lowercase();

        let reply = match KEYWORD_RULES.iter().find(|rule| rule.matches(&lowered)) {
            Some(rule) => rule.reply(),
            None if history.len() > self.exercise_after_messages => Reply {
                text: ESCALATION_REPLY.to_string(),
                is_exercise: true,
                rule: RuleKind::ExerciseEscalation,
            },
            None => Reply {
                text: REFLECTIVE_REPLY.to_string(),
                is_exercise: false,
                rule: RuleKind::Reflective,
            },
        };

        debug!(
            "Selected {} reply (history={}, exercise={})",
            reply.rule.as_str(),
            history.len(),
            reply.is_exercise
        );
        reply
    }
}

impl Default for ResponseSelector {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Responder for ResponseSelector {
    fn respond(&self, history: &[Message], latest_user_text: &str) -> Reply {
        self.select(history, latest_user_text)
    }

    fn exercise_worksheet(&self) -> String {
        EXERCISE_WORKSHEET.to_string()
    }
}
