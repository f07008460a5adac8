use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serene_core::RuleKind;
use std::collections::HashMap;

pub mod progress;

pub use progress::{Badge, DailyMood, Goal, ProgressData, ProgressReport};

/// Counters for one CBT session: which rules fired and what got delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionMetrics {
    pub user_messages: usize,
    pub ignored_inputs: usize,
    pub replies_delivered: usize,
    pub exercises_delivered: usize,
    pub cancelled_deliveries: usize,
    pub rule_hits: HashMap<RuleKind, usize>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SelectionMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn record_selection(&mut self, rule: RuleKind) {
        self.user_messages += 1;
        *self.rule_hits.entry(rule).or_insert(0) += 1;
    }

    pub fn record_ignored_input(&mut self) {
        self.ignored_inputs += 1;
    }

    pub fn record_reply(&mut self) {
        self.replies_delivered += 1;
    }

    pub fn record_exercise(&mut self) {
        self.exercises_delivered += 1;
    }

    pub fn record_cancelled(&mut self) {
        self.cancelled_deliveries += 1;
    }

    pub fn hits(&self, rule: RuleKind) -> usize {
        self.rule_hits.get(&rule).copied().unwrap_or(0)
    }

    /// Share of user messages answered with an exercise-flagged reply, in percent.
    pub fn exercise_rate(&self) -> f64 {
        if self.user_messages == 0 {
            return 0.0;
        }
        let exercise_replies =
            self.hits(RuleKind::NegativeThought) + self.hits(RuleKind::ExerciseEscalation);
        exercise_replies as f64 / self.user_messages as f64 * 100.0
    }

    pub fn get_summary(&self) -> MetricsSummary {
        MetricsSummary {
            user_messages: self.user_messages,
            replies_delivered: self.replies_delivered,
            exercises_delivered: self.exercises_delivered,
            exercise_rate: self.exercise_rate(),
            duration_seconds: self
                .started_at
                .map(|start| (Utc::now() - start).num_seconds().max(0) as u64)
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub user_messages: usize,
    pub replies_delivered: usize,
    pub exercises_delivered: usize,
    pub exercise_rate: f64,
    pub duration_seconds: u64,
}
