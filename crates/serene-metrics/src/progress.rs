//! Derived wellness metrics over a patient's mood log, goals and badges.

use serde::{Deserialize, Serialize};
use serene_core::{Result, SereneError};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMood {
    pub date: String,
    /// 1 (very bad) to 5 (very good).
    pub mood: u8,
    #[serde(default)]
    pub sessions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    /// Percent complete, 0..=100.
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub earned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressData {
    #[serde(default)]
    pub mood_log: Vec<DailyMood>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl ProgressData {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let data: ProgressData = if yaml.trim().is_empty() {
            ProgressData::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        data.validate()?;
        debug!(
            "Loaded progress data: {} days, {} goals, {} badges",
            data.mood_log.len(),
            data.goals.len(),
            data.badges.len()
        );
        Ok(data)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(day) = self.mood_log.iter().find(|d| !(1..=5).contains(&d.mood)) {
            return Err(SereneError::ValidationError {
                field: format!("mood_log[{}].mood", day.date),
                message: format!("mood must be between 1 and 5, got {}", day.mood),
            });
        }
        if let Some(goal) = self.goals.iter().find(|g| g.progress > 100) {
            return Err(SereneError::ValidationError {
                field: format!("goals[{}].progress", goal.name),
                message: format!("progress must be at most 100, got {}", goal.progress),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub tracked_days: usize,
    pub average_mood: f64,
    pub total_sessions: u32,
    /// Sessions per tracked day, in percent.
    pub adherence_percentage: f64,
    pub badges_earned: usize,
    pub badges_total: usize,
    pub goals: Vec<Goal>,
}

impl ProgressReport {
    pub fn from_data(data: &ProgressData) -> Self {
        let tracked_days = data.mood_log.len();
        let total_sessions: u32 = data.mood_log.iter().map(|d| d.sessions).sum();

        let (average_mood, adherence_percentage) = if tracked_days == 0 {
            (0.0, 0.0)
        } else {
            let mood_sum: u32 = data.mood_log.iter().map(|d| u32::from(d.mood)).sum();
            (
                f64::from(mood_sum) / tracked_days as f64,
                f64::from(total_sessions) / tracked_days as f64 * 100.0,
            )
        };

        Self {
            tracked_days,
            average_mood,
            total_sessions,
            adherence_percentage,
            badges_earned: data.badges.iter().filter(|b| b.earned).count(),
            badges_total: data.badges.len(),
            goals: data.goals.clone(),
        }
    }

    pub fn average_mood_display(&self) -> String {
        format!("{:.1}", self.average_mood)
    }

    pub fn adherence_display(&self) -> String {
        format!("{:.0}%", self.adherence_percentage)
    }

    pub fn sessions_summary(&self) -> String {
        format!(
            "You've completed {} out of {} recommended sessions",
            self.total_sessions, self.tracked_days
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
mood_log:
  - { date: "1/1", mood: 3, sessions: 1 }
  - { date: "1/2", mood: 3, sessions: 1 }
  - { date: "1/3", mood: 2, sessions: 0 }
  - { date: "1/4", mood: 4, sessions: 1 }
goals:
  - { name: Manage anxiety, progress: 65 }
badges:
  - { name: "First Session Complete!", icon: "🎯", earned: true, date: "Jan 15" }
  - { name: "30-Day Warrior", icon: "⚔️", earned: false }
"#;

    #[test]
    fn test_report_metrics() {
        let data = ProgressData::from_yaml_str(SAMPLE).unwrap();
        let report = ProgressReport::from_data(&data);

        assert_eq!(report.tracked_days, 4);
        assert_eq!(report.total_sessions, 3);
        assert!((report.average_mood - 3.0).abs() < f64::EPSILON);
        assert!((report.adherence_percentage - 75.0).abs() < f64::EPSILON);
        assert_eq!(report.badges_earned, 1);
        assert_eq!(report.badges_total, 2);
        assert_eq!(report.average_mood_display(), "3.0");
        assert_eq!(report.adherence_display(), "75%");
        assert_eq!(
            report.sessions_summary(),
            "You've completed 3 out of 4 recommended sessions"
        );
    }

    #[test]
    fn test_empty_log_yields_zeros() {
        let report = ProgressReport::from_data(&ProgressData::default());
        assert_eq!(report.tracked_days, 0);
        assert_eq!(report.average_mood, 0.0);
        assert_eq!(report.adherence_percentage, 0.0);

        let data = ProgressData::from_yaml_str("").unwrap();
        assert!(data.mood_log.is_empty());
    }

    #[test]
    fn test_from_yaml_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let data = ProgressData::from_yaml(file.path()).unwrap();
        assert_eq!(data.mood_log.len(), 4);
        assert_eq!(data.goals[0].name, "Manage anxiety");
        assert!(data.badges[0].earned);

        assert!(ProgressData::from_yaml(file.path().with_extension("missing")).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let bad_mood = "mood_log:\n  - { date: \"1/1\", mood: 6 }\n";
        assert!(ProgressData::from_yaml_str(bad_mood).is_err());

        let bad_goal = "goals:\n  - { name: Sleep, progress: 120 }\n";
        assert!(ProgressData::from_yaml_str(bad_goal).is_err());
    }
}
