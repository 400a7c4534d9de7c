use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::difficulty::Difficulty;
use crate::session::state::AnswerRecord;

/// Summary of one completed practice set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionResult {
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_topic_label")]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub attempted: u32,
    pub correct: u32,
    #[serde(default)]
    pub coins: u32,
}

fn default_topic_label() -> String {
    "All".to_string()
}

impl SessionResult {
    pub fn from_answers(
        answers: &[AnswerRecord],
        topic: &str,
        difficulty: Difficulty,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let attempted = answers.len() as u32;
        let correct = answers.iter().filter(|a| a.correct).count() as u32;
        let coins = answers.iter().map(|a| a.coins).sum();
        Self {
            timestamp,
            topic: topic.to_string(),
            difficulty,
            attempted,
            correct,
            coins,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempted == 0 {
            return 100.0;
        }
        (self.correct as f64 / self.attempted as f64 * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(correct: bool, coins: u32) -> AnswerRecord {
        AnswerRecord {
            question_id: "q".into(),
            correct,
            chosen_label: "A".into(),
            coins,
        }
    }

    #[test]
    fn counts_answers_and_coins() {
        let answers = vec![answer(true, 2), answer(false, 0), answer(true, 2)];
        let result = SessionResult::from_answers(&answers, "Bio", Difficulty::Normal, Utc::now());
        assert_eq!(result.attempted, 3);
        assert_eq!(result.correct, 2);
        assert_eq!(result.coins, 4);
        assert!((result.accuracy() - 66.666).abs() < 0.01);
    }

    #[test]
    fn empty_set_is_full_accuracy() {
        let result = SessionResult::from_answers(&[], "All", Difficulty::Easy, Utc::now());
        assert_eq!(result.accuracy(), 100.0);
    }
}
