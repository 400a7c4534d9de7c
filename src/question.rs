use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::difficulty::Difficulty;

pub const OPTION_COUNT: usize = 4;
pub const DEFAULT_TOPIC: &str = "General";
const PADDING_OPTION: &str = "N/A";

/// A multiple-choice question. After `normalize`, `options` holds exactly
/// four entries and `answer_index` points into it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, deserialize_with = "lenient_index")]
    pub answer_index: usize,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default = "default_topic", deserialize_with = "lenient_topic")]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn lenient_topic<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(t)) if !t.trim().is_empty() => t,
        _ => default_topic(),
    })
}

// Negative, fractional, stringly or missing indexes all degrade to something clampable.
fn lenient_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match raw {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(clamp_answer_index(parsed.unwrap_or(0)))
}

/// Clamp any signed index into `[0, OPTION_COUNT - 1]`.
pub fn clamp_answer_index(raw: i64) -> usize {
    raw.clamp(0, OPTION_COUNT as i64 - 1) as usize
}

/// Random id for authored, drafted and imported questions.
pub fn new_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "q-{:08x}{:08x}",
        rng.gen_range(0..=u32::MAX),
        rng.gen_range(0..=u32::MAX)
    )
}

impl Question {
    pub fn new(
        id: String,
        prompt: String,
        options: Vec<String>,
        answer_index: usize,
        topic: &str,
        difficulty: Difficulty,
    ) -> Self {
        let mut question = Self {
            id,
            prompt,
            options,
            answer_index,
            explanation: None,
            topic: topic.to_string(),
            difficulty,
        };
        question.normalize();
        question
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        self.explanation = if explanation.trim().is_empty() {
            None
        } else {
            Some(explanation)
        };
        self
    }

    /// Bring a question into the four-option contract.
    pub fn normalize(&mut self) {
        self.options.truncate(OPTION_COUNT);
        while self.options.len() < OPTION_COUNT {
            self.options.push(PADDING_OPTION.to_string());
        }
        self.answer_index = self.answer_index.min(OPTION_COUNT - 1);
        if self.topic.trim().is_empty() {
            self.topic = default_topic();
        }
    }

    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.answer_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer_index
    }
}

/// Option letter shown next to each choice.
pub fn option_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}
