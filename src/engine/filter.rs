use std::collections::BTreeSet;

use crate::engine::difficulty::Difficulty;
use crate::question::Question;

pub const ALL_TOPICS: &str = "All";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicFilter {
    All,
    Topic(String),
}

impl TopicFilter {
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label == ALL_TOPICS {
            TopicFilter::All
        } else {
            TopicFilter::Topic(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TopicFilter::All => ALL_TOPICS,
            TopicFilter::Topic(t) => t,
        }
    }

    pub fn matches_topic(&self, topic: &str) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Topic(t) => t == topic,
        }
    }

    pub fn matches(&self, question: &Question, difficulty: Difficulty) -> bool {
        self.matches_topic(&question.topic) && question.difficulty == difficulty
    }
}

/// Distinct topics in the bank, sorted.
pub fn topics(bank: &[Question]) -> Vec<String> {
    bank.iter()
        .map(|q| q.topic.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
