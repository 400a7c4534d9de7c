use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};

use crate::question::Question;

pub const QUESTIONS_KEY: &str = "questions";
pub const USERS_KEY: &str = "users";
pub const SESSION_KEY: &str = "session";
pub const SETTINGS_KEY: &str = "settings";
const STATS_PREFIX: &str = "stats.";

pub fn stats_key(uid: &str) -> String {
    format!("{STATS_PREFIX}{uid}")
}

pub fn uid_from_stats_key(key: &str) -> Option<&str> {
    key.strip_prefix(STATS_PREFIX)
}

/// Plain string key-value storage. Reads and writes are treated as atomic.
pub trait Repository {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// Load a record, degrading to the default when it is missing or unreadable.
pub fn load_or_default<T: DeserializeOwned + Default>(repo: &dyn Repository, key: &str) -> T {
    match repo.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("record {key:?} is corrupt ({e}), using defaults");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("record {key:?} could not be read ({e}), using defaults");
            T::default()
        }
    }
}

pub fn save_record<T: Serialize>(repo: &dyn Repository, key: &str, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    repo.set(key, &json)
}

/// Load the question bank entry by entry, so one bad record does not
/// take the rest of the bank down with it.
pub fn load_questions(repo: &dyn Repository) -> Vec<Question> {
    let values: Vec<serde_json::Value> = load_or_default(repo, QUESTIONS_KEY);
    let total = values.len();
    let questions: Vec<Question> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Question>(value) {
            Ok(mut q) => {
                q.normalize();
                Some(q)
            }
            Err(e) => {
                log::warn!("skipping unreadable question record: {e}");
                None
            }
        })
        .collect();
    if questions.len() < total {
        log::warn!("loaded {} of {total} questions", questions.len());
    }
    questions
}

pub fn save_questions(repo: &dyn Repository, questions: &[Question]) -> Result<()> {
    save_record(repo, QUESTIONS_KEY, &questions)
}
