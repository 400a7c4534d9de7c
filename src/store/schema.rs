use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::engine::difficulty::Difficulty;
use crate::engine::stats::DailyStat;
use crate::question::Question;
use crate::session::result::SessionResult;

pub const GUEST_ID: &str = "guest";
const SESSION_HISTORY_CAP: usize = 500;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUnlocks {
    #[serde(default = "default_true")]
    pub easy: bool,
    #[serde(default)]
    pub normal: bool,
    #[serde(default)]
    pub hard: bool,
}

fn default_true() -> bool {
    true
}

// A field of the wrong type or out of range reads as its default instead of
// failing the record it belongs to.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

fn lenient_goal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_else(|_| default_daily_goal()))
}

/// Decode a map entry by entry; entries that are not a readable record are
/// dropped with a warning.
fn lenient_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        log::warn!("expected a map of records, ignoring");
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value(value) {
            Ok(record) => Some((key, record)),
            Err(e) => {
                log::warn!("skipping unreadable record {key:?}: {e}");
                None
            }
        })
        .collect())
}

/// Sequence counterpart of `lenient_map`.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        log::warn!("expected a list of records, ignoring");
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("skipping unreadable record: {e}");
                None
            }
        })
        .collect())
}

impl Default for LevelUnlocks {
    fn default() -> Self {
        Self {
            easy: true,
            normal: false,
            hard: false,
        }
    }
}

impl LevelUnlocks {
    pub fn is_unlocked(&self, level: Difficulty) -> bool {
        match level {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
        }
    }

    pub fn unlock(&mut self, level: Difficulty) {
        match level {
            Difficulty::Easy => self.easy = true,
            Difficulty::Normal => self.normal = true,
            Difficulty::Hard => self.hard = true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Re-synced from the directory key by `UsersData::ensure_guest`.
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub coins: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub streak: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub best_streak: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub badges: BTreeSet<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub level_unlocked: LevelUnlocks,
    #[serde(default = "default_daily_goal", deserialize_with = "lenient_goal")]
    pub daily_goal: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub last_goal_date: Option<NaiveDate>,
}

fn default_daily_goal() -> u32 {
    20
}

impl User {
    pub fn new(id: &str, name: &str, daily_goal: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            coins: 0,
            streak: 0,
            best_streak: 0,
            badges: BTreeSet::new(),
            level_unlocked: LevelUnlocks::default(),
            daily_goal: daily_goal.max(1),
            last_goal_date: None,
        }
    }

    pub fn guest(daily_goal: u32) -> Self {
        Self::new(GUEST_ID, "Guest", daily_goal)
    }

    fn repair(&mut self) {
        self.daily_goal = self.daily_goal.max(1);
        self.best_streak = self.best_streak.max(self.streak);
    }
}

/// User directory; the guest entry always exists after `ensure_guest`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UsersData {
    #[serde(default, deserialize_with = "lenient_map")]
    pub users: BTreeMap<String, User>,
}

impl UsersData {
    pub fn ensure_guest(&mut self, daily_goal: u32) {
        self.users
            .entry(GUEST_ID.to_string())
            .or_insert_with(|| User::guest(daily_goal));
        for (id, user) in self.users.iter_mut() {
            if user.id != *id {
                user.id = id.clone();
            }
            user.repair();
        }
    }
}

/// Persisted pointer to the active user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionPointer {
    #[serde(default = "default_uid")]
    pub uid: String,
}

fn default_uid() -> String {
    GUEST_ID.to_string()
}

impl Default for SessionPointer {
    fn default() -> Self {
        Self { uid: default_uid() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dark: bool,
    #[serde(default)]
    pub notifications: bool,
}

/// Per-user progress log: day tallies plus completed set summaries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsData {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub history: Vec<DailyStat>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub sessions: Vec<SessionResult>,
}

impl StatsData {
    pub fn push_session(&mut self, result: SessionResult) {
        self.sessions.push(result);
        if self.sessions.len() > SESSION_HISTORY_CAP {
            let excess = self.sessions.len() - SESSION_HISTORY_CAP;
            self.sessions.drain(..excess);
        }
    }
}

pub const EXPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub quizdeck_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub config: Config,
    pub questions: Vec<Question>,
    pub users: UsersData,
    pub session: SessionPointer,
    pub settings: Settings,
    pub stats: BTreeMap<String, StatsData>,
}
