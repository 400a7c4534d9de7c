use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

const PROMOTE_AFTER_CORRECT: u32 = 3;
const DEMOTE_AFTER_WRONG: u32 = 2;

/// Difficulty ladder, ordered `Easy < Normal < Hard`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Unknown or empty labels fall back to `Easy`.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn harder(self) -> Option<Self> {
        match self {
            Difficulty::Easy => Some(Difficulty::Normal),
            Difficulty::Normal => Some(Difficulty::Hard),
            Difficulty::Hard => None,
        }
    }

    pub fn easier(self) -> Option<Self> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Normal => Some(Difficulty::Easy),
            Difficulty::Hard => Some(Difficulty::Normal),
        }
    }

    /// Round-robin assignment used for drafted questions.
    pub fn cycle(position: usize) -> Self {
        Self::ALL[position % Self::ALL.len()]
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Persisted banks may carry any string (or nothing) here.
impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => Difficulty::parse_lenient(&s),
            _ => Difficulty::default(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shift {
    Unchanged,
    Promoted { from: Difficulty, to: Difficulty },
    Demoted { from: Difficulty, to: Difficulty },
}

impl Shift {
    pub fn target(self) -> Option<Difficulty> {
        match self {
            Shift::Unchanged => None,
            Shift::Promoted { to, .. } | Shift::Demoted { to, .. } => Some(to),
        }
    }
}

/// Moves the active difficulty along the ladder from the running
/// correct/wrong streaks. Exactly one streak is non-zero after any answer.
#[derive(Clone, Debug)]
pub struct DifficultyAdapter {
    pub active: Difficulty,
    pub correct_streak: u32,
    pub wrong_streak: u32,
    pub enabled: bool,
}

impl DifficultyAdapter {
    pub fn new(active: Difficulty, enabled: bool) -> Self {
        Self {
            active,
            correct_streak: 0,
            wrong_streak: 0,
            enabled,
        }
    }

    pub fn record(&mut self, correct: bool) -> Shift {
        if correct {
            self.correct_streak += 1;
            self.wrong_streak = 0;
        } else {
            self.wrong_streak += 1;
            self.correct_streak = 0;
        }

        if !self.enabled {
            return Shift::Unchanged;
        }

        let shift = self.evaluate();
        if let Some(to) = shift.target() {
            // A level change rebuilds the session, which starts both streaks over.
            self.active = to;
            self.correct_streak = 0;
            self.wrong_streak = 0;
        }
        shift
    }

    /// Promotion is checked first; at most one move per evaluation.
    fn evaluate(&self) -> Shift {
        let from = self.active;
        if self.correct_streak >= PROMOTE_AFTER_CORRECT {
            return match from.harder() {
                Some(to) => Shift::Promoted { from, to },
                None => Shift::Unchanged,
            };
        }
        if self.wrong_streak >= DEMOTE_AFTER_WRONG {
            return match from.easier() {
                Some(to) => Shift::Demoted { from, to },
                None => Shift::Unchanged,
            };
        }
        Shift::Unchanged
    }
}
