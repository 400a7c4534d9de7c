use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day tally for one user. `correct <= attempted` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    #[serde(default)]
    pub attempted: u32,
    #[serde(default)]
    pub correct: u32,
}

impl DailyStat {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            attempted: 0,
            correct: 0,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.correct as f64 / self.attempted as f64 * 100.0
    }

    fn add(&mut self, attempted_delta: u32, correct_delta: u32) {
        self.attempted = self.attempted.saturating_add(attempted_delta);
        self.correct = self
            .correct
            .saturating_add(correct_delta)
            .min(self.attempted);
    }
}

/// Fold one completed set into the history: increments `date` in place,
/// or appends a fresh record for it. A day is only recorded once something
/// was attempted on it.
pub fn record(
    mut history: Vec<DailyStat>,
    date: NaiveDate,
    attempted_delta: u32,
    correct_delta: u32,
) -> Vec<DailyStat> {
    if correct_delta > attempted_delta {
        log::warn!(
            "correct delta {correct_delta} exceeds attempted delta {attempted_delta}, capping"
        );
    }
    let correct_delta = correct_delta.min(attempted_delta);

    match history.iter_mut().find(|s| s.date == date) {
        Some(stat) => stat.add(attempted_delta, correct_delta),
        None if attempted_delta == 0 => {
            log::debug!("nothing attempted on {date}, no record created");
        }
        None => {
            let mut stat = DailyStat::new(date);
            stat.add(attempted_delta, correct_delta);
            history.push(stat);
        }
    }
    history
}

pub fn for_date(history: &[DailyStat], date: NaiveDate) -> Option<&DailyStat> {
    history.iter().find(|s| s.date == date)
}

/// Restore the per-record invariant on data loaded from disk.
pub fn repair(history: &mut [DailyStat]) {
    for stat in history.iter_mut() {
        if stat.correct > stat.attempted {
            log::warn!(
                "daily stat {} has correct {} > attempted {}, clamping",
                stat.date,
                stat.correct,
                stat.attempted
            );
            stat.correct = stat.attempted;
        }
    }
}

/// (attempted, correct) over the whole history.
pub fn totals(history: &[DailyStat]) -> (u64, u64) {
    history.iter().fold((0, 0), |(a, c), s| {
        (a + s.attempted as u64, c + s.correct as u64)
    })
}

/// The last `days` records, newest first.
pub fn recent(history: &[DailyStat], days: usize) -> Vec<&DailyStat> {
    let mut sorted: Vec<&DailyStat> = history.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(days);
    sorted
}
