use chrono::{Days, NaiveDate};

use crate::engine::stats::{self, DailyStat};
use crate::store::schema::User;

/// What yesterday's record says about the daily goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalCheck {
    Met { attempted: u32 },
    Missed { attempted: u32 },
    /// No record at all for yesterday: the goal is not evaluable.
    NoRecord,
}

pub fn check_yesterday(history: &[DailyStat], daily_goal: u32, today: NaiveDate) -> GoalCheck {
    let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
        return GoalCheck::NoRecord;
    };
    match stats::for_date(history, yesterday) {
        Some(stat) if stat.attempted >= daily_goal => GoalCheck::Met {
            attempted: stat.attempted,
        },
        Some(stat) => GoalCheck::Missed {
            attempted: stat.attempted,
        },
        None => GoalCheck::NoRecord,
    }
}

pub fn already_reconciled(user: &User, today: NaiveDate) -> bool {
    matches!(user.last_goal_date, Some(last) if last >= today)
}

/// Carry the streak across a day boundary. Runs at most once per day: a
/// second call with the same `today` returns the user unchanged.
///
/// A missing record for yesterday leaves the streak alone; only a record
/// that falls short of the goal resets it.
pub fn reconcile(user: &User, history: &[DailyStat], today: NaiveDate) -> User {
    let mut updated = user.clone();
    if already_reconciled(user, today) {
        return updated;
    }

    match check_yesterday(history, user.daily_goal.max(1), today) {
        GoalCheck::Met { attempted } => {
            updated.streak = updated.streak.saturating_add(1);
            log::info!(
                "user {}: goal met yesterday ({attempted}/{}), streak now {}",
                user.id,
                user.daily_goal,
                updated.streak
            );
        }
        GoalCheck::Missed { attempted } => {
            log::info!(
                "user {}: goal missed yesterday ({attempted}/{}), streak reset from {}",
                user.id,
                user.daily_goal,
                updated.streak
            );
            updated.streak = 0;
        }
        GoalCheck::NoRecord => {
            log::debug!("user {}: no activity yesterday, streak kept", user.id);
        }
    }

    updated.best_streak = updated.best_streak.max(updated.streak);
    updated.last_goal_date = Some(today);
    updated
}
