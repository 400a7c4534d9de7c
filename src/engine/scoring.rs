use crate::engine::difficulty::Difficulty;
use crate::session::result::SessionResult;
use crate::store::schema::User;

const STREAK_BADGES: &[(u32, &str)] = &[(3, "streak-3"), (7, "streak-7"), (30, "streak-30")];
const COIN_BADGE_THRESHOLD: u32 = 100;
const PERFECT_SET_MIN: u32 = 5;

pub fn coins_for_answer(difficulty: Difficulty, correct: bool) -> u32 {
    if !correct {
        return 0;
    }
    match difficulty {
        Difficulty::Easy => 1,
        Difficulty::Normal => 2,
        Difficulty::Hard => 3,
    }
}

/// Mark `reached` (and everything below it) as unlocked.
/// Returns true if anything new was unlocked.
pub fn unlock_level(user: &mut User, reached: Difficulty) -> bool {
    let mut changed = false;
    for level in Difficulty::ALL.into_iter().filter(|l| *l <= reached) {
        if !user.level_unlocked.is_unlocked(level) {
            user.level_unlocked.unlock(level);
            changed = true;
        }
    }
    changed
}

/// Badges earned by the user's current streak and coin balance.
pub fn progress_badges(user: &mut User) -> Vec<String> {
    let mut earned = Vec::new();
    for &(days, badge) in STREAK_BADGES {
        if user.streak >= days && user.badges.insert(badge.to_string()) {
            earned.push(badge.to_string());
        }
    }
    if user.coins >= COIN_BADGE_THRESHOLD && user.badges.insert("coins-100".to_string()) {
        earned.push("coins-100".to_string());
    }
    earned
}

/// Badges earned by completing a set.
pub fn set_badges(user: &mut User, result: &SessionResult) -> Vec<String> {
    let mut earned = Vec::new();
    if user.badges.insert("first-set".to_string()) {
        earned.push("first-set".to_string());
    }
    if result.attempted >= PERFECT_SET_MIN
        && result.correct == result.attempted
        && user.badges.insert("perfect-set".to_string())
    {
        earned.push("perfect-set".to_string());
    }
    earned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(attempted: u32, correct: u32) -> SessionResult {
        SessionResult {
            timestamp: chrono::Utc::now(),
            topic: "All".to_string(),
            difficulty: Difficulty::Easy,
            attempted,
            correct,
            coins: correct,
        }
    }

    #[test]
    fn test_coins_scale_with_difficulty() {
        assert_eq!(coins_for_answer(Difficulty::Easy, true), 1);
        assert_eq!(coins_for_answer(Difficulty::Hard, true), 3);
        assert_eq!(coins_for_answer(Difficulty::Hard, false), 0);
    }

    #[test]
    fn test_unlock_level_fills_lower_levels() {
        let mut user = User::new("u", "U", 10);
        assert!(user.level_unlocked.easy);
        assert!(unlock_level(&mut user, Difficulty::Hard));
        assert!(user.level_unlocked.normal);
        assert!(user.level_unlocked.hard);
        assert!(!unlock_level(&mut user, Difficulty::Normal));
    }

    #[test]
    fn test_streak_badges_awarded_once() {
        let mut user = User::new("u", "U", 10);
        user.streak = 7;
        let earned = progress_badges(&mut user);
        assert_eq!(earned, vec!["streak-3".to_string(), "streak-7".to_string()]);
        assert!(progress_badges(&mut user).is_empty());
    }

    #[test]
    fn test_perfect_set_requires_minimum_length() {
        let mut user = User::new("u", "U", 10);
        let earned = set_badges(&mut user, &result(3, 3));
        assert_eq!(earned, vec!["first-set".to_string()]);
        let earned = set_badges(&mut user, &result(5, 5));
        assert_eq!(earned, vec!["perfect-set".to_string()]);
    }
}
