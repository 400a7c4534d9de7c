use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::difficulty::{Difficulty, DifficultyAdapter, Shift};
use crate::engine::filter::TopicFilter;
use crate::engine::scoring;
use crate::question::{Question, option_label};
use crate::session::result::SessionResult;
use crate::session::timer::{Countdown, Tick};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no question is waiting for an answer")]
    NoActiveQuestion,
    #[error("the current question was already answered")]
    AlreadyAnswered,
    #[error("time is up for this question")]
    Locked,
    #[error("choice {choice} is outside the {count} options")]
    InvalidChoice { choice: usize, count: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: String,
    pub correct: bool,
    pub chosen_label: String,
    pub coins: u32,
}

#[derive(Clone, Debug)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub coins: u32,
    pub shift: Shift,
    /// Set once, when the last question of the set is answered.
    pub completed: Option<SessionResult>,
}

/// One practice run over a fixed pool. Discarded whole whenever the bank,
/// topic filter or active difficulty changes.
pub struct SessionState {
    pub pool: Vec<Question>,
    pub index: usize,
    pub answers: Vec<AnswerRecord>,
    pub adapter: DifficultyAdapter,
    pub topic: TopicFilter,
    pub difficulty: Difficulty,
    timer: Option<Countdown>,
    answered_current: bool,
    completed: bool,
}

impl SessionState {
    pub fn new(
        pool: Vec<Question>,
        topic: TopicFilter,
        difficulty: Difficulty,
        adaptive: bool,
        time_limit_secs: u32,
    ) -> Self {
        Self {
            pool,
            index: 0,
            answers: Vec::new(),
            adapter: DifficultyAdapter::new(difficulty, adaptive),
            topic,
            difficulty,
            timer: Countdown::from_secs(time_limit_secs),
            answered_current: false,
            completed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.completed || self.index >= self.pool.len()
    }

    pub fn current(&self) -> Option<&Question> {
        self.pool.get(self.index)
    }

    pub fn is_locked(&self) -> bool {
        self.timer.as_ref().is_some_and(Countdown::is_expired)
    }

    pub fn awaiting_answer(&self) -> bool {
        self.current().is_some() && !self.answered_current && !self.is_locked()
    }

    pub fn timer(&self) -> Option<&Countdown> {
        self.timer.as_ref()
    }

    pub fn tick(&mut self, elapsed: Duration) -> Tick {
        if self.answered_current || self.current().is_none() {
            return Tick::Idle;
        }
        match self.timer.as_mut() {
            Some(timer) => timer.tick(elapsed),
            None => Tick::Idle,
        }
    }

    pub fn pause(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.resume();
        }
    }

    pub fn submit(
        &mut self,
        choice: usize,
        now: DateTime<Utc>,
    ) -> Result<AnswerFeedback, SessionError> {
        if self.answered_current {
            return Err(SessionError::AlreadyAnswered);
        }
        if self.is_locked() {
            return Err(SessionError::Locked);
        }
        let question = self.current().ok_or(SessionError::NoActiveQuestion)?;
        if choice >= question.options.len() {
            return Err(SessionError::InvalidChoice {
                choice,
                count: question.options.len(),
            });
        }

        let correct = question.is_correct(choice);
        let coins = scoring::coins_for_answer(question.difficulty, correct);
        let correct_index = question.answer_index;
        let explanation = question.explanation.clone();
        let question_id = question.id.clone();

        self.answers.push(AnswerRecord {
            question_id,
            correct,
            chosen_label: option_label(choice).to_string(),
            coins,
        });
        self.answered_current = true;
        self.pause();

        let shift = self.adapter.record(correct);
        log::debug!(
            "answered {}/{}: correct={correct} streaks={}/{}",
            self.index + 1,
            self.pool.len(),
            self.adapter.correct_streak,
            self.adapter.wrong_streak
        );

        let completed = if self.index + 1 >= self.pool.len() {
            self.complete(now)
        } else {
            None
        };

        Ok(AnswerFeedback {
            correct,
            correct_index,
            explanation,
            coins,
            shift,
            completed,
        })
    }

    /// Move to the next question. Leaving the last question behind unanswered
    /// (after a timeout) completes the set with whatever was answered.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<SessionResult> {
        if self.current().is_none() {
            return None;
        }
        self.index += 1;
        self.answered_current = false;
        if let Some(timer) = self.timer.as_mut() {
            timer.restart();
        }
        if self.index >= self.pool.len() {
            self.complete(now)
        } else {
            None
        }
    }

    fn complete(&mut self, now: DateTime<Utc>) -> Option<SessionResult> {
        if self.completed {
            return None;
        }
        self.completed = true;
        Some(SessionResult::from_answers(
            &self.answers,
            self.topic.label(),
            self.difficulty,
            now,
        ))
    }

    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.correct).count()
    }

    pub fn progress(&self) -> f64 {
        if self.pool.is_empty() {
            return 0.0;
        }
        self.answers.len() as f64 / self.pool.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str, answer: usize, difficulty: Difficulty) -> Question {
        Question::new(
            id.into(),
            format!("prompt {id}"),
            vec!["w".into(), "x".into(), "y".into(), "z".into()],
            answer,
            "General",
            difficulty,
        )
        .with_explanation(format!("because {id}"))
    }

    fn session(n: usize, time_limit: u32) -> SessionState {
        let pool = (0..n)
            .map(|i| q(&format!("q{i}"), i % 4, Difficulty::Easy))
            .collect();
        SessionState::new(pool, TopicFilter::All, Difficulty::Easy, true, time_limit)
    }

    #[test]
    fn test_new_session() {
        let s = session(3, 0);
        assert_eq!(s.index, 0);
        assert!(!s.is_complete());
        assert!(s.awaiting_answer());
        assert_eq!(s.progress(), 0.0);
    }

    #[test]
    fn test_empty_session_is_complete() {
        let s = session(0, 0);
        assert!(s.is_empty());
        assert!(s.is_complete());
        assert!(s.current().is_none());
    }

    #[test]
    fn test_submit_records_answer_and_feedback() {
        let mut s = session(2, 0);
        let fb = s.submit(0, Utc::now()).unwrap();
        assert!(fb.correct);
        assert_eq!(fb.correct_index, 0);
        assert_eq!(fb.coins, 1);
        assert_eq!(fb.explanation.as_deref(), Some("because q0"));
        assert!(fb.completed.is_none());
        assert_eq!(s.answers[0].chosen_label, "A");
        assert_eq!(
            s.submit(1, Utc::now()).unwrap_err(),
            SessionError::AlreadyAnswered
        );
    }

    #[test]
    fn test_invalid_choice_rejected() {
        let mut s = session(1, 0);
        assert_eq!(
            s.submit(4, Utc::now()).unwrap_err(),
            SessionError::InvalidChoice { choice: 4, count: 4 }
        );
        assert!(s.answers.is_empty());
    }

    #[test]
    fn test_last_answer_completes_set_once() {
        let mut s = session(2, 0);
        s.submit(0, Utc::now()).unwrap();
        assert!(s.advance(Utc::now()).is_none());
        let fb = s.submit(3, Utc::now()).unwrap();
        assert!(!fb.correct);
        let result = fb.completed.expect("set completes on last answer");
        assert_eq!(result.attempted, 2);
        assert_eq!(result.correct, 1);
        assert!(s.advance(Utc::now()).is_none());
        assert!(s.is_complete());
    }

    #[test]
    fn test_timer_expiry_locks_until_next_question() {
        let mut s = session(2, 5);
        assert_eq!(s.tick(Duration::from_secs(5)), Tick::Expired);
        assert!(s.is_locked());
        assert_eq!(s.submit(0, Utc::now()).unwrap_err(), SessionError::Locked);
        assert!(s.advance(Utc::now()).is_none());
        assert!(!s.is_locked());
        assert!(s.submit(1, Utc::now()).is_ok());
    }

    #[test]
    fn test_timeout_on_last_question_completes_with_answered_only() {
        let mut s = session(2, 5);
        s.submit(0, Utc::now()).unwrap();
        s.advance(Utc::now());
        s.tick(Duration::from_secs(6));
        let result = s.advance(Utc::now()).expect("set completes");
        assert_eq!(result.attempted, 1);
        assert_eq!(result.correct, 1);
    }

    #[test]
    fn test_three_correct_answers_promote() {
        let mut s = session(5, 0);
        let mut last = Shift::Unchanged;
        for i in 0..3 {
            let answer = s.current().unwrap().answer_index;
            last = s.submit(answer, Utc::now()).unwrap().shift;
            if i < 2 {
                s.advance(Utc::now());
            }
        }
        assert_eq!(
            last,
            Shift::Promoted {
                from: Difficulty::Easy,
                to: Difficulty::Normal
            }
        );
    }

    #[test]
    fn test_answered_question_ignores_ticks() {
        let mut s = session(2, 3);
        s.submit(0, Utc::now()).unwrap();
        assert_eq!(s.tick(Duration::from_secs(10)), Tick::Idle);
        assert!(!s.is_locked());
    }
}
