use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand::rngs::SmallRng;

use crate::config::Config;
use crate::engine::difficulty::{Difficulty, Shift};
use crate::engine::filter::{self, TopicFilter};
use crate::engine::{scoring, stats, streak};
use crate::generator::draft::DraftEngine;
use crate::generator::{QuestionDrafter, ensure_draftable};
use crate::question::{self, Question};
use crate::session::result::SessionResult;
use crate::session::selector::build_session;
use crate::session::state::{AnswerFeedback, SessionState};
use crate::session::timer::Tick;
use crate::store::csv_import::{self, ImportReport};
use crate::store::repository::{
    self, Repository, SESSION_KEY, SETTINGS_KEY, USERS_KEY, load_or_default, save_record,
    stats_key,
};
use crate::store::schema::{GUEST_ID, SessionPointer, Settings, StatsData, User, UsersData};

/// What the caller learns from one submitted answer.
#[derive(Clone, Debug)]
pub struct AnswerOutcome {
    pub feedback: AnswerFeedback,
    pub new_badges: Vec<String>,
    /// Set when the answer moved the difficulty and the session was rebuilt.
    pub rebuilt_at: Option<Difficulty>,
}

/// Imperative shell: owns loaded state, routes events through the engine
/// and writes results back to the repository.
pub struct QuizApp<R: Repository> {
    pub config: Config,
    pub settings: Settings,
    repo: R,
    bank: Vec<Question>,
    users: UsersData,
    uid: String,
    stats: StatsData,
    topic: TopicFilter,
    difficulty: Difficulty,
    session: SessionState,
    rng: SmallRng,
}

impl<R: Repository> QuizApp<R> {
    pub fn new(repo: R, config: Config) -> Self {
        Self::with_rng(repo, config, SmallRng::from_entropy())
    }

    pub fn with_rng(repo: R, mut config: Config, rng: SmallRng) -> Self {
        config.validate();
        let bank = repository::load_questions(&repo);
        let mut users: UsersData = load_or_default(&repo, USERS_KEY);
        users.ensure_guest(config.daily_goal);
        let pointer: SessionPointer = load_or_default(&repo, SESSION_KEY);
        let uid = if users.users.contains_key(&pointer.uid) {
            pointer.uid
        } else {
            log::warn!("session user {:?} not found, falling back to guest", pointer.uid);
            GUEST_ID.to_string()
        };
        let settings: Settings = load_or_default(&repo, SETTINGS_KEY);
        let stats = Self::load_stats(&repo, &uid);
        let session = SessionState::new(
            Vec::new(),
            TopicFilter::All,
            Difficulty::Easy,
            config.adaptive,
            config.question_time_secs,
        );

        let mut app = Self {
            config,
            settings,
            repo,
            bank,
            users,
            uid,
            stats,
            topic: TopicFilter::All,
            difficulty: Difficulty::Easy,
            session,
            rng,
        };
        app.rebuild_session();
        app
    }

    fn load_stats(repo: &R, uid: &str) -> StatsData {
        let mut data: StatsData = load_or_default(repo, &stats_key(uid));
        stats::repair(&mut data.history);
        data
    }

    // ── users ───────────────────────────────────────────────────────────

    pub fn current_user(&self) -> &User {
        // Invariant: `with_rng` runs `ensure_guest` and falls back to guest for an
        // unknown pointer, and `sign_in` inserts before switching. No path removes
        // a user, so the guest lookup cannot miss.
        self.users
            .users
            .get(&self.uid)
            .or_else(|| self.users.users.get(GUEST_ID))
            .expect("guest user is always present")
    }

    fn current_user_mut(&mut self) -> &mut User {
        let goal = self.config.daily_goal;
        self.users
            .users
            .entry(self.uid.clone())
            .or_insert_with(|| User::guest(goal))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.users.values()
    }

    pub fn stats(&self) -> &StatsData {
        &self.stats
    }

    /// Switch to `uid`, creating the user on first sign-in.
    pub fn sign_in(&mut self, uid: &str, name: Option<&str>) -> Result<()> {
        let uid = uid.trim();
        if uid.is_empty() {
            bail!("user id must not be empty");
        }
        let goal = self.config.daily_goal;
        let user = self
            .users
            .users
            .entry(uid.to_string())
            .or_insert_with(|| {
                log::info!("creating user {uid}");
                User::new(uid, name.unwrap_or(uid), goal)
            });
        if let Some(name) = name {
            user.name = name.to_string();
        }
        self.switch_to(uid.to_string())
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.switch_to(GUEST_ID.to_string())
    }

    fn switch_to(&mut self, uid: String) -> Result<()> {
        self.uid = uid;
        self.stats = Self::load_stats(&self.repo, &self.uid);
        save_record(&self.repo, USERS_KEY, &self.users)?;
        save_record(
            &self.repo,
            SESSION_KEY,
            &SessionPointer {
                uid: self.uid.clone(),
            },
        )?;
        self.rebuild_session();
        Ok(())
    }

    pub fn set_daily_goal(&mut self, goal: u32) -> Result<()> {
        self.current_user_mut().daily_goal = goal.max(1);
        save_record(&self.repo, USERS_KEY, &self.users)
    }

    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        self.settings = settings;
        save_record(&self.repo, SETTINGS_KEY, &self.settings)
    }

    /// Reconcile the streak for `today` if this is the first activity of
    /// the day. Returns true when anything changed.
    pub fn begin_day(&mut self, today: NaiveDate) -> Result<bool> {
        if streak::already_reconciled(self.current_user(), today) {
            return Ok(false);
        }
        let mut updated = streak::reconcile(self.current_user(), &self.stats.history, today);
        let earned = scoring::progress_badges(&mut updated);
        if !earned.is_empty() {
            log::info!("user {} earned {earned:?}", updated.id);
        }
        *self.current_user_mut() = updated;
        save_record(&self.repo, USERS_KEY, &self.users)?;
        Ok(true)
    }

    /// (attempted today, daily goal)
    pub fn today_progress(&self, today: NaiveDate) -> (u32, u32) {
        let attempted = stats::for_date(&self.stats.history, today)
            .map(|s| s.attempted)
            .unwrap_or(0);
        (attempted, self.current_user().daily_goal)
    }

    // ── sessions ────────────────────────────────────────────────────────

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn topic(&self) -> &TopicFilter {
        &self.topic
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn topics(&self) -> Vec<String> {
        filter::topics(&self.bank)
    }

    pub fn set_filter(&mut self, topic: TopicFilter, difficulty: Difficulty) {
        self.topic = topic;
        self.difficulty = difficulty;
        self.rebuild_session();
    }

    /// Start over with a fresh sample for the current filter.
    pub fn restart_session(&mut self) {
        self.rebuild_session();
    }

    fn rebuild_session(&mut self) {
        let pool = build_session(
            &self.bank,
            &self.topic,
            self.difficulty,
            self.config.session_size,
            &mut self.rng,
        );
        if pool.is_empty() {
            log::info!(
                "no questions for topic {} at {}",
                self.topic.label(),
                self.difficulty
            );
        }
        self.session = SessionState::new(
            pool,
            self.topic.clone(),
            self.difficulty,
            self.config.adaptive,
            self.config.question_time_secs,
        );
    }

    pub fn tick(&mut self, elapsed: Duration) -> Tick {
        self.session.tick(elapsed)
    }

    /// `now` carries the learner's zone: its local date decides which day is
    /// credited and reconciled.
    pub fn answer<Tz: TimeZone>(
        &mut self,
        choice: usize,
        now: DateTime<Tz>,
    ) -> Result<AnswerOutcome> {
        let today = now.date_naive();
        let now = now.with_timezone(&Utc);
        self.begin_day(today)?;
        let feedback = self.session.submit(choice, now)?;

        let mut new_badges = Vec::new();
        let user = self.current_user_mut();
        user.coins = user.coins.saturating_add(feedback.coins);

        if let Some(result) = feedback.completed.clone() {
            new_badges.extend(self.credit_set(result, today)?);
        }

        let mut rebuilt_at = None;
        if let Shift::Promoted { to, .. } | Shift::Demoted { to, .. } = feedback.shift {
            log::info!("difficulty moved {} -> {to}", self.difficulty);
            if scoring::unlock_level(self.current_user_mut(), to) {
                log::info!("unlocked {to} for {}", self.uid);
            }
            self.difficulty = to;
            rebuilt_at = Some(to);
        }

        new_badges.extend(scoring::progress_badges(self.current_user_mut()));
        save_record(&self.repo, USERS_KEY, &self.users)?;

        if rebuilt_at.is_some() {
            self.rebuild_session();
        }

        Ok(AnswerOutcome {
            feedback,
            new_badges,
            rebuilt_at,
        })
    }

    /// Move past the current question; credits the set if that finished it.
    pub fn next_question<Tz: TimeZone>(
        &mut self,
        now: DateTime<Tz>,
    ) -> Result<Option<SessionResult>> {
        let today = now.date_naive();
        let completed = self.session.advance(now.with_timezone(&Utc));
        if let Some(result) = completed.clone() {
            self.credit_set(result, today)?;
            save_record(&self.repo, USERS_KEY, &self.users)?;
        }
        Ok(completed)
    }

    fn credit_set(&mut self, result: SessionResult, date: NaiveDate) -> Result<Vec<String>> {
        if result.attempted == 0 {
            // every question timed out; no answer means no record for the day
            log::info!("set for {} ended without answers, nothing credited", self.uid);
            return Ok(Vec::new());
        }
        log::info!(
            "set complete for {}: {}/{} correct at {}",
            self.uid,
            result.correct,
            result.attempted,
            result.difficulty
        );
        let history = std::mem::take(&mut self.stats.history);
        self.stats.history = stats::record(history, date, result.attempted, result.correct);
        let earned = scoring::set_badges(self.current_user_mut(), &result);
        self.stats.push_session(result);
        save_record(&self.repo, &stats_key(&self.uid), &self.stats)?;
        Ok(earned)
    }

    // ── question bank ───────────────────────────────────────────────────

    pub fn bank(&self) -> &[Question] {
        &self.bank
    }

    fn bank_changed(&mut self) -> Result<()> {
        repository::save_questions(&self.repo, &self.bank)?;
        self.rebuild_session();
        Ok(())
    }

    /// Draft questions from extracted text and append them to the bank.
    pub fn draft_into_bank(&mut self, text: &str, topic: &str) -> Result<usize> {
        ensure_draftable(text, self.config.min_draft_chars)?;
        let seed = self.rng.gen_range(0..u64::MAX);
        let mut engine = DraftEngine::seeded(seed).with_limit(self.config.draft_limit);
        let drafts = engine.draft_all(text, topic)?;
        let count = drafts.len();
        self.bank.extend(drafts);
        self.bank_changed()?;
        log::info!("drafted {count} questions into topic {topic}");
        Ok(count)
    }

    pub fn import_csv(&mut self, text: &str) -> Result<ImportReport> {
        let report = csv_import::parse_csv(text, &mut self.rng);
        self.bank.extend(report.questions.iter().cloned());
        self.bank_changed()?;
        Ok(report)
    }

    pub fn add_question(&mut self, mut q: Question) -> Result<String> {
        if q.id.trim().is_empty() || self.bank.iter().any(|b| b.id == q.id) {
            q.id = question::new_id(&mut self.rng);
        }
        q.normalize();
        let id = q.id.clone();
        self.bank.push(q);
        self.bank_changed()?;
        Ok(id)
    }

    pub fn update_question(&mut self, id: &str, mut q: Question) -> Result<()> {
        let Some(slot) = self.bank.iter_mut().find(|b| b.id == id) else {
            bail!("no question with id {id}");
        };
        q.id = id.to_string();
        q.normalize();
        *slot = q;
        self.bank_changed()
    }

    pub fn delete_question(&mut self, id: &str) -> Result<bool> {
        let before = self.bank.len();
        self.bank.retain(|q| q.id != id);
        if self.bank.len() == before {
            return Ok(false);
        }
        self.bank_changed()?;
        Ok(true)
    }
}
