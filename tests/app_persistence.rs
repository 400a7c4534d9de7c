use std::fs;

use chrono::{DateTime, NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tempfile::TempDir;

use quizdeck::app::QuizApp;
use quizdeck::config::Config;
use quizdeck::engine::difficulty::Difficulty;
use quizdeck::engine::filter::TopicFilter;
use quizdeck::store::json_store::JsonStore;
use quizdeck::store::repository::{QUESTIONS_KEY, Repository, USERS_KEY};
use quizdeck::store::schema::GUEST_ID;

const CSV: &str = "question,a,b,c,d,answer,explanation,topic,difficulty\n\
    Largest planet?,Jupiter,Mars,Venus,Earth,0,Gas giant,Space,easy\n\
    Closest star?,Sirius,Sun,Vega,Rigel,1,Our own,Space,easy\n\
    Red planet?,Venus,Saturn,Mars,Pluto,2,Iron oxide,Space,easy\n\
    Boiling point of water in C?,90,100,110,120,1,At sea level,Chemistry,normal\n";

fn config(dir: &TempDir) -> Config {
    Config {
        daily_goal: 3,
        question_time_secs: 0,
        data_dir: dir.path().to_string_lossy().to_string(),
        ..Config::default()
    }
}

fn open(dir: &TempDir, seed: u64) -> QuizApp<JsonStore> {
    let config = config(dir);
    let store = JsonStore::with_base_dir(config.data_path()).unwrap();
    QuizApp::with_rng(store, config, SmallRng::seed_from_u64(seed))
}

fn noon(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(12, 0, 0).unwrap().and_utc()
}

/// Answer every question in the current set, correctly or not.
fn play_set(app: &mut QuizApp<JsonStore>, correct: bool, date: NaiveDate) {
    while let Some(q) = app.session().current() {
        let choice = if correct {
            q.answer_index
        } else {
            (q.answer_index + 1) % 4
        };
        let outcome = app.answer(choice, noon(date)).unwrap();
        if outcome.feedback.completed.is_some() || outcome.rebuilt_at.is_some() {
            return;
        }
        app.next_question(noon(date)).unwrap();
    }
}

#[test]
fn test_streak_survives_restarts() {
    let dir = TempDir::new().unwrap();
    let day1 = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    let day2 = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

    {
        let mut app = open(&dir, 1);
        let report = app.import_csv(CSV).unwrap();
        assert_eq!(report.questions.len(), 4);
        app.sign_in("sam", Some("Sam")).unwrap();
        app.set_filter(TopicFilter::from_label("Space"), Difficulty::Easy);
        assert_eq!(app.session().pool.len(), 3);
        play_set(&mut app, false, day1);
        assert_eq!(app.today_progress(day1), (3, 3));
    }

    let mut app = open(&dir, 2);
    assert_eq!(app.current_user().id, "sam");
    assert_eq!(app.bank().len(), 4);
    assert!(app.begin_day(day2).unwrap());
    assert_eq!(app.current_user().streak, 1);
    assert_eq!(app.current_user().best_streak, 1);
    assert!(!app.begin_day(day2).unwrap());
}

#[test]
fn test_missed_goal_resets_streak() {
    let dir = TempDir::new().unwrap();
    let day1 = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    let day2 = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
    let day3 = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();

    let mut app = open(&dir, 3);
    app.import_csv(CSV).unwrap();
    app.set_filter(TopicFilter::from_label("Space"), Difficulty::Easy);
    play_set(&mut app, false, day1);

    app.set_filter(TopicFilter::from_label("Chemistry"), Difficulty::Normal);
    play_set(&mut app, true, day2);
    assert_eq!(app.current_user().streak, 1);
    assert_eq!(app.today_progress(day2).0, 1);

    app.begin_day(day3).unwrap();
    assert_eq!(app.current_user().streak, 0);
    assert_eq!(app.current_user().best_streak, 1);
}

#[test]
fn test_perfect_space_set_unlocks_normal() {
    let dir = TempDir::new().unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut app = open(&dir, 4);
    app.import_csv(CSV).unwrap();
    app.set_filter(TopicFilter::from_label("Space"), Difficulty::Easy);
    play_set(&mut app, true, day);

    // the third straight correct answer both finishes the set and promotes
    assert_eq!(app.difficulty(), Difficulty::Normal);
    assert!(app.current_user().level_unlocked.normal);
    assert_eq!(app.current_user().coins, 3);
    assert_eq!(app.stats().sessions.len(), 1);
    assert_eq!(app.today_progress(day).0, 3);
}

#[test]
fn test_corrupt_records_degrade_to_defaults() {
    let dir = TempDir::new().unwrap();
    {
        let mut app = open(&dir, 5);
        app.import_csv(CSV).unwrap();
    }
    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    store.set(USERS_KEY, "{not json").unwrap();

    let raw = store.get(QUESTIONS_KEY).unwrap().unwrap();
    let mut entries: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    entries.push(serde_json::json!({"prompt": "no id and bad index", "answer_index": "7"}));
    entries.push(serde_json::json!(42));
    store
        .set(QUESTIONS_KEY, &serde_json::to_string(&entries).unwrap())
        .unwrap();

    let app = open(&dir, 6);
    assert_eq!(app.current_user().id, GUEST_ID);
    assert!(app.bank().len() >= 4);
    assert!(app.bank().iter().all(|q| q.options.len() == 4 && q.answer_index < 4));
}

#[test]
fn test_export_then_restore_into_fresh_dir() {
    let src = TempDir::new().unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
    {
        let mut app = open(&src, 7);
        app.import_csv(CSV).unwrap();
        app.sign_in("kim", None).unwrap();
        app.set_filter(TopicFilter::from_label("Space"), Difficulty::Easy);
        play_set(&mut app, false, day);
    }
    let store = JsonStore::with_base_dir(src.path().to_path_buf()).unwrap();
    let export = store.export_all(&config(&src)).unwrap();
    let path = src.path().join("backup.export");
    fs::write(&path, serde_json::to_string_pretty(&export).unwrap()).unwrap();

    let dst = TempDir::new().unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    let restored: quizdeck::store::schema::ExportData = serde_json::from_str(&raw).unwrap();
    JsonStore::with_base_dir(dst.path().to_path_buf())
        .unwrap()
        .import_all(&restored)
        .unwrap();

    let app = open(&dst, 8);
    assert_eq!(app.current_user().id, "kim");
    assert_eq!(app.bank().len(), 4);
    assert_eq!(app.today_progress(day).0, 3);
}
