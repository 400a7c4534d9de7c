use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};

use quizdeck::app::QuizApp;
use quizdeck::config::Config;
use quizdeck::engine::difficulty::Difficulty;
use quizdeck::engine::filter::TopicFilter;
use quizdeck::engine::stats;
use quizdeck::event::{AppEvent, EventHandler};
use quizdeck::question::{DEFAULT_TOPIC, Question, option_label};
use quizdeck::session::result::SessionResult;
use quizdeck::session::timer::Tick;
use quizdeck::store::json_store::JsonStore;
use quizdeck::store::schema::{ExportData, Settings};

#[derive(Parser)]
#[command(name = "quizdeck", version, about = "Adaptive multiple-choice practice with streaks")]
struct Cli {
    #[arg(long, global = true, help = "Directory holding the JSON records")]
    data_dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Draft fill-in-the-blank questions from a text file
    Draft {
        file: PathBuf,
        #[arg(long, default_value = DEFAULT_TOPIC)]
        topic: String,
    },
    /// Bulk-import questions from CSV
    Import { file: PathBuf },
    /// Add a question by hand
    Add(QuestionArgs),
    /// Replace an existing question
    Edit {
        id: String,
        #[command(flatten)]
        question: QuestionArgs,
    },
    /// Practice a set at one difficulty
    Practice {
        #[arg(long, default_value = "All")]
        topic: String,
        #[arg(long, default_value = "easy")]
        difficulty: String,
        #[arg(long)]
        no_adaptive: bool,
        #[arg(long, help = "Seconds per question, 0 disables the timer")]
        time: Option<u32>,
    },
    /// List questions in the bank
    List {
        #[arg(long)]
        topic: Option<String>,
    },
    Delete { id: String },
    /// Streak, coins and recent activity for the current user
    Stats,
    /// Sign in (creating the user if needed), or list users without an id
    User {
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Return to the guest user
    Logout,
    /// Set the daily goal for the current user
    Goal { count: u32 },
    Settings {
        #[arg(long)]
        dark: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
    },
    /// Write every record to one JSON file
    Export { path: PathBuf },
    /// Replace every record from an export file
    Restore { path: PathBuf },
}

#[derive(Args)]
struct QuestionArgs {
    prompt: String,
    #[arg(num_args = 1..=4, required = true)]
    options: Vec<String>,
    #[arg(long, default_value_t = 0)]
    answer: i64,
    #[arg(long, default_value = DEFAULT_TOPIC)]
    topic: String,
    #[arg(long, default_value = "easy")]
    difficulty: String,
    #[arg(long)]
    explanation: Option<String>,
}

impl QuestionArgs {
    fn into_question(self) -> Result<Question> {
        let difficulty = parse_difficulty(&self.difficulty)?;
        let q = Question::new(
            String::new(),
            self.prompt,
            self.options,
            quizdeck::question::clamp_answer_index(self.answer),
            &self.topic,
            difficulty,
        );
        Ok(match self.explanation {
            Some(e) => q.with_explanation(e),
            None => q,
        })
    }
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn parse_difficulty(s: &str) -> Result<Difficulty> {
    match Difficulty::parse(s) {
        Some(d) => Ok(d),
        None => bail!("unknown difficulty {s:?} (easy, normal, hard)"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("config unreadable ({e}), using defaults");
        Config::default()
    });
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.to_string_lossy().to_string();
    }
    config.validate();

    let store = JsonStore::with_base_dir(config.data_path())?;
    if store.check_interrupted_import() {
        log::warn!("cleaned up backups from an interrupted restore");
    }

    match cli.command {
        Command::Export { path } => {
            let data = store.export_all(&config)?;
            fs::write(&path, serde_json::to_string_pretty(&data)?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
            Ok(())
        }
        Command::Restore { path } => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let data: ExportData = serde_json::from_str(&raw)?;
            store.import_all(&data)?;
            println!(
                "Restored {} questions and {} users",
                data.questions.len(),
                data.users.users.len()
            );
            Ok(())
        }
        command => run(QuizApp::new(store, config), command),
    }
}

fn run(mut app: QuizApp<JsonStore>, command: Command) -> Result<()> {
    match command {
        Command::Draft { file, topic } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let count = app.draft_into_bank(&text, &topic)?;
            println!("Drafted {count} questions into {topic}");
        }
        Command::Import { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let report = app.import_csv(&text)?;
            println!("Imported {} questions", report.questions.len());
            for (line, reason) in &report.skipped {
                println!("  line {line}: {reason}");
            }
        }
        Command::Add(args) => {
            let id = app.add_question(args.into_question()?)?;
            println!("Added {id}");
        }
        Command::Edit { id, question } => {
            app.update_question(&id, question.into_question()?)?;
            println!("Updated {id}");
        }
        Command::Delete { id } => {
            if app.delete_question(&id)? {
                println!("Deleted {id}");
            } else {
                bail!("no question with id {id}");
            }
        }
        Command::List { topic } => list(&app, topic.as_deref()),
        Command::Practice {
            topic,
            difficulty,
            no_adaptive,
            time,
        } => {
            if no_adaptive {
                app.config.adaptive = false;
            }
            if let Some(secs) = time {
                app.config.question_time_secs = secs;
                app.config.validate();
            }
            let difficulty = parse_difficulty(&difficulty)?;
            app.set_filter(TopicFilter::from_label(&topic), difficulty);
            practice(&mut app)?;
        }
        Command::Stats => print_stats(&app),
        Command::User { id: Some(id), name } => {
            app.sign_in(&id, name.as_deref())?;
            println!("Signed in as {}", app.current_user().name);
        }
        Command::User { id: None, .. } => {
            let current = app.current_user().id.clone();
            for user in app.users() {
                let marker = if user.id == current { "*" } else { " " };
                println!("{marker} {:<16} {:<20} streak {}", user.id, user.name, user.streak);
            }
        }
        Command::Logout => {
            app.sign_out()?;
            println!("Signed out");
        }
        Command::Goal { count } => {
            app.set_daily_goal(count)?;
            println!("Daily goal set to {}", app.current_user().daily_goal);
        }
        Command::Settings {
            dark,
            notifications,
        } => {
            let mut settings: Settings = app.settings.clone();
            settings.dark = dark.unwrap_or(settings.dark);
            settings.notifications = notifications.unwrap_or(settings.notifications);
            if settings != app.settings {
                app.set_settings(settings)?;
            }
            println!(
                "dark: {}  notifications: {}",
                app.settings.dark, app.settings.notifications
            );
        }
        Command::Export { .. } | Command::Restore { .. } => unreachable!("handled before load"),
    }
    Ok(())
}

fn list(app: &QuizApp<JsonStore>, topic: Option<&str>) {
    let filter = topic.map_or(TopicFilter::All, TopicFilter::from_label);
    let mut shown = 0;
    for q in app.bank().iter().filter(|q| filter.matches_topic(&q.topic)) {
        shown += 1;
        println!("{}  [{} / {}]  {}", q.id, q.topic, q.difficulty, q.prompt);
        for (i, option) in q.options.iter().enumerate() {
            let marker = if i == q.answer_index { "*" } else { " " };
            println!("    {marker}{}. {option}", option_label(i));
        }
    }
    println!("{shown} questions. Topics: {}", app.topics().join(", "));
}

fn print_stats(app: &QuizApp<JsonStore>) {
    let user = app.current_user();
    let data = app.stats();
    let today = Local::now().date_naive();
    let (attempted_today, goal) = app.today_progress(today);
    let (attempted, correct) = stats::totals(&data.history);

    println!("{} ({})", user.name, user.id);
    println!("  streak {} (best {})", user.streak, user.best_streak);
    println!("  today {attempted_today}/{goal}");
    println!("  coins {}", user.coins);
    if attempted > 0 {
        println!(
            "  all time {correct}/{attempted} ({:.0}%)",
            correct as f64 / attempted as f64 * 100.0
        );
    }
    let unlocked: Vec<&str> = Difficulty::ALL
        .iter()
        .filter(|d| user.level_unlocked.is_unlocked(**d))
        .map(|d| d.as_str())
        .collect();
    println!("  levels {}", unlocked.join(", "));
    if !user.badges.is_empty() {
        let badges: Vec<&str> = user.badges.iter().map(String::as_str).collect();
        println!("  badges {}", badges.join(", "));
    }

    println!("Last 7 days:");
    for day in stats::recent(&data.history, 7) {
        println!(
            "  {}  {:>3}/{:<3} {:>5.1}%",
            day.date,
            day.correct,
            day.attempted,
            day.accuracy()
        );
    }
    println!("Recent sets:");
    for result in data.sessions.iter().rev().take(5) {
        print_result(result);
    }
}

fn print_result(result: &SessionResult) {
    println!(
        "  {}  {} {}  {}/{} ({:.0}%)  +{} coins",
        result.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        result.topic,
        result.difficulty,
        result.correct,
        result.attempted,
        result.accuracy(),
        result.coins
    );
}

fn show_question(app: &QuizApp<JsonStore>) {
    let session = app.session();
    let Some(q) = session.current() else {
        return;
    };
    println!();
    println!(
        "[{}/{}] ({}, {}) {}",
        session.index + 1,
        session.pool.len(),
        q.topic,
        q.difficulty,
        q.prompt
    );
    for (i, option) in q.options.iter().enumerate() {
        println!("  {}. {option}", option_label(i));
    }
    if let Some(timer) = session.timer() {
        println!("  {}s to answer. Type A-D, or q to quit.", timer.remaining().as_secs());
    }
}

const LATE_ANSWER: &str = "Time's up, answer not counted.";

#[derive(Debug, PartialEq, Eq)]
enum Expiry {
    Stop,
    /// Input arrived in the same poll as the expiry.
    Late,
    Quiet,
}

fn after_expiry(event: &AppEvent) -> Expiry {
    match event {
        AppEvent::Eof => Expiry::Stop,
        AppEvent::Line(line) if is_quit(line) => Expiry::Stop,
        AppEvent::Line(_) => Expiry::Late,
        AppEvent::Tick => Expiry::Quiet,
    }
}

fn is_quit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("q")
}

fn parse_choice(input: &str) -> Option<usize> {
    let c = input.trim().chars().next()?.to_ascii_uppercase();
    match c {
        'A'..='D' => Some(c as usize - 'A' as usize),
        '1'..='4' => Some(c as usize - '1' as usize),
        _ => None,
    }
}

/// Interactive loop. Returns when the set completes, stdin closes or the
/// user quits.
fn practice(app: &mut QuizApp<JsonStore>) -> Result<()> {
    if app.session().is_empty() {
        println!(
            "No questions for {} at {}.",
            app.topic().label(),
            app.difficulty()
        );
        return Ok(());
    }
    app.begin_day(Local::now().date_naive())?;
    let (done, goal) = app.today_progress(Local::now().date_naive());
    println!(
        "Streak {} | today {done}/{goal} | coins {}",
        app.current_user().streak,
        app.current_user().coins
    );

    let events = EventHandler::new(Duration::from_millis(100));
    let mut last = Instant::now();
    show_question(app);

    loop {
        let event = events.next();
        let now = Instant::now();
        let expired = matches!(app.tick(now - last), Tick::Expired);
        last = now;

        if expired {
            if let Some(q) = app.session().current() {
                println!("Time's up. Answer: {}", q.correct_option());
            }
            match after_expiry(&event) {
                Expiry::Stop => return Ok(()),
                Expiry::Late => println!("{LATE_ANSWER}"),
                Expiry::Quiet => {}
            }
            if let Some(result) = app.next_question(Local::now())? {
                finish(&result);
                return Ok(());
            }
            show_question(app);
            continue;
        }

        match event {
            AppEvent::Tick => {}
            AppEvent::Eof => return Ok(()),
            AppEvent::Line(line) if is_quit(&line) => return Ok(()),
            AppEvent::Line(line) => {
                let Some(choice) = parse_choice(&line) else {
                    println!("Type A-D.");
                    continue;
                };
                let outcome = match app.answer(choice, Local::now()) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                let feedback = &outcome.feedback;
                if feedback.correct {
                    println!("Correct! +{} coins", feedback.coins);
                } else {
                    println!("Wrong. Answer: {}", option_label(feedback.correct_index));
                }
                if let Some(explanation) = &feedback.explanation {
                    println!("  {explanation}");
                }
                for badge in &outcome.new_badges {
                    println!("  Badge earned: {badge}");
                }
                if let Some(result) = &feedback.completed {
                    finish(result);
                    return Ok(());
                }
                if let Some(level) = outcome.rebuilt_at {
                    println!("Moving to {level}.");
                    if app.session().is_empty() {
                        println!("No {level} questions for {}.", app.topic().label());
                        return Ok(());
                    }
                } else {
                    app.next_question(Local::now())?;
                }
                last = Instant::now();
                show_question(app);
            }
        }
    }
}

fn finish(result: &SessionResult) {
    println!();
    println!("Set complete:");
    print_result(result);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice_accepts_letters_and_digits() {
        assert_eq!(parse_choice("a"), Some(0));
        assert_eq!(parse_choice(" D "), Some(3));
        assert_eq!(parse_choice("2"), Some(1));
        assert_eq!(parse_choice("e"), None);
        assert_eq!(parse_choice(""), None);
    }

    #[test]
    fn test_input_racing_an_expiry_is_reported() {
        assert_eq!(after_expiry(&AppEvent::Line("b".into())), Expiry::Late);
        assert_eq!(after_expiry(&AppEvent::Line("q".into())), Expiry::Stop);
        assert_eq!(after_expiry(&AppEvent::Eof), Expiry::Stop);
        assert_eq!(after_expiry(&AppEvent::Tick), Expiry::Quiet);
    }

    #[test]
    fn test_quit_is_case_insensitive() {
        assert!(is_quit(" Q\n"));
        assert!(!is_quit("a"));
    }
}
