//! The `cbt take` command: an interactive, timed session on the terminal.
//!
//! Reads one command per line from stdin while the countdown runs. When
//! time is up the session is submitted as-is. Closing stdin submits only a
//! fully answered session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use uuid::Uuid;

use cbt_core::app::{App, RecordedResult, SubmitOutcome, SubmitTrigger};
use cbt_core::model::{ExamType, Section, Track, OPTION_COUNT};
use cbt_core::session::{ExamSession, QuestionStatus};
use cbt_core::timer::format_clock;
use cbt_core::traits::ResultStore;

use super::{option_letter, print_notices, Session};

pub struct TakeArgs {
    pub id: String,
    pub name: String,
    pub section: Section,
    pub year: u8,
    pub track: Option<Track>,
    pub subject: String,
    pub exam_type: ExamType,
    pub seed: Option<u64>,
}

const HELP: &str = "\
Commands:
  a-d or 1-4   answer the current question and move on
  n / p        next / previous question
  g <number>   go to a question
  f            flag or unflag the current question
  m            show the question map
  s            submit
  h            show this help";

/// What one input line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Answer(usize),
    Next,
    Previous,
    Goto(usize),
    Flag,
    Map,
    Submit,
    Help,
    Yes,
    No,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim().to_ascii_lowercase();
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Input::Unknown;
    };
    match head {
        "n" | "next" => Input::Next,
        "p" | "prev" | "previous" => Input::Previous,
        "f" | "flag" => Input::Flag,
        "m" | "map" => Input::Map,
        "s" | "submit" => Input::Submit,
        "h" | "help" | "?" => Input::Help,
        "y" | "yes" => Input::Yes,
        "no" => Input::No,
        "g" | "go" | "goto" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n > 0 => Input::Goto(n - 1),
            _ => Input::Unknown,
        },
        other => match other.parse::<usize>() {
            Ok(n) if (1..=OPTION_COUNT).contains(&n) => Input::Answer(n - 1),
            Ok(_) => Input::Unknown,
            Err(_) => letter_index(other).map_or(Input::Unknown, Input::Answer),
        },
    }
}

/// `a` is 0, `b` is 1, and so on up to the option count.
fn letter_index(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => {
            let index = (c as u8 - b'a') as usize;
            (index < OPTION_COUNT).then_some(index)
        }
        _ => None,
    }
}

pub async fn execute(args: TakeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path)?;
    let store = session.store();
    let mut app = session.app()?;

    if app.check_health(store).await {
        if !app.pending().is_empty() {
            app.sync_pending(store).await;
        }
    } else {
        eprintln!("Store is offline; results will be queued locally.");
    }

    app.choose_section(args.section);
    app.choose_year(args.year);
    app.choose_track(args.track);
    let subjects = app.available_subjects();
    if !subjects.contains(&args.subject.as_str()) {
        anyhow::bail!(
            "{} is not offered for {} year {}{}. Choose one of: {}",
            args.subject,
            args.section,
            args.year,
            args.track.map(|t| format!(" ({t})")).unwrap_or_default(),
            subjects.join(", ")
        );
    }

    app.login_student(store, &args.id, &args.name).await;
    print_notices(&mut app);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let started = app
        .start_exam(store, &args.subject, args.exam_type, &mut rng)
        .await
        .map(|_| ());
    print_notices(&mut app);
    started?;
    let exam = app.session().context("session did not start")?;
    println!(
        "\n{} {} ({}): {} question(s), {} minutes. Type h for help.",
        exam.classification().subject,
        exam.classification().exam_type,
        exam.student().name,
        exam.total(),
        exam.classification().exam_type.duration_minutes()
    );

    run_session(&mut app, &session).await?;
    print_notices(&mut app);

    if let Some(recorded) = app.last_result() {
        print_result(recorded);
    }
    Ok(())
}

async fn run_session(app: &mut App, session: &Session) -> Result<()> {
    let store = session.store();
    let mut expiry = app.take_expiry();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirming = false;

    render(app);
    loop {
        tokio::select! {
            fired = wait_for_expiry(&mut expiry) => {
                if fired {
                    println!("\nTime is up! Submitting your answers.");
                    app.submit(store, SubmitTrigger::TimeExpired, false).await?;
                    return Ok(());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return submit_on_close(app, store, confirming).await;
                };
                let input = parse_input(&line);

                if confirming {
                    confirming = false;
                    if input == Input::Yes {
                        app.submit(store, SubmitTrigger::Manual, true).await?;
                        return Ok(());
                    }
                    println!("Submission cancelled.");
                    render(app);
                    continue;
                }

                match input {
                    Input::Submit => {
                        match app.submit(store, SubmitTrigger::Manual, false).await? {
                            SubmitOutcome::Submitted(_) => return Ok(()),
                            SubmitOutcome::NeedsConfirmation { answered, total } => {
                                println!(
                                    "You have answered {answered} of {total}. {} unanswered. Submit anyway? (y/n)",
                                    total - answered
                                );
                                confirming = true;
                            }
                        }
                    }
                    Input::Help => println!("{HELP}"),
                    Input::Map => print_map(app),
                    Input::Unknown | Input::Yes | Input::No => {
                        println!("Unrecognised command. Type h for help.");
                    }
                    other => {
                        if let Some(exam) = app.session_mut() {
                            apply(exam, other);
                        }
                        render(app);
                    }
                }
            }
        }
    }
}

/// Input ended. A fully answered session is submitted; otherwise nobody is
/// left to confirm the unanswered count, so the attempt stays unsubmitted.
async fn submit_on_close(
    app: &mut App,
    store: &dyn ResultStore,
    confirming: bool,
) -> Result<()> {
    if !confirming {
        if let SubmitOutcome::Submitted(_) =
            app.submit(store, SubmitTrigger::Manual, false).await?
        {
            return Ok(());
        }
    }
    let unanswered = app.session().map(|s| s.unanswered()).unwrap_or(0);
    anyhow::bail!("input closed with {unanswered} unanswered question(s); exam not submitted")
}

/// Resolves `true` when the countdown fires. A dropped sender resolves
/// `false` once and then never again.
async fn wait_for_expiry(expiry: &mut Option<oneshot::Receiver<Uuid>>) -> bool {
    if let Some(rx) = expiry.as_mut() {
        let fired = rx.await.is_ok();
        *expiry = None;
        return fired;
    }
    std::future::pending().await
}

fn apply(exam: &mut ExamSession, input: Input) {
    match input {
        Input::Answer(option) => {
            let current = exam.current();
            exam.answer(current, option);
            if !exam.is_last() {
                exam.next();
            }
        }
        Input::Next => exam.next(),
        Input::Previous => exam.previous(),
        Input::Goto(index) => exam.seek(index),
        Input::Flag => {
            let current = exam.current();
            exam.toggle_flag(current);
        }
        _ => {}
    }
}

fn render(app: &App) {
    let Some(exam) = app.session() else {
        return;
    };
    let Some(question) = exam.current_question() else {
        return;
    };
    let timer = app.timer();
    let clock = format_clock(timer.remaining());
    let low = if timer.is_low() { "  LOW TIME" } else { "" };
    let flag = if exam.is_flagged(exam.current()) {
        "  [flagged]"
    } else {
        ""
    };

    println!(
        "\nQuestion {}/{}  [{clock}{low}]  {:.0}% answered{flag}",
        exam.current() + 1,
        exam.total(),
        exam.percent_complete() * 100.0
    );
    println!("{}", question.question);
    let chosen = exam.answer_for(exam.current());
    for (i, option) in question.options.iter().enumerate() {
        let mark = if chosen == Some(i) { '>' } else { ' ' };
        println!(" {mark} {}. {option}", option_letter(i));
    }
}

fn print_map(app: &App) {
    let Some(exam) = app.session() else {
        return;
    };
    let cells: Vec<String> = (0..exam.total())
        .map(|i| {
            let mark = match exam.status(i) {
                QuestionStatus::Current => '>',
                QuestionStatus::Answered => '*',
                QuestionStatus::Flagged => '!',
                QuestionStatus::Unanswered => ' ',
            };
            format!("[{mark}{}]", i + 1)
        })
        .collect();
    for row in cells.chunks(10) {
        println!("{}", row.join(" "));
    }
    println!("> current  * answered  ! flagged");
}

fn print_result(recorded: &RecordedResult) {
    let result = recorded.result();
    println!(
        "\nScore: {}%  Grade: {}  ({}/{} correct)",
        result.score,
        result.grade(),
        result.correct,
        result.total
    );
    match recorded {
        RecordedResult::Persisted(_) => println!("Result saved."),
        RecordedResult::PendingSync { local_id, .. } => {
            println!("Result queued for sync ({local_id}). Run `cbt sync` when online.")
        }
        RecordedResult::Practice(_) => println!("Practice results are not saved."),
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct", ""]);
    for (i, d) in result.details.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(super::truncate(&d.question, 48)),
            Cell::new(
                d.user_answer
                    .map(|a| option_letter(a).to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(option_letter(d.correct_answer)),
            Cell::new(if d.is_correct { "ok" } else { "x" }),
        ]);
    }
    println!("{table}");
}
