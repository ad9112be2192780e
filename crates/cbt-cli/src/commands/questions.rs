//! The `cbt questions` commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Table};

use cbt_core::bulk::{parse_bulk_import, TEMPLATE};
use cbt_core::model::{Classification, ExamType, NewQuestion, Question, Section, Track};

use super::{option_letter, print_notices, truncate, Session};

#[derive(Subcommand)]
pub enum Action {
    /// List questions in the bank
    List {
        #[arg(long)]
        section: Option<Section>,
        #[arg(long)]
        year: Option<u8>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long = "type")]
        exam_type: Option<ExamType>,
    },

    /// Add a single question
    Add {
        #[arg(long)]
        section: Section,
        #[arg(long)]
        year: u8,
        #[arg(long)]
        track: Option<Track>,
        #[arg(long)]
        subject: String,
        #[arg(long = "type", default_value = "test")]
        exam_type: ExamType,
        /// Question text
        #[arg(long)]
        question: String,
        /// Answer option; give exactly four
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Correct option: A-D or 0-3
        #[arg(long)]
        correct: String,
        /// Admin password
        #[arg(long)]
        password: String,
    },

    /// Upload questions from a JSON file
    Import {
        file: PathBuf,
        /// Admin password
        #[arg(long)]
        password: String,
    },

    /// Replace a question with the single entry in a JSON file
    Update {
        id: String,
        file: PathBuf,
        /// Admin password
        #[arg(long)]
        password: String,
    },

    /// Check a bulk-import file without uploading it
    Validate { file: PathBuf },

    /// Delete questions by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Admin password
        #[arg(long)]
        password: String,
    },

    /// Print an example bulk-import file
    Template,
}

pub async fn execute(action: Action, config_path: Option<PathBuf>) -> Result<()> {
    match action {
        Action::Template => {
            print!("{TEMPLATE}");
            Ok(())
        }
        Action::Validate { file } => validate(&file),
        Action::List {
            section,
            year,
            subject,
            exam_type,
        } => {
            let session = Session::open(config_path)?;
            let bank = session.store().fetch_questions().await?;
            let shown: Vec<&Question> = bank
                .iter()
                .filter(|q| {
                    let c = &q.classification;
                    section.map_or(true, |s| c.section == s)
                        && year.map_or(true, |y| c.year == y)
                        && subject.as_ref().map_or(true, |s| &c.subject == s)
                        && exam_type.map_or(true, |t| c.exam_type == t)
                })
                .collect();
            print_questions(&shown);
            Ok(())
        }
        Action::Add {
            section,
            year,
            track,
            subject,
            exam_type,
            question,
            options,
            correct,
            password,
        } => {
            let mut classification = Classification::new(section, year, subject, exam_type);
            classification.track = track;
            let new = NewQuestion {
                question,
                options,
                correct_answer: parse_correct(&correct)?,
                classification,
            };

            let session = Session::open(config_path)?;
            let mut app = session.admin_app(&password)?;
            let added = app.add_question(session.store(), new).await;
            print_notices(&mut app);
            let added = added?;
            println!("Added question {}", added.id);
            Ok(())
        }
        Action::Import { file, password } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let session = Session::open(config_path)?;
            let mut app = session.admin_app(&password)?;
            let saved = app.bulk_import(session.store(), &text).await;
            print_notices(&mut app);
            let saved = saved?;
            println!("Imported {} question(s)", saved.len());
            Ok(())
        }
        Action::Update { id, file, password } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mut parsed = parse_bulk_import(&text)?;
            anyhow::ensure!(
                parsed.len() == 1,
                "{} must hold exactly one question, found {}",
                file.display(),
                parsed.len()
            );
            let replacement = parsed.remove(0);

            let session = Session::open(config_path)?;
            let mut app = session.admin_app(&password)?;
            let updated = app.update_question(session.store(), &id, replacement).await;
            print_notices(&mut app);
            println!("Updated question {}", updated?.id);
            Ok(())
        }
        Action::Delete { ids, password } => {
            let session = Session::open(config_path)?;
            let mut app = session.admin_app(&password)?;
            let deleted = match ids.as_slice() {
                [id] => app.delete_question(session.store(), id).await,
                _ => app.delete_questions(session.store(), &ids).await,
            };
            print_notices(&mut app);
            deleted?;
            println!("Deleted {} question(s)", ids.len());
            Ok(())
        }
    }
}

fn validate(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let questions = parse_bulk_import(&text)?;
    println!("{}: {} question(s)", file.display(), questions.len());
    for q in &questions {
        let c = &q.classification;
        let track = c.track.map(|t| format!(" {t}")).unwrap_or_default();
        println!(
            "  {} year {}{} {} ({}): {}",
            c.section,
            c.year,
            track,
            c.subject,
            c.exam_type,
            truncate(&q.question, 50)
        );
    }
    println!("All questions valid.");
    Ok(())
}

/// Accept `A`-`D` or `0`-`3`.
fn parse_correct(raw: &str) -> Result<usize> {
    let raw = raw.trim();
    if let Ok(index) = raw.parse::<usize>() {
        return Ok(index);
    }
    match raw.to_ascii_uppercase().as_str() {
        "A" => Ok(0),
        "B" => Ok(1),
        "C" => Ok(2),
        "D" => Ok(3),
        _ => anyhow::bail!("correct answer must be A-D or 0-3, got {raw:?}"),
    }
}

fn print_questions(questions: &[&Question]) {
    if questions.is_empty() {
        println!("No questions found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Section", "Year", "Track", "Subject", "Type", "Question", "Answer",
    ]);
    for q in questions {
        let c = &q.classification;
        table.add_row(vec![
            Cell::new(&q.id),
            Cell::new(c.section),
            Cell::new(c.year),
            Cell::new(c.track.map(|t| t.to_string()).unwrap_or_default()),
            Cell::new(&c.subject),
            Cell::new(c.exam_type),
            Cell::new(truncate(&q.question, 48)),
            Cell::new(option_letter(q.correct_answer)),
        ]);
    }
    println!("{table}");
    println!("{} question(s)", questions.len());
}
