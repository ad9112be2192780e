//! The `cbt results` commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Table};

use cbt_core::catalog::filter_subjects;
use cbt_core::model::{ExamResult, Section};
use cbt_core::statistics::{filter_results, summarize, ResultFilter, ResultSummary};

use super::{print_notices, Session};

#[derive(Args)]
pub struct FilterArgs {
    #[arg(long)]
    section: Option<Section>,
    #[arg(long)]
    year: Option<u8>,
    #[arg(long)]
    subject: Option<String>,
}

impl FilterArgs {
    /// With section and year both given, the subject must be one the school
    /// offers there.
    fn check_subject(&self) -> Result<()> {
        let (Some(section), Some(year), Some(subject)) = (self.section, self.year, &self.subject)
        else {
            return Ok(());
        };
        let offered = filter_subjects(section, year);
        anyhow::ensure!(
            offered.contains(&subject.as_str()),
            "{subject} is not offered for {section} year {year}; choose one of: {}",
            offered.join(", ")
        );
        Ok(())
    }
}

impl From<FilterArgs> for ResultFilter {
    fn from(args: FilterArgs) -> Self {
        ResultFilter {
            section: args.section,
            year: args.year,
            subject: args.subject,
        }
    }
}

#[derive(Subcommand)]
pub enum Action {
    /// List stored results, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Only this student's results
        #[arg(long)]
        student: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Summarize stored results
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the server's own statistics instead
        #[arg(long)]
        server: bool,
    },

    /// Delete one stored result
    Delete {
        id: String,
        /// Admin password
        #[arg(long)]
        password: String,
    },

    /// Delete every stored result
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
        /// Admin password
        #[arg(long)]
        password: String,
    },
}

pub async fn execute(action: Action, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path)?;

    match action {
        Action::List {
            filter,
            student,
            json,
        } => {
            filter.check_subject()?;
            let results = match &student {
                Some(id) => session.store().fetch_student_results(id).await?,
                None => session.store().fetch_results().await?,
            };
            let shown = filter_results(&results, &filter.into());
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print_results(&shown);
            }
        }
        Action::Stats { filter, server } => {
            filter.check_subject()?;
            if server {
                let stats = session.store().result_stats().await?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                let results = session.store().fetch_results().await?;
                print_summary(&summarize(filter_results(&results, &filter.into())));
            }
        }
        Action::Delete { id, password } => {
            session.admin_app(&password)?;
            session.store().delete_result(&id).await?;
            println!("Deleted result {id}");
        }
        Action::Clear { yes, password } => {
            anyhow::ensure!(yes, "refusing to clear all results without --yes");
            let mut app = session.admin_app(&password)?;
            let cleared = app.clear_results(session.store()).await;
            print_notices(&mut app);
            cleared?;
        }
    }

    Ok(())
}

fn print_results(results: &[&ExamResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Date", "Student", "Section", "Year", "Subject", "Type", "Score", "Grade",
    ]);
    for r in results {
        let c = &r.classification;
        let year = match c.track {
            Some(track) => format!("{} {track}", c.year),
            None => c.year.to_string(),
        };
        table.add_row(vec![
            Cell::new(r.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&r.student.name),
            Cell::new(c.section),
            Cell::new(year),
            Cell::new(&c.subject),
            Cell::new(c.exam_type),
            Cell::new(format!("{}% ({}/{})", r.score, r.correct, r.total)),
            Cell::new(r.grade()),
        ]);
    }
    println!("{table}");
    println!("{} result(s)", results.len());
}

fn print_summary(summary: &ResultSummary) {
    if summary.count == 0 {
        println!("No results found.");
        return;
    }

    println!(
        "{} result(s), average {:.1}%, pass rate {:.1}%",
        summary.count,
        summary.average_score,
        summary.pass_rate * 100.0
    );
    let grades: Vec<String> = summary
        .grades
        .iter()
        .map(|(grade, n)| format!("{grade}: {n}"))
        .collect();
    println!("Grades  {}", grades.join("  "));

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Results", "Average"]);
    for (subject, stats) in &summary.per_subject {
        table.add_row(vec![
            Cell::new(subject),
            Cell::new(stats.count),
            Cell::new(format!("{:.1}%", stats.average_score)),
        ]);
    }
    println!("{table}");
}
