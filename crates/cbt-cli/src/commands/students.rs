//! The `cbt students` commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Table};

use cbt_core::model::Student;

use super::Session;

#[derive(Subcommand)]
pub enum Action {
    /// List registered students
    List,

    /// Show one student and their results
    Show { id: String },

    /// Remove a student record
    Delete {
        id: String,
        /// Admin password
        #[arg(long)]
        password: String,
    },
}

pub async fn execute(action: Action, config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path)?;

    match action {
        Action::List => {
            let students = session.store().fetch_students().await?;
            if students.is_empty() {
                println!("No students registered.");
                return Ok(());
            }
            print_students(&students);
            println!("{} student(s)", students.len());
        }
        Action::Show { id } => {
            let student = session.store().fetch_student(&id).await?;
            print_students(std::slice::from_ref(&student));

            let results = session.store().fetch_student_results(&id).await?;
            for r in &results {
                println!(
                    "  {}  {} {} year {}: {}% ({})",
                    r.created_at.format("%Y-%m-%d"),
                    r.classification.subject,
                    r.classification.exam_type,
                    r.classification.year,
                    r.score,
                    r.grade()
                );
            }
            println!("{} result(s)", results.len());
        }
        Action::Delete { id, password } => {
            session.admin_app(&password)?;
            session.store().delete_student(&id).await?;
            println!("Deleted student {id}");
        }
    }

    Ok(())
}

fn print_students(students: &[Student]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Section", "Joined"]);
    for s in students {
        table.add_row(vec![
            Cell::new(&s.id),
            Cell::new(&s.name),
            Cell::new(s.section.map(|x| x.to_string()).unwrap_or_default()),
            Cell::new(
                s.created_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
        ]);
    }
    println!("{table}");
}
