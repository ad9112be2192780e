//! cbt CLI: take exams and manage the question bank from a terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use cbt_core::model::{ExamType, Section, Track};

mod commands;

#[derive(Parser)]
#[command(name = "cbt", version, about = "Computer-based testing for schools")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and a bulk-import template
    Init,

    /// Check that the result store is reachable
    Health,

    /// Sit a timed test, exam, or practice session
    Take {
        /// Student ID
        #[arg(long)]
        id: String,

        /// Student name
        #[arg(long)]
        name: String,

        /// elementary or college
        #[arg(long)]
        section: Section,

        /// School year (1-6 elementary, 7-12 college)
        #[arg(long)]
        year: u8,

        /// Science, Commercial, or Arts (years 10-12)
        #[arg(long)]
        track: Option<Track>,

        /// Subject name, e.g. "Mathematics"
        #[arg(long)]
        subject: String,

        /// test, exam, or practice
        #[arg(long = "type", default_value = "test")]
        exam_type: ExamType,

        /// Seed for question order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage the question bank
    Questions {
        #[command(subcommand)]
        action: commands::questions::Action,
    },

    /// List, summarize, or clear results
    Results {
        #[command(subcommand)]
        action: commands::results::Action,
    },

    /// List registered students
    Students {
        #[command(subcommand)]
        action: commands::students::Action,
    },

    /// Upload results that were saved locally while offline
    Sync,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cbt=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Health => commands::health::execute(config).await,
        Commands::Take {
            id,
            name,
            section,
            year,
            track,
            subject,
            exam_type,
            seed,
        } => {
            let args = commands::take::TakeArgs {
                id,
                name,
                section,
                year,
                track,
                subject,
                exam_type,
                seed,
            };
            commands::take::execute(args, config).await
        }
        Commands::Questions { action } => commands::questions::execute(action, config).await,
        Commands::Results { action } => commands::results::execute(action, config).await,
        Commands::Students { action } => commands::students::execute(action, config).await,
        Commands::Sync => commands::sync::execute(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
