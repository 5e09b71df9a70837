use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod ingest;
mod models;
mod report;
mod scoring;
mod weeks;

use models::Cohort;
use weeks::{WeekInterval, WeekLabel};

#[derive(Parser)]
#[command(name = "practice-marker")]
#[command(about = "Weekly XP totals and term marks from language practice exports", long_about = None)]
struct Cli {
    /// Configuration file with the goal, bonus weeks, and roster
    #[arg(long, default_value = "config/variables.txt")]
    config: PathBuf,
    /// Directory holding the exported input files
    #[arg(long, default_value = "input")]
    input: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Page through weekly class totals, most recent week first
    Weeks,
    /// Weekly breakdown with practice detail for one student
    Student {
        #[arg(long)]
        name: String,
    },
    /// Write the term report
    Term {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Print the report structure as JSON instead of writing markdown
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut cohort = config::load(&cli.config)?;
    ingest::ingest_dir(&mut cohort, &cli.input)
        .with_context(|| format!("failed to ingest {}", cli.input.display()))?;

    let partitioned = weeks::partition(&cohort.dates);
    if partitioned.is_empty() {
        println!("No data found");
        return Ok(());
    }
    let labeled = weeks::label(&partitioned, &cohort.bonus_week_ends);

    match cli.command {
        Commands::Weeks => show_weeks(&cohort, &labeled)?,
        Commands::Student { name } => {
            let key = name.trim().to_lowercase();
            let student = cohort
                .students
                .get(&key)
                .with_context(|| format!("no student named {name:?} on the roster"))?;
            print!("{}", report::render_student_detail(student, &labeled));
        }
        Commands::Term { out, json } => {
            let term = report::term_report(&cohort, &labeled)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&term)?);
            } else {
                fs::write(&out, report::render_term_markdown(&term))?;
                println!("Report written to {}.", out.display());
            }
        }
    }

    Ok(())
}

fn show_weeks(cohort: &Cohort, labeled: &[(WeekInterval, WeekLabel)]) -> anyhow::Result<()> {
    for (i, &(week, label)) in labeled.iter().rev().enumerate() {
        println!();
        println!(
            "{}",
            report::render_week(&report::week_summary(cohort, week, label))
        );

        if i + 1 < labeled.len() {
            print!("Enter to show another week or Q to quit: ");
            io::stdout().flush()?;
            let mut choice = String::new();
            io::stdin().read_line(&mut choice)?;
            if choice.trim().eq_ignore_ascii_case("q") {
                break;
            }
        }
    }
    println!("Finished");
    Ok(())
}
