//! limit-pacer: view and update the team deadline workbook from a terminal.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use limit_pacer::auth::{Principal, StaticCredentialProvider};
use limit_pacer::gateway::GraphGateway;
use limit_pacer::logging::init_logging;
use limit_pacer::sync::{Orchestrator, Session};
use limit_pacer::types::EnrichedTask;
use limit_pacer::PacerConfig;

/// Team task deadlines backed by a cloud Excel workbook
#[derive(Parser)]
#[command(name = "limit-pacer")]
#[command(about = "Track team task deadlines stored in an Excel workbook", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "LIMIT_PACER_CONFIG")]
    config: Option<PathBuf>,

    /// Access token for the Graph API
    #[arg(long, env = "LIMIT_PACER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Account to act as; demo data is shown when omitted
    #[arg(long, env = "LIMIT_PACER_USER")]
    user: Option<String>,

    /// Evaluate deadlines as of this day (YYYY-MM-DD) instead of today
    #[arg(long)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the workbook and list the tasks visible to the current user
    Load {
        /// Also list completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Mark a task done, or not done if it already is
    Toggle {
        /// Task id (the "No" column)
        task_id: String,
    },

    /// Show the team compliance report
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PacerConfig::from_file(path)
            .and_then(|config| config.apply_vars(std::env::vars()))
            .with_context(|| format!("loading {}", path.display()))?,
        None => PacerConfig::from_env().context("loading configuration from environment")?,
    };

    let gateway = GraphGateway::new(&config)?;
    let credentials = StaticCredentialProvider::new(cli.token.clone().unwrap_or_default());
    let orchestrator = Orchestrator::new(Session::new(
        Arc::new(credentials),
        Arc::new(gateway),
        config,
    ));

    let principal = match (&cli.user, &cli.token) {
        (Some(user), Some(_)) => Some(Principal::new(user.clone())),
        (Some(_), None) => anyhow::bail!("--user requires --token or LIMIT_PACER_TOKEN"),
        (None, _) => None,
    };
    orchestrator
        .set_principal(principal)
        .await
        .context("loading workbook")?;

    for warning in orchestrator.load_warnings() {
        eprintln!("warning: {warning}");
    }

    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let viewer = orchestrator.current_viewer();

    match cli.command {
        Commands::Load { all } => {
            println!("{} ({}, {})", viewer.name, viewer.role, viewer.group);
            let (todo, done) = orchestrator.task_lists(today);
            print_tasks("To do", &todo);
            if all {
                print_tasks("Done", &done);
            }
        },
        Commands::Toggle { task_id } => {
            let list = orchestrator.toggle_completion(&task_id).await?;
            let state = if list.contains(&viewer.id) {
                "done"
            } else {
                "not done"
            };
            println!("task {task_id} marked {state} for {}", viewer.name);
        },
        Commands::Report => {
            let report = orchestrator.cohort_report(today);
            match report.compliance_percent() {
                Some(percent) => println!(
                    "compliance {percent}% ({}/{}), red cards {} across {} members",
                    report.completed,
                    report.assignments,
                    report.red_cards,
                    report.members_with_red_card
                ),
                None => println!("no assignments"),
            }
            for status in &report.members {
                let flag = if status.has_red_card { "!" } else { " " };
                println!(
                    "{flag} {:<20} {:<4} {}/{} pending {}",
                    status.member.name,
                    status.member.role,
                    status.completed,
                    status.assigned,
                    status.pending.len()
                );
            }
        },
    }

    Ok(())
}

fn print_tasks(title: &str, tasks: &[EnrichedTask]) {
    println!("\n{title} ({})", tasks.len());
    for task in tasks {
        println!(
            "  [{:>7}] {:<10} {:<6} {}",
            task.status.to_string(),
            task.task.deadline,
            task.task.id,
            task.task.content
        );
    }
}
