use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "daneel")]
#[command(about = "Relay an interactive command with an action menu, and run assistant workflows")]
#[command(version)]
struct Cli {
    /// Working directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn a command and relay the terminal to it (same as `daneel <command...>`)
    Relay {
        /// Command line to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Run a built-in workflow such as `implement` or `fix_review` (same as
    /// `daneel <name>`)
    Run {
        /// Workflow name
        name: String,
    },

    /// List the actions the relay menu would offer
    Actions,

    /// Show checkbox progress of a markdown file
    Progress {
        /// Markdown file
        file: PathBuf,
    },

    /// Set one field of a YAML file
    Set {
        /// YAML file
        file: PathBuf,

        /// Field query such as `project.tasks[0].status`
        query: String,

        /// New value, parsed as YAML (`true`, `3`, `[a, b]`, or plain text)
        value: String,
    },

    #[command(external_subcommand)]
    External(Vec<String>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stay quiet by default: log lines would land in the middle of the relay
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::External(command) if cli::run::names_workflow(&command) => {
            cli::run::run_command(&work_dir, &command[0]).await?;
        }
        Commands::Relay { command } | Commands::External(command) => {
            let code = cli::relay::relay_command(&work_dir, &command)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Run { name } => {
            cli::run::run_command(&work_dir, &name).await?;
        }
        Commands::Actions => {
            cli::actions::actions_command(&work_dir)?;
        }
        Commands::Progress { file } => {
            cli::document::progress_command(&file)?;
        }
        Commands::Set { file, query, value } => {
            cli::document::set_command(&file, &query, &value)?;
        }
    }

    Ok(())
}
