//! assessa CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "assessa", version, about = "Adaptive assessment engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an assessment interactively
    Take {
        /// Assessment id (file name in the questions directory)
        #[arg(long)]
        assessment: String,

        /// Respondent id (defaults to the configured respondent)
        #[arg(long)]
        respondent: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score a set of answers against an assessment file
    Score {
        /// Path to the assessment .toml file
        #[arg(long)]
        assessment: PathBuf,

        /// JSON object mapping question id to option label or text
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show a respondent's history, profile, and trend
    History {
        /// Respondent id (defaults to the configured respondent)
        #[arg(long)]
        respondent: Option<String>,

        /// Output format: text, json, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Output file (json and html)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate assessment TOML files
    Validate {
        /// Path to assessment file or directory
        #[arg(long)]
        assessment: PathBuf,
    },

    /// List available assessments
    List {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and sample assessment
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("assessa=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            assessment,
            respondent,
            config,
        } => commands::take::execute(assessment, respondent, config).await,
        Commands::Score {
            assessment,
            answers,
            format,
            config,
        } => commands::score::execute(assessment, answers, format, config),
        Commands::History {
            respondent,
            format,
            output,
            config,
        } => commands::history::execute(respondent, format, output, config).await,
        Commands::Validate { assessment } => commands::validate::execute(assessment),
        Commands::List { config } => commands::list::execute(config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
