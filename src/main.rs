use clap::{Parser, Subcommand};
use logsift::cli::default_log_filter;
use logsift::cli::run::RunArgs;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logsift")]
#[command(about = "Map-reduce analysis of structured logs with an LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSONL (or JSON array) log file and write a report
    Run {
        /// Log file to analyze
        #[arg(short, long)]
        input: PathBuf,

        /// Report destination; defaults to output_dir/report_filename from the analysis config
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value = "system_config.yaml")]
        system_config: PathBuf,

        #[arg(long, default_value = "analysis_config.yaml")]
        analysis_config: PathBuf,

        /// Log progress instead of drawing progress bars
        #[arg(long)]
        no_progress: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write starter system and analysis configs
    Init {
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        #[arg(long)]
        stdout: bool,

        #[arg(long)]
        force: bool,
    },
    /// Load and validate both config files
    Validate {
        #[arg(long, default_value = "system_config.yaml")]
        system_config: PathBuf,

        #[arg(long, default_value = "analysis_config.yaml")]
        analysis_config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let progress_bars = matches!(cli.command, Commands::Run { no_progress: false, .. })
        && std::io::stderr().is_terminal();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(progress_bars).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Credentials may live in a .env file next to the configs
    dotenvy::dotenv().ok();

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Run {
            input,
            output,
            system_config,
            analysis_config,
            ..
        } => {
            let args = RunArgs {
                input,
                output,
                system_config,
                analysis_config,
                progress: progress_bars,
            };
            logsift::cli::run::run(args)
                .await
                .map(|_| ())
                .map_err(Into::into)
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { dir, stdout, force } => {
                logsift::cli::config::init(&dir, stdout, force).map(|_| ())
            }
            ConfigAction::Validate {
                system_config,
                analysis_config,
            } => logsift::cli::config::validate(&system_config, &analysis_config),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
