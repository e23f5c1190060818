//! Command line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use kobomail::config::load_config;
use kobomail::integrations::{self, IntegrationPaths};
use kobomail::logging::{self, LogFormat, LogSettings};
use kobomail::{notify, pipeline, KoboMailError};

const DEFAULT_CONFIG: &str = "/mnt/onboard/.adds/kobomail/kobomail_cfg.toml";
const DEFAULT_LOG_FILE: &str = "/mnt/onboard/.adds/kobomail/kobomail.log";

#[derive(Parser)]
#[command(name = "kobomail", version, about = "Fetch e-books sent by email onto a Kobo reader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG, env = "KOBOMAIL_CONFIG")]
    config: PathBuf,

    /// Log file, `/dev/stdout` to only log to the console
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log level (error, warn, info, debug)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Console)]
    log_format: LogFormat,

    /// Folder the e-books are saved to, overrides the configuration
    #[arg(long, global = true)]
    library_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new e-books from the mailbox
    Run,
    /// Remove the NickelMenu entry, udev rules and NickelSeries plugin
    Uninstall,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init(&LogSettings {
        level: cli.log_level.clone(),
        format: cli.log_format,
        file: Some(cli.log_file.clone()),
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run => run(&cli).await,
        Commands::Uninstall => uninstall(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "KoboMail failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), KoboMailError> {
    let mut config = load_config(&cli.config)?;
    if let Some(library_path) = &cli.library_path {
        config.application_config.library_path = library_path.clone();
    }
    info!(config = %cli.config.display(), "Configuration loaded");

    let capability = notify::probe().await;
    let summary = pipeline::run(&config, &capability, &IntegrationPaths::default()).await?;
    info!(
        messages = summary.messages_found,
        ebooks = summary.ebooks_processed,
        deleted = summary.messages_deleted,
        "KoboMail finished"
    );
    Ok(())
}

fn uninstall() -> Result<(), KoboMailError> {
    info!("Removing KoboMail integrations");
    integrations::uninstall(&IntegrationPaths::default())?;
    info!("KoboMail integrations removed, the library folder was kept");
    Ok(())
}
