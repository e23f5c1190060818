//! Log output setup.
//!
//! Logs go to stdout and, unless the log file is `/dev/stdout`, are also
//! appended to a log file. `RUST_LOG` overrides the configured level.

use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::error::KoboMailError;

/// Path that means "no separate log file".
pub const STDOUT_PATH: &str = "/dev/stdout";

pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// The file to append to, if any.
    pub fn log_file(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| *path != Path::new(STDOUT_PATH))
    }
}

/// Flushes the file writer when dropped.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Parses a level name as accepted on the command line.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_ascii_lowercase().as_str() {
        "error" => Some(LevelFilter::ERROR),
        "warn" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Console => fmt::layer()
            .with_ansi(ansi)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

/// Installs the global subscriber and bridges `log` records into it.
pub fn init(settings: &LogSettings) -> Result<LoggingGuard, KoboMailError> {
    let level = parse_level(&settings.level);
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(DEFAULT_LEVEL).into())
        .from_env_lossy();

    let mut layers: Vec<BoxedLayer> = vec![output_layer(settings.format, std::io::stdout, true)];

    let mut file_guard = None;
    if let Some(path) = settings.log_file() {
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| KoboMailError::Logging(format!("invalid log file {}", path.display())))?;

        std::fs::create_dir_all(dir).map_err(|e| {
            KoboMailError::Logging(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(output_layer(settings.format, writer, false));
        file_guard = Some(guard);
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(env_filter);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| KoboMailError::Logging(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| KoboMailError::Logging(e.to_string()))?;

    if level.is_none() {
        tracing::error!(
            level = %settings.level,
            "Invalid log level, falling back to {}",
            DEFAULT_LEVEL
        );
    }

    Ok(LoggingGuard { _file: file_guard })
}
