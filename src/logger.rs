use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::Config;

static RELAY_LOGGER: Lazy<RelayLogger> = Lazy::new(RelayLogger::default);

/// Installs the process-wide logger. Fails if a logger is already set. An
/// unopenable `LOG_FILE` is reported after the stderr logger is installed.
pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let filter = config.min_level.filter();
    let sink = RELAY_LOGGER.configure(config);

    log::set_logger(&*RELAY_LOGGER).map_err(|e| format!("Failed to set logger: {}", e))?;
    log::set_max_level(filter);
    sink
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "💡",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    /// Case-insensitive; `warning` is accepted for `warn`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

/// One rendered log record. Serialized as-is for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LogEntry {
    fn from_record(record: &Record) -> Self {
        let location = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level: record.level().into(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub colors: bool,
    pub emojis: bool,
    pub show_location: bool,
    pub json: bool,
    pub timestamp_format: String,
    /// Every line is also appended here when set.
    pub file: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            colors: true,
            emojis: true,
            show_location: false,
            json: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            file: None,
        }
    }
}

impl LoggerConfig {
    /// Colored, emoji-tagged lines with source locations at debug level.
    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_location: true,
            ..Default::default()
        }
    }

    /// One JSON object per line at info level.
    pub fn production() -> Self {
        Self {
            colors: false,
            emojis: false,
            json: true,
            ..Default::default()
        }
    }

    /// `LOG_FORMAT=json` picks the production preset, anything else the
    /// development one. `LOG_LEVEL` and `LOG_FILE` override on top.
    pub fn from_env() -> Self {
        let mut config = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => Self::production(),
            _ => Self::development(),
        };
        if let Some(level) = env::var("LOG_LEVEL").ok().and_then(|l| LogLevel::parse(&l)) {
            config = config.with_level(level);
        }
        if let Ok(path) = env::var("LOG_FILE") {
            config = config.with_file(path);
        }
        config
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Human-readable line. Colors are applied only when `colors` is set.
    pub fn render(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format(&self.timestamp_format).to_string();
        let level = if self.emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };
        let location = match (&entry.location, self.show_location) {
            (Some(location), true) => format!(" ({})", location),
            _ => String::new(),
        };

        if self.colors {
            format!(
                "{} [{}] {} {}{}",
                timestamp.bright_black(),
                level.color(entry.level.color()).bold(),
                entry.target.bright_blue(),
                entry.message,
                location.bright_black()
            )
        } else {
            format!("{} [{}] {} {}{}", timestamp, level, entry.target, entry.message, location)
        }
    }

    fn line(&self, entry: &LogEntry) -> String {
        if self.json {
            serde_json::to_string(entry).unwrap_or_else(|_| entry.message.clone())
        } else {
            self.render(entry)
        }
    }
}

/// Writes to stderr so stdout stays free for command output.
#[derive(Default)]
pub struct RelayLogger {
    config: Mutex<LoggerConfig>,
    file: Mutex<Option<File>>,
}

impl RelayLogger {
    /// Applies `config`. If the file sink cannot be opened, logging carries
    /// on to stderr only and the open error is returned.
    pub fn configure(&self, mut config: LoggerConfig) -> Result<(), String> {
        let (file, sink) = match config.file.as_ref() {
            None => (None, Ok(())),
            Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => (Some(file), Ok(())),
                Err(e) => (
                    None,
                    Err(format!("Failed to open log file {}: {}", path.display(), e)),
                ),
            },
        };
        if file.is_none() {
            config.file = None;
        }

        if let Ok(mut slot) = self.file.lock() {
            *slot = file;
        }
        if let Ok(mut slot) = self.config.lock() {
            *slot = config;
        }
        sink
    }
}

impl log::Log for RelayLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level.filter(),
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        let Ok(config) = self.config.lock() else {
            return;
        };
        if record.level() > config.min_level.filter() {
            return;
        }

        let entry = LogEntry::from_record(record);
        eprintln!("{}", config.line(&entry));

        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let plain = if config.json {
                    config.line(&entry)
                } else {
                    config.clone().with_colors(false).render(&entry)
                };
                let _ = writeln!(file, "{}", plain);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Logs the elapsed time of a named operation when dropped.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!("⏱️  {} took {}ms", self.name, self.elapsed().as_millis());
    }
}

pub fn timer(name: &str) -> Timer {
    Timer {
        name: name.to_string(),
        start: Instant::now(),
    }
}

pub fn log_startup_info(app_name: &str, version: &str, config: &Config) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🌐 Server will run on http://{}:{}", config.host, config.port());
}

pub fn log_config_info(config: &Config) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Upstream: {}", config.upstream.base_url);
    log::info!("   Default model: {}", config.default_model);
    log::info!("   Max tokens per request: {}", config.upstream.max_tokens);
    log::info!("   Upstream timeout: {}s", config.upstream.timeout_secs);
    log::info!(
        "   App identity: {} ({})",
        config.upstream.app_title,
        config.upstream.app_url
    );
}
