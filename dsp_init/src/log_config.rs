use anyhow::{Context, Result};
use console::{style, Color};
use env_logger::Builder;
use log::{debug, warn, Level, LevelFilter, Log, Metadata, Record};
use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use std::fs::{create_dir_all, read_dir, remove_file};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::APP_NAME;

const MAX_LOG_FILES: usize = 2;
const LOG_SIZE_LIMIT: u64 = 5 * 1024 * 1024;

/// Sends every record to the colored console logger and, as plain text, to a
/// rolling log file.
struct TeeLogger {
    console: env_logger::Logger,
    file: Mutex<BasicRollingFileAppender>,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.console.matches(record) {
            return;
        }
        self.console.log(record);

        let line = file_line(
            &chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        if let Ok(mut file) = self.file.lock() {
            if let Err(e) = file.write_all(line.as_bytes()) {
                eprintln!("Failed to write log entry to file: {:?}", e);
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

fn file_line(timestamp: &str, level: Level, target: &str, message: &str) -> String {
    format!("{} - {} - {} - {}\n", timestamp, level, target, message)
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::Cyan,
    }
}

/// Initializes the console and rolling file logger.
///
/// Console lines carry a colored level; the same entries are appended in plain
/// text to `app.log` in the application data directory (or `./logs` when no data
/// directory can be determined). The file rolls over at 5 MB and at most two log
/// files are kept.
///
/// # Parameters
/// - `log_level`: The most verbose level that gets emitted.
pub fn initialize_logger(log_level: LevelFilter) -> Result<()> {
    let log_dir = log_directory();
    create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file_path = log_dir.join("app.log");
    let file = BasicRollingFileAppender::new(
        log_file_path.clone(),
        RollingConditionBasic::new().max_size(LOG_SIZE_LIMIT),
        MAX_LOG_FILES,
    )
    .context("Failed to create rolling file appender")?;

    manage_log_files(&log_dir, MAX_LOG_FILES).context("Failed to manage log files")?;

    let console = Builder::new()
        .filter(None, log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{:<5}] {} - {}",
                style(record.level()).fg(level_color(record.level())),
                buf.timestamp(),
                record.args()
            )
        })
        .build();

    log::set_boxed_logger(Box::new(TeeLogger {
        console,
        file: Mutex::new(file),
    }))
    .context("Failed to initialize logger")?;
    log::set_max_level(log_level);

    debug!("Logs are also written to {:?}", log_file_path);
    Ok(())
}

fn log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Deletes the oldest `.log` files in `log_dir` until at most `max_log_files` remain.
fn manage_log_files(log_dir: &Path, max_log_files: usize) -> Result<()> {
    let entries = read_dir(log_dir).context("Failed to read log directory")?;

    let mut log_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "log"))
        .collect();

    // oldest first
    log_files.sort_by_key(|path| path.metadata().and_then(|m| m.modified()).ok());

    let excess = log_files.len().saturating_sub(max_log_files);
    for old_file in log_files.iter().take(excess) {
        match remove_file(old_file) {
            Ok(()) => debug!("Deleted old log file: {:?}", old_file),
            Err(e) => warn!("Failed to delete old log file {:?}: {}", old_file, e),
        }
    }

    Ok(())
}
