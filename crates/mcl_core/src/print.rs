use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use chrono::{Datelike, Timelike};

pub struct LoggingState {
    writer: BufWriter<File>,
}

impl LoggingState {
    #[must_use]
    pub fn create() -> Option<Mutex<LoggingState>> {
        let logs_dir = launcher_data_dir()?.join("logs");
        std::fs::create_dir_all(&logs_dir).ok()?;

        let now = chrono::Local::now();
        let log_file_name = format!(
            "{}-{}-{}-{}-{}-{}.log",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second()
        );
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(log_file_name))
            .ok()?;

        Some(Mutex::new(LoggingState {
            writer: BufWriter::new(file),
        }))
    }

    pub fn write_str(&mut self, s: &str) {
        _ = self.writer.write_all(s.as_bytes());
        _ = self.writer.flush();
    }

    pub fn finish(&mut self) {
        _ = self.writer.flush();
        _ = self.writer.get_ref().sync_all();
    }
}

/// Launcher data directory (log files, saved config),
/// distinct from the game root.
#[must_use]
pub fn launcher_data_dir() -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("microcraft-launcher");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

pub static LOGGER: LazyLock<Option<Mutex<LoggingState>>> = LazyLock::new(LoggingState::create);

pub fn print_to_file(msg: &str) {
    if let Some(logger) = LOGGER.as_ref() {
        if let Ok(mut lock) = logger.lock() {
            lock.write_str(msg);
        }
    }
}

pub fn logger_finish() {
    if let Some(logger) = LOGGER.as_ref() {
        if let Ok(mut lock) = logger.lock() {
            lock.finish();
        }
    }
}

/// Print an informational message.
/// Saved to a log file.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        let plain_text = format!("[info] {}\n", format_args!($($arg)*));

        println!("{} {}", $crate::colored::Colorize::yellow("[info]"), format_args!($($arg)*));

        $crate::print::print_to_file(&plain_text);
    };
}

/// Print an error message.
/// Saved to a log file.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        // Ugly hack to fix compiler error
        if true {
            let plain_text = format!("[error] {}\n", format_args!($($arg)*));

            eprintln!("{} {}", $crate::colored::Colorize::red("[error]"), format_args!($($arg)*));

            $crate::print::print_to_file(&plain_text);
        }
    };
}

/// Print a point message, ie. a small step in some process.
/// Saved to a log file.
#[macro_export]
macro_rules! pt {
    ($($arg:tt)*) => {
        let plain_text = format!("- {}\n", format_args!($($arg)*));

        println!("{} {}", $crate::colored::Colorize::bold("-"), format_args!($($arg)*));

        $crate::print::print_to_file(&plain_text);
    };
}
