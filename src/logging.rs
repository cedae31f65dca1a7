use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use crate::settings::data_dir;

// File-backed logger; one timestamped line per record.
#[derive(Debug)]
struct FileLogger {
    log_path: PathBuf,
}

static LOGGER: OnceCell<FileLogger> = OnceCell::new();

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let entry = format!("[{}] {} - {}\n", timestamp, record.level(), record.args());
            let log_file = self.log_path.join("log.txt");

            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_file) {
                let _ = file.write_all(entry.as_bytes());
            }
        }
    }

    fn flush(&self) {}
}

pub fn init(debug_mode: bool) -> Result<(), SetLoggerError> {
    let log_path = data_dir();
    let _ = create_dir_all(&log_path);

    let max_level = if debug_mode {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    if LOGGER.set(FileLogger { log_path }).is_err() {
        // Already initialized; keep the existing logger.
        return Ok(());
    }
    log::set_logger(LOGGER.get().expect("logger was just set"))
        .map(|()| log::set_max_level(max_level))
}
