use log::{Level, LevelFilter, Log, Metadata, Record};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

#[derive(Debug)]
pub struct LogConfig {
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
        }
    }
}

impl LogConfig {
    /// Reads `SHARDNAV_LOG` (`error`, `warn`, `info`, `debug`, `trace`, `off`).
    pub fn from_env() -> Self {
        let level = std::env::var("SHARDNAV_LOG")
            .ok()
            .and_then(|value| value.trim().parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        Self { level }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum LogFile {
    Error,
    Graph,
    Path,
}

struct FileLogger {
    level: LevelFilter,
    files: Mutex<BTreeMap<LogFile, File>>,
}

static LOGGER: OnceLock<FileLogger> = OnceLock::new();

const BANNER: &str = "shardnav movement and pathing core";

pub fn init(root: &Path) -> Result<(), String> {
    init_with(root, LogConfig::from_env())
}

pub fn init_with(root: &Path, config: LogConfig) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;

    let mut files = BTreeMap::new();
    for (log_file, name, header) in [
        (LogFile::Error, "error.log", false),
        (LogFile::Graph, "graph.log", true),
        (LogFile::Path, "path.log", true),
    ] {
        let path = log_dir.join(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| format!("open log {} failed: {}", name, err))?;
        if header && file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
            write_header(&mut file, name)?;
        }
        files.insert(log_file, file);
    }

    let level = config.level;
    if LOGGER
        .set(FileLogger {
            level,
            files: Mutex::new(files),
        })
        .is_err()
    {
        // Lost a race with another initialiser; theirs is installed.
        return Ok(());
    }
    if let Some(logger) = LOGGER.get() {
        log::set_logger(logger).map_err(|err| format!("log backend install failed: {}", err))?;
        log::set_max_level(level);
    }
    Ok(())
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("shardnav")
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} ({}): {}\n",
            format_timestamp(),
            level_tag(record.level()),
            record.args()
        );
        let _ = write_line(self, channel(record.target()), &line);
        if record.level() <= Level::Warn {
            let _ = write_line(self, LogFile::Error, &line);
        }
    }

    fn flush(&self) {
        if let Ok(mut files) = self.files.lock() {
            for file in files.values_mut() {
                let _ = file.flush();
            }
        }
    }
}

fn channel(target: &str) -> LogFile {
    if target.starts_with("shardnav::pathing::sector_graph")
        || target.starts_with("shardnav::pathing::snapshot")
        || target.starts_with("shardnav::admin")
    {
        LogFile::Graph
    } else {
        LogFile::Path
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

fn write_line(logger: &FileLogger, log_file: LogFile, line: &str) -> std::io::Result<()> {
    let mut files = logger
        .files
        .lock()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log lock poisoned"))?;
    if let Some(file) = files.get_mut(&log_file) {
        file.write_all(line.as_bytes())?;
        file.flush()?;
    }
    Ok(())
}

fn write_header(file: &mut File, name: &str) -> Result<(), String> {
    writeln!(file, "== {BANNER}: {name} opened {} ==", format_timestamp())
        .map_err(|err| format!("{} header write failed: {}", name, err))
}

fn format_timestamp() -> String {
    format_timestamp_at(unix_timestamp())
}

fn format_timestamp_at(ts: i64) -> String {
    let datetime = breakdown_timestamp(ts);
    format!(
        "{:02}.{:02}.{} {:02}:{:02}:{:02}",
        datetime.day, datetime.month, datetime.year, datetime.hour, datetime.minute, datetime.second
    )
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

struct DateTimeParts {
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

fn breakdown_timestamp(ts: i64) -> DateTimeParts {
    let secs = ts.max(0);
    let (year, month, day) = civil_date(secs / 86_400);
    let clock = (secs % 86_400) as u32;
    DateTimeParts {
        year,
        month,
        day,
        hour: clock / 3_600,
        minute: clock / 60 % 60,
        second: clock % 60,
    }
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Gregorian date for a non-negative day count since 1970-01-01.
fn civil_date(mut days: i64) -> (i64, u32, u32) {
    let mut year = 1970;
    loop {
        let length = if is_leap(year) { 366 } else { 365 };
        if days < length {
            break;
        }
        days -= length;
        year += 1;
    }
    let february = if is_leap(year) { 29 } else { 28 };
    let lengths = [31, february, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 1;
    for length in lengths {
        if days < length {
            break;
        }
        days -= length;
        month += 1;
    }
    (year, month, days as u32 + 1)
}
