use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const LOG_FILE_NAME: &str = "jobtrack.log";

static LOG_FILE: OnceLock<Mutex<fs::File>> = OnceLock::new();

pub fn log_path(app_dir: &Path) -> PathBuf {
    app_dir.join("logs").join(LOG_FILE_NAME)
}

/// Opens `<app_dir>/logs/jobtrack.log`, keeping the previous run as `.old`.
pub fn init(app_dir: &Path) -> Result<()> {
    let log_path = log_path(app_dir);
    let log_dir = app_dir.join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    if log_path.exists() {
        let old_path = log_dir.join(format!("{}.old", LOG_FILE_NAME));
        if old_path.exists() {
            let _ = fs::remove_file(&old_path);
        }
        let _ = fs::rename(&log_path, old_path);
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);

    #[cfg(unix)]
    {
        options.mode(0o600);
    }

    let file = options.open(&log_path).context("Failed to open log file")?;
    let _ = LOG_FILE.set(Mutex::new(file));
    Ok(())
}

fn write_line(level: &str, msg: &str) {
    if let Some(mutex) = LOG_FILE.get() {
        if let Ok(mut file) = mutex.lock() {
            let _ = writeln!(file, "[{}] {}{}", chrono::Local::now(), level, msg);
        }
    }
}

pub fn log(msg: &str) {
    write_line("", msg);
}

pub fn warn(msg: &str) {
    write_line("WARN ", msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_rotates_previous_log_under_logs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(dir.path());
        assert_eq!(path, dir.path().join("logs").join("jobtrack.log"));

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "previous run\n").unwrap();

        init(dir.path()).unwrap();

        let old = dir.path().join("logs").join("jobtrack.log.old");
        assert_eq!(fs::read_to_string(old).unwrap(), "previous run\n");
        assert!(path.exists());
        assert!(!dir.path().join("jobtrack.log").exists());
    }
}
