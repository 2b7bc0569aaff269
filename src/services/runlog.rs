use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Append-only execution log for one run.
///
/// Built once per run and handed down by reference. Every line is also
/// forwarded to the `log` facade. Without a file it only forwards.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    path: Option<Arc<PathBuf>>,
}

impl RunLog {
    pub fn to_file(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: Some(Arc::new(path)),
        })
    }

    pub fn console() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(|p| p.as_path())
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.write(LogLevel::Info, msg.as_ref());
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.write(LogLevel::Success, msg.as_ref());
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        self.write(LogLevel::Warning, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.write(LogLevel::Error, msg.as_ref());
    }

    pub fn write(&self, level: LogLevel, msg: &str) {
        match level {
            LogLevel::Info | LogLevel::Success => log::info!("{}", msg),
            LogLevel::Warning => log::warn!("{}", msg),
            LogLevel::Error => log::error!("{}", msg),
        }
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let line = format_line(&chrono::Local::now(), level, msg);
        let _ = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
    }
}

fn format_line<Tz: chrono::TimeZone>(at: &chrono::DateTime<Tz>, level: LogLevel, msg: &str) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("[{}] [{}] {}\n", at.format("%Y-%m-%d %H:%M:%S"), level, msg)
}
