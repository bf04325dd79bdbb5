use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use types::{Logger, ReportFormat, log};

use crate::metrics::{ProcessReport, SystemReport};

/// Writes process and system reports to the configured directory.
///
/// Without a directory nothing is written. Write failures are logged and
/// otherwise ignored: losing a report never stops the system.
#[derive(Debug)]
pub struct ReportSink {
    dir: Option<PathBuf>,
    format: ReportFormat,
    log: Logger,
}

impl ReportSink {
    pub fn new(dir: Option<PathBuf>, format: ReportFormat, log: Logger) -> Self {
        Self {
            dir,
            format,
            log: log.scoped("report"),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn emit_process(&self, report: &ProcessReport) {
        let stem = format!("proc-{}", report.pid);
        self.emit(&stem, report, || report.to_string());
    }

    pub fn emit_system(&self, report: &SystemReport) {
        self.emit("system", report, || report.to_string());
    }

    fn emit<T: Serialize>(&self, stem: &str, report: &T, text: impl FnOnce() -> String) {
        let Some(dir) = &self.dir else {
            return;
        };
        let (path, body) = match self.format {
            ReportFormat::Text => (dir.join(format!("{}.txt", stem)), Ok(text())),
            ReportFormat::Json => (
                dir.join(format!("{}.json", stem)),
                serde_json::to_string_pretty(report).map_err(io::Error::other),
            ),
        };
        let written = body.and_then(|body| {
            fs::create_dir_all(dir)?;
            fs::write(&path, body)
        });
        match written {
            Ok(()) => log!(self.log, "wrote {}", path.display()),
            Err(err) => log!(self.log, "cannot write {}: {}", path.display(), err),
        }
    }
}
