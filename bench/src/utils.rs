//! Result file helpers
//!
//! Raw results are written to one file per sweep iteration, named
//! `<prefix>[_<name>]_<machine>_<MMDD_HHMM>_<iteration>.csv`. Every write is
//! flushed and synced so that an interrupted sweep leaves complete lines.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use log::info;

use crate::types::BenchmarkResult;

/// Stem shared by all iterations of one sweep, e.g. `fio_csf_f01_0312_1542`.
#[must_use]
pub fn result_stem(
    prefix: &str,
    name: Option<&str>,
    machine: &str,
    started: DateTime<Local>,
) -> String {
    let stamp = started.format("%m%d_%H%M");
    match name {
        Some(name) => format!("{prefix}_{name}_{machine}_{stamp}"),
        None => format!("{prefix}_{machine}_{stamp}"),
    }
}

/// Path of one iteration's result file.
#[must_use]
pub fn result_path(dir: &Path, stem: &str, iteration: u32) -> PathBuf {
    dir.join(format!("{stem}_{iteration}.csv"))
}

/// Append-only raw result file.
#[derive(Debug)]
pub struct ResultWriter {
    path: PathBuf,
    file: File,
}

impl ResultWriter {
    /// Creates (or truncates) the file, creating parent directories.
    pub fn create(path: PathBuf) -> BenchmarkResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        info!("Writing results to {}", path.display());
        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `text` and syncs it to disk.
    pub fn write(&mut self, text: &str) -> BenchmarkResult<()> {
        self.file.write_all(text.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    pub fn write_line(&mut self, line: &str) -> BenchmarkResult<()> {
        self.write(&format!("{line}\n"))
    }
}
