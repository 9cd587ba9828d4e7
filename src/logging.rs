use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub struct RunLog {
    path: PathBuf,
    out: BufWriter<File>,
}

impl RunLog {
    pub fn create(dir: &Path, name: &str) -> Result<Self> {
        let stem: String = name
            .chars()
            .filter(|c| !matches!(c, '/' | '\\'))
            .collect();
        let stem = if stem.is_empty() { "run".to_string() } else { stem };
        let path = dir.join(format!("{stem}_harmonize.log"));
        let file = File::create(&path).with_context(|| format!("create log {}", path.display()))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        info!("{message}");
        self.write(message)
    }

    pub fn note(&mut self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        debug!("{message}");
        self.write(message)
    }

    pub fn warn(&mut self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        warn!("{message}");
        self.write(&format!("WARNING: {message}"))
    }

    fn write(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")?;
        // Flushed per line: the file is complete up to any failure.
        self.out
            .flush()
            .with_context(|| format!("write log {}", self.path.display()))
    }
}
