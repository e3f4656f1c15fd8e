use crate::sensor_readings::SensorSample;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Appends one line per sample, reopening the target every time so external
/// rotation between records is picked up.
pub struct RecordWriter {
    path: PathBuf,
    echo: bool,
}

impl RecordWriter {
    pub fn new(path: impl Into<PathBuf>, echo: bool) -> Self {
        Self {
            path: path.into(),
            echo,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, sample: &SensorSample) -> io::Result<()> {
        self.append_echoing_to(sample, &mut io::stdout().lock())
    }

    /// Errors only when the record file cannot be written; a failed echo is logged.
    fn append_echoing_to(&self, sample: &SensorSample, echo: &mut impl Write) -> io::Result<()> {
        let line = format!("{sample}\n");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        drop(file);

        if self.echo {
            if let Err(err) = echo.write_all(line.as_bytes()).and_then(|()| echo.flush()) {
                warn!(error = %err, "failed to echo record to console");
            }
        }
        Ok(())
    }
}
