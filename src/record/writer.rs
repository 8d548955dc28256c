use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::error::WriterError;
use super::sample::Sample;

pub const HEADER: &str = "timestamp,latitude,longitude,cellId,rsrp,mcc,mnc,tac,source";

/// Append-only CSV sample log. Every record is flushed as soon as it is written.
pub struct CsvLog<W: Write> {
    out: csv::Writer<W>,
}

impl CsvLog<File> {
    /// Opens `path` for appending. The header is written only when the file
    /// did not exist before this call.
    pub fn open(path: &Path) -> Result<Self, WriterError> {
        let open_err = |source| WriterError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(open_err)?;
        }

        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;

        let mut sink = CsvLog::new(file);
        if is_new {
            sink.write_record(HEADER.split(','))?;
            log::info!("Created sample log {}", path.display());
        }

        Ok(sink)
    }
}

impl<W: Write> CsvLog<W> {
    pub fn new(out: W) -> Self {
        // Fields are never quoted; the header is managed by hand.
        let out = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);
        Self { out }
    }

    /// Appends one sample and returns the line that was written.
    pub fn append(&mut self, sample: &Sample) -> Result<String, WriterError> {
        let record = sample.to_record();
        self.write_record(&record)?;
        Ok(record.join(","))
    }

    /// Best-effort final flush.
    pub fn close(mut self) {
        if let Err(e) = self.out.flush() {
            log::warn!("Final flush of sample log failed: {}", e);
        }
    }

    fn write_record<I, T>(&mut self, record: I) -> Result<(), WriterError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.out.write_record(record)?;
        self.out.flush()?;
        Ok(())
    }
}
