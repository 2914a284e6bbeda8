//! Destinations for result records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::compute::ResultRecord;

/// Destination for computed records.
pub trait ResultsSink: Send {
    fn write(&mut self, record: &ResultRecord) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// One JSON object per line, fields in record order.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    written: u64,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create results file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ResultsSink for JsonLinesSink<W> {
    fn write(&mut self, record: &ResultRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).context("Failed to encode result record")?;
        self.writer
            .write_all(b"\n")
            .context("Failed to write result record")?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush results")
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ResultRecord>,
    pub closed: bool,
}

impl ResultsSink for MemorySink {
    fn write(&mut self, record: &ResultRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_writes_one_object_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        for name in ["a", "b"] {
            let mut record = ResultRecord::default();
            record.push("name", name);
            record.push("structure_damage", 12.5);
            sink.write(&record).unwrap();
        }
        sink.close().unwrap();
        assert_eq!(sink.written(), 2);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], r#"{"name":"b","structure_damage":12.5}"#);
    }
}
