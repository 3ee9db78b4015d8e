use std::io;

use covcomp::archive::SequenceSummary;

/// Writes sequence summaries to the standard output as CSV, one row per
/// sequence. The header is taken from the summary fields.
#[derive(Debug)]
pub(crate) struct CsvStatOutput {
    writer: csv::Writer<io::Stdout>,
}

impl CsvStatOutput {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: csv::Writer::from_writer(io::stdout()),
        }
    }

    pub fn add_summary(&mut self, summary: &SequenceSummary) -> anyhow::Result<()> {
        self.writer.serialize(summary)?;

        anyhow::Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;

        anyhow::Ok(())
    }
}
