use std::io::Write;

use log::{trace, warn};

use crate::counts::CountsSource;
use crate::error::{CodecError, CodecResult};

/// Writes counts as a `variableStep` wiggle track of fixed-size windows.
///
/// A window opens at the first non-zero position after the previous window
/// and is written as `"<start + 1> <average>"` once it fills up or once the
/// next non-zero position falls outside of it. The average is rounded to the
/// nearest integer.
#[derive(Debug)]
pub struct WiggleWriter<W> {
    writer: W,
    window_size: u32,
    max_position: Option<u64>,
    start: Option<u64>,
    filled: u32,
    total: u64,
}

impl<W: Write> WiggleWriter<W> {
    pub fn new(writer: W, window_size: u32) -> CodecResult<Self> {
        if window_size == 0 {
            return Err(CodecError::invalid_argument("window size must be positive"));
        }

        Ok(Self {
            writer,
            window_size,
            max_position: None,
            start: None,
            filled: 0,
            total: 0,
        })
    }

    /// Skips the windows extending past `max_position`, e.g. the length of
    /// the sequence.
    #[must_use]
    pub fn with_max_position(mut self, max_position: u64) -> Self {
        self.max_position = Some(max_position);
        self
    }

    pub fn write_track_header(&mut self, name: &str) -> CodecResult<()> {
        writeln!(
            self.writer,
            "track type=wiggle_0 name={} visibility=full viewLimits=1:200",
            name
        )?;
        Ok(())
    }

    /// Starts a new sequence: flushes the pending window and writes the
    /// `variableStep` header.
    pub fn start_sequence(&mut self, chromosome: &str) -> CodecResult<()> {
        self.finish_window()?;
        self.start = None;
        writeln!(
            self.writer,
            "variableStep chrom={} span={}",
            chromosome, self.window_size
        )?;
        Ok(())
    }

    pub fn add(&mut self, position: u32, length: u32, count: u32) -> CodecResult<()> {
        if count == 0 {
            return Ok(());
        }
        let position = u64::from(position);
        let window_size = u64::from(self.window_size);

        match self.start {
            Some(start) if position < start + window_size => {
                self.filled = (position - start) as u32;
            }
            Some(_) => {
                self.finish_window()?;
                self.start = Some(position);
            }
            None => self.start = Some(position),
        }

        let mut remaining = length;
        while remaining > 0 {
            let chunk = remaining.min(self.window_size - self.filled);
            self.total += u64::from(count) * u64::from(chunk);
            self.filled += chunk;
            remaining -= chunk;

            if self.filled == self.window_size {
                self.finish_window()?;
                self.start = self.start.map(|start| start + window_size);
            }
        }
        Ok(())
    }

    /// Adds every remaining transition of `source`.
    pub fn add_source<S: CountsSource>(&mut self, source: &mut S) -> CodecResult<()> {
        while source.has_next_transition()? {
            source.next_transition()?;
            self.add(source.position(), source.length(), source.count())?;
        }
        Ok(())
    }

    fn finish_window(&mut self) -> CodecResult<()> {
        if self.filled == 0 {
            return Ok(());
        }
        let start = self.start.unwrap_or_default();
        let average = (self.total as f64 / f64::from(self.filled) + 0.5).floor() as u64;
        trace!(
            "Window at {}: average {} ({}/{})",
            start,
            average,
            self.total,
            self.filled
        );

        let end = start + u64::from(self.window_size);
        if self.max_position.map_or(true, |max_position| end <= max_position) {
            // wiggle positions are 1-based
            writeln!(self.writer, "{} {}", start + 1, average)?;
        } else {
            warn!("Skipping window {} {} past the end of data", start + 1, average);
        }

        self.filled = 0;
        self.total = 0;
        Ok(())
    }

    /// Writes the pending window and returns the underlying writer.
    pub fn finish(mut self) -> CodecResult<W> {
        self.finish_window()?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
