use crate::counts::{CountsWriter, EncodedCounts};
use crate::error::{CodecError, CodecResult};

/// Builds runs out of per-position counts and feeds them to a
/// [`CountsWriter`].
///
/// Positions that are never appended hold a count of zero, and consecutive
/// positions with the same count are merged into a single run.
#[derive(Debug)]
pub struct CountsAccumulator {
    writer: CountsWriter,
    run_count: u32,
    run_start: u64,
    run_length: u32,
}

impl CountsAccumulator {
    #[must_use]
    pub fn new(writer: CountsWriter) -> Self {
        Self {
            writer,
            run_count: 0,
            run_start: 0,
            run_length: 0,
        }
    }

    /// Position following the last appended one.
    #[inline]
    #[must_use]
    pub fn next_position(&self) -> u64 {
        self.run_start + u64::from(self.run_length)
    }

    pub fn append(&mut self, count: i64, position: u32) -> CodecResult<()> {
        let count = u32::try_from(count).map_err(|_| {
            CodecError::invalid_argument(format!(
                "count {} at position {} out of range",
                count, position
            ))
        })?;
        let next_position = self.next_position();
        if u64::from(position) < next_position {
            return Err(CodecError::invalid_argument(format!(
                "position {} does not follow position {}",
                position,
                next_position.saturating_sub(1)
            )));
        }

        let gap = u64::from(position) - next_position;
        if gap > 0 {
            self.push_run(0, gap as u32)?;
        }
        self.push_run(count, 1)
    }

    fn push_run(&mut self, count: u32, length: u32) -> CodecResult<()> {
        if count == self.run_count {
            self.run_length = self
                .run_length
                .checked_add(length)
                .ok_or_else(|| CodecError::invalid_argument("run length out of range"))?;
            return Ok(());
        }

        if self.run_length > 0 {
            self.writer.append_count(self.run_count, self.run_length)?;
        }
        self.run_start = self.next_position();
        self.run_count = count;
        self.run_length = length;
        Ok(())
    }

    /// Writes the pending run, returns the count to zero if needed and gives
    /// the writer back without terminating its stream.
    pub fn close(mut self) -> CodecResult<CountsWriter> {
        if self.run_length > 0 {
            self.writer.append_count(self.run_count, self.run_length)?;
        }
        if self.run_count != 0 {
            self.writer.append_count(0, 1)?;
        }

        Ok(self.writer)
    }

    pub fn finish(self) -> CodecResult<EncodedCounts> {
        self.close()?.finish()
    }
}
