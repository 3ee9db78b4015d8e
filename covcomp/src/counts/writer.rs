use derive_more::{Add, AddAssign};
use log::trace;
use serde::Serialize;

use crate::bit_stream::BitWriter;
use crate::counts::{
    encode_delta, CountIndex, CountIndexEntry, DEFAULT_INDEX_STRIDE, END_OF_DATA_MARKER,
};
use crate::error::{CodecError, CodecResult};

#[derive(Debug, Clone)]
pub struct CountsWriterParams {
    initial_count: u32,
    index_stride: u32,
}

impl CountsWriterParams {
    pub fn builder() -> CountsWriterParamsBuilder {
        CountsWriterParamsBuilder::new()
    }
}

impl Default for CountsWriterParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone)]
pub struct CountsWriterParamsBuilder {
    initial_count: u32,
    index_stride: u32,
}

impl CountsWriterParamsBuilder {
    pub fn new() -> Self {
        Self {
            initial_count: 0,
            index_stride: DEFAULT_INDEX_STRIDE,
        }
    }

    /// Count preceding the first transition.
    pub fn initial_count(&mut self, initial_count: u32) -> &mut Self {
        let mut new = self;
        new.initial_count = initial_count;
        new
    }

    /// Number of transitions between two recorded index entries; 0 disables
    /// the index.
    pub fn index_stride(&mut self, index_stride: u32) -> &mut Self {
        let mut new = self;
        new.index_stride = index_stride;
        new
    }

    pub fn build(&mut self) -> CountsWriterParams {
        CountsWriterParams {
            initial_count: self.initial_count,
            index_stride: self.index_stride,
        }
    }
}

impl Default for CountsWriterParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals gathered while writing a counts stream.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Add, AddAssign, Serialize)]
pub struct CountsStats {
    pub bits_written: u64,
    pub transitions: u64,
    /// Sum of `count * run length`.
    pub bases_seen: u64,
    /// Number of positions with a non-zero count.
    pub sites_seen: u64,
}

/// A finished counts stream.
#[derive(Debug, Clone)]
pub struct EncodedCounts {
    pub data: Vec<u8>,
    pub index: CountIndex,
    pub stats: CountsStats,
}

/// Writes a step function as delta-coded runs.
///
/// Consecutive runs must have different counts; the only exception is the
/// first run, which may repeat the initial count.
#[derive(Debug)]
pub struct CountsWriter {
    output: BitWriter,
    initial_count: u32,
    index_stride: u32,
    previous_count: u32,
    position: u64,
    stats: CountsStats,
    index: CountIndex,
    pub(crate) ticket: Option<u64>,
}

impl CountsWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_params(CountsWriterParams::default())
    }

    /// Creates a writer; the initial count must be below `u32::MAX`, since
    /// the header stores it plus one.
    pub fn with_params(params: CountsWriterParams) -> CodecResult<Self> {
        if params.initial_count == u32::MAX {
            return Err(CodecError::invalid_argument(format!(
                "initial count must be below {}",
                u32::MAX
            )));
        }

        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: CountsWriterParams) -> Self {
        let mut output = BitWriter::new();
        output.write_delta(params.initial_count + 1);

        Self {
            output,
            initial_count: params.initial_count,
            index_stride: params.index_stride,
            previous_count: params.initial_count,
            position: 0,
            stats: CountsStats::default(),
            index: CountIndex::new(),
            ticket: None,
        }
    }

    /// Appends a run of `run_length` positions holding `count`. Returns the
    /// number of bits written.
    pub fn append_count(&mut self, count: u32, run_length: u32) -> CodecResult<usize> {
        if run_length == 0 {
            return Err(CodecError::invalid_argument("run length must be positive"));
        }
        let delta = i64::from(count) - i64::from(self.previous_count);
        if delta == 0 && self.stats.transitions > 0 {
            return Err(CodecError::invalid_argument(format!(
                "run with count {} repeats the previous count",
                count
            )));
        }
        let encoded_delta = encode_delta(delta)?;
        let position = u32::try_from(self.position).map_err(|_| {
            CodecError::invalid_argument(format!("position {} out of range", self.position))
        })?;

        let bit_offset = self.output.bits_written();
        let written = self.output.write_gamma(encoded_delta) + self.output.write_gamma(run_length);

        if self.index_stride != 0 && self.stats.transitions % u64::from(self.index_stride) == 0 {
            trace!(
                "Index entry: position {}, bit offset {}, count {}",
                position,
                bit_offset,
                count
            );
            self.index.push(CountIndexEntry::new(position, bit_offset, count));
        }

        self.previous_count = count;
        self.position += u64::from(run_length);
        self.stats.bits_written += written as u64;
        self.stats.transitions += 1;
        self.stats.bases_seen += u64::from(count) * u64::from(run_length);
        if count != 0 {
            self.stats.sites_seen += u64::from(run_length);
        }

        Ok(written)
    }

    #[inline]
    #[must_use]
    pub fn initial_count(&self) -> u32 {
        self.initial_count
    }

    /// Bits written by [`CountsWriter::append_count`] calls.
    #[inline]
    #[must_use]
    pub fn bits_written(&self) -> u64 {
        self.stats.bits_written
    }

    #[inline]
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.stats.transitions
    }

    #[inline]
    #[must_use]
    pub fn bases_seen(&self) -> u64 {
        self.stats.bases_seen
    }

    #[inline]
    #[must_use]
    pub fn sites_seen(&self) -> u64 {
        self.stats.sites_seen
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> CountsStats {
        self.stats
    }

    /// Number of positions covered so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Terminates the stream with the end-of-data marker.
    pub fn finish(mut self) -> CodecResult<EncodedCounts> {
        self.output.write_gamma(END_OF_DATA_MARKER);

        Ok(EncodedCounts {
            data: self.output.into_bytes(),
            index: self.index,
            stats: self.stats,
        })
    }
}

impl Default for CountsWriter {
    fn default() -> Self {
        Self::new()
    }
}
