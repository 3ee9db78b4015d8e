use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use binrw::BinWrite;
use log::{debug, info, trace};

use crate::archive::common::{format_bytes, format_stats};
use crate::archive::data::{
    ArchiveDirectoryEntry, ArchiveDirectoryHeader, ArchiveHeader, ArchiveTrailer,
};
use crate::archive::no_seek::NoSeek;
use crate::archive::{
    data_part_name, index_part_name, ArchiveError, ArchiveResult, ArchiveStats, ARCHIVE_VERSION,
    STATS_PART_NAME,
};
use crate::counts::{CountIndex, CountsWriter, CountsWriterParams, DEFAULT_INDEX_STRIDE};
use crate::progress::{ByteNum, DummyProgressNotifier, ProgressNotifier};

/// Tickets identify the writers handed out, across all archives.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct CountsArchiveWriterParams {
    index_stride: u32,
    progress_notifier: Arc<dyn ProgressNotifier>,
}

impl CountsArchiveWriterParams {
    pub fn builder() -> CountsArchiveWriterParamsBuilder {
        CountsArchiveWriterParamsBuilder::new()
    }
}

impl Default for CountsArchiveWriterParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone)]
pub struct CountsArchiveWriterParamsBuilder {
    index_stride: u32,
    progress_notifier: Arc<dyn ProgressNotifier>,
}

impl CountsArchiveWriterParamsBuilder {
    pub fn new() -> Self {
        Self {
            index_stride: DEFAULT_INDEX_STRIDE,
            progress_notifier: Arc::new(DummyProgressNotifier),
        }
    }

    /// Number of transitions between two entries of each sequence's index.
    pub fn index_stride(&mut self, index_stride: u32) -> &mut Self {
        let mut new = self;
        new.index_stride = index_stride;
        new
    }

    pub fn progress_notifier(&mut self, progress_notifier: Arc<dyn ProgressNotifier>) -> &mut Self {
        let mut new = self;
        new.progress_notifier = progress_notifier;
        new
    }

    pub fn build(&mut self) -> CountsArchiveWriterParams {
        CountsArchiveWriterParams {
            index_stride: self.index_stride,
            progress_notifier: self.progress_notifier.clone(),
        }
    }
}

impl Default for CountsArchiveWriterParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct CurrentSequence {
    ticket: u64,
    index: u32,
    identifier: String,
}

/// Writes a counts archive, one sequence at a time.
///
/// [`CountsArchiveWriter::new_count_writer`] hands out a [`CountsWriter`]
/// for a sequence; the finished writer has to be passed back to
/// [`CountsArchiveWriter::return_writer`] before the next one is requested.
///
/// # Examples
/// ```
/// use covcomp::archive::{CountsArchiveReader, CountsArchiveWriter};
/// use covcomp::counts::CountsSource;
///
/// let mut archive = CountsArchiveWriter::new(Vec::new())?;
/// let mut writer = archive.new_count_writer(0, "chr1")?;
/// writer.append_count(0, 100)?;
/// writer.append_count(12, 30)?;
/// archive.return_writer(writer)?;
/// let data = archive.finish()?;
///
/// let mut archive = CountsArchiveReader::new(std::io::Cursor::new(data))?;
/// let mut reader = archive.count_reader("chr1")?;
/// reader.skip_to(50)?;
/// assert_eq!(reader.count(), 12);
/// # Ok::<(), covcomp::archive::ArchiveError>(())
/// ```
#[derive(Debug)]
pub struct CountsArchiveWriter<W> {
    writer: NoSeek<W>,
    params: CountsArchiveWriterParams,
    directory: Vec<ArchiveDirectoryEntry>,
    part_names: HashSet<String>,
    indices: HashSet<u32>,
    identifiers: HashSet<String>,
    current: Option<CurrentSequence>,
    stats: ArchiveStats,
    start_time: Instant,
}

impl<W: Write> CountsArchiveWriter<W> {
    pub fn new(writer: W) -> ArchiveResult<Self> {
        Self::with_params(writer, CountsArchiveWriterParams::default())
    }

    pub fn with_params(writer: W, params: CountsArchiveWriterParams) -> ArchiveResult<Self> {
        let mut writer = NoSeek::new(writer);
        let header = ArchiveHeader {
            version: ARCHIVE_VERSION,
        };
        header.write_to(&mut writer)?;

        Ok(Self {
            writer,
            params,
            directory: Vec::new(),
            part_names: HashSet::new(),
            indices: HashSet::new(),
            identifiers: HashSet::new(),
            current: None,
            stats: ArchiveStats::default(),
            start_time: Instant::now(),
        })
    }

    /// Starts a new sequence stored under `"<index>,<identifier>"`.
    pub fn new_count_writer(&mut self, index: u32, identifier: &str) -> ArchiveResult<CountsWriter> {
        if self.current.is_some() {
            return Err(ArchiveError::InvalidState);
        }
        if identifier.is_empty() || identifier.contains('\n') {
            return Err(ArchiveError::invalid_part_name(identifier));
        }
        let name = data_part_name(index, identifier);
        // indices and identifiers must both be unique
        if self.indices.contains(&index) || self.identifiers.contains(identifier) {
            return Err(ArchiveError::DuplicatePart(name));
        }

        let ticket = NEXT_TICKET.fetch_add(1, Ordering::Relaxed);
        self.current = Some(CurrentSequence {
            ticket,
            index,
            identifier: identifier.to_owned(),
        });
        trace!("Starting sequence {} (ticket {})", name, ticket);

        // the index is built by scanning the finished stream
        let params = CountsWriterParams::builder().index_stride(0).build();
        let mut writer = CountsWriter::with_params(params)?;
        writer.ticket = Some(ticket);
        Ok(writer)
    }

    /// Starts a new sequence whose identifier is its index.
    pub fn new_count_writer_for_index(&mut self, index: u32) -> ArchiveResult<CountsWriter> {
        self.new_count_writer(index, &index.to_string())
    }

    /// Stores the stream of a writer obtained from
    /// [`CountsArchiveWriter::new_count_writer`], along with its index.
    pub fn return_writer(&mut self, writer: CountsWriter) -> ArchiveResult<()> {
        let expected = self.current.as_ref().map(|current| current.ticket);
        if expected.is_none() || writer.ticket != expected {
            return Err(ArchiveError::WriterMismatch {
                expected,
                actual: writer.ticket,
            });
        }
        let current = self.current.take().ok_or(ArchiveError::InvalidState)?;

        let encoded = writer.finish()?;
        let index = if self.params.index_stride == 0 {
            CountIndex::new()
        } else {
            CountIndex::build(&encoded.data, self.params.index_stride)?
        };

        let name = data_part_name(current.index, &current.identifier);
        self.write_part(name, &encoded.data)?;
        let index_name = index_part_name(current.index, &current.identifier);
        self.write_part(index_name, &index.to_bytes()?)?;
        self.indices.insert(current.index);
        self.identifiers.insert(current.identifier.clone());

        self.stats.add_sequence(encoded.stats);
        self.params
            .progress_notifier
            .processed_bytes(ByteNum::new(encoded.data.len()));
        self.params.progress_notifier.inc_iter();

        debug!(
            "Stored sequence {} ({}): {} transitions in {}, {} index entries",
            current.index,
            current.identifier,
            encoded.stats.transitions,
            format_bytes(ByteNum::new(encoded.data.len())),
            index.len()
        );
        Ok(())
    }

    fn write_part(&mut self, name: String, data: &[u8]) -> ArchiveResult<()> {
        if !self.part_names.insert(name.clone()) {
            return Err(ArchiveError::DuplicatePart(name));
        }
        let name_len =
            u16::try_from(name.len()).map_err(|_| ArchiveError::invalid_part_name(&name))?;

        let offset = self.writer.position();
        self.writer.write_all(data)?;
        trace!("Part {} at offset {}, {} bytes", name, offset, data.len());

        self.directory.push(ArchiveDirectoryEntry {
            name_len,
            name: name.into_bytes(),
            offset,
            length: data.len() as u64,
            checksum: crc32fast::hash(data),
        });
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> ArchiveStats {
        self.stats
    }

    /// Writes the `#stats` part and the directory, and returns the
    /// underlying writer.
    pub fn finish(mut self) -> ArchiveResult<W> {
        if self.current.is_some() {
            return Err(ArchiveError::InvalidState);
        }

        let stats = self.stats.to_bytes()?;
        self.write_part(STATS_PART_NAME.to_owned(), &stats)?;

        let directory_offset = self.writer.position();
        let directory_header = ArchiveDirectoryHeader {
            part_num: self.directory.len() as u32,
        };
        directory_header.write_to(&mut self.writer)?;
        for entry in &self.directory {
            entry.write_to(&mut self.writer)?;
        }
        let trailer = ArchiveTrailer { directory_offset };
        trailer.write_to(&mut self.writer)?;
        self.writer.flush()?;

        self.print_stats();
        Ok(self.writer.into_inner())
    }

    fn print_stats(&self) {
        let out_bytes = self.writer.position();
        let stats = &self.stats;

        info!(
            "Wrote {}",
            format_stats(self.start_time, ByteNum::new(out_bytes as usize))
        );
        info!("{} sequences", stats.number_of_sequences);
        info!(
            "{} transitions, {:.3} bits per transition",
            stats.total_transitions,
            stats.total_bits_written as f64 / stats.total_transitions.max(1) as f64
        );
        info!(
            "{} bases over {} sites (average coverage {:.3})",
            stats.total_bases_seen,
            stats.total_sites_seen,
            stats.average_coverage()
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::archive::{ArchiveError, CountsArchiveWriter};
    use crate::counts::CountsWriter;

    #[test]
    fn test_one_writer_at_a_time() {
        let mut archive = CountsArchiveWriter::new(Vec::new()).unwrap();
        let writer = archive.new_count_writer(0, "chr1").unwrap();

        assert!(matches!(
            archive.new_count_writer(1, "chr2"),
            Err(ArchiveError::InvalidState)
        ));
        archive.return_writer(writer).unwrap();
        assert!(archive.new_count_writer(1, "chr2").is_ok());
    }

    #[test]
    fn test_writer_mismatch() {
        let mut archive = CountsArchiveWriter::new(Vec::new()).unwrap();
        let mut other = CountsArchiveWriter::new(Vec::new()).unwrap();
        let writer = archive.new_count_writer(0, "chr1").unwrap();
        let foreign = other.new_count_writer(0, "chr1").unwrap();

        assert!(matches!(
            archive.return_writer(foreign),
            Err(ArchiveError::WriterMismatch {
                expected: Some(_),
                actual: Some(_)
            })
        ));
        assert!(matches!(
            archive.return_writer(CountsWriter::new()),
            Err(ArchiveError::WriterMismatch {
                expected: Some(_),
                actual: None
            })
        ));
        archive.return_writer(writer).unwrap();
    }

    #[test]
    fn test_return_without_writer() {
        let mut archive = CountsArchiveWriter::new(Vec::new()).unwrap();

        assert!(matches!(
            archive.return_writer(CountsWriter::new()),
            Err(ArchiveError::WriterMismatch {
                expected: None,
                actual: None
            })
        ));
    }

    #[test]
    fn test_duplicate_sequence() {
        let mut archive = CountsArchiveWriter::new(Vec::new()).unwrap();
        let writer = archive.new_count_writer(0, "chr1").unwrap();
        archive.return_writer(writer).unwrap();

        assert!(matches!(
            archive.new_count_writer(0, "chr1"),
            Err(ArchiveError::DuplicatePart(_))
        ));
        assert!(matches!(
            archive.new_count_writer(1, "chr1"),
            Err(ArchiveError::DuplicatePart(_))
        ));
        assert!(matches!(
            archive.new_count_writer(0, "chr2"),
            Err(ArchiveError::DuplicatePart(_))
        ));
        assert!(matches!(
            archive.new_count_writer(0, ""),
            Err(ArchiveError::InvalidPartName(_))
        ));
    }

    #[test]
    fn test_finish_with_outstanding_writer() {
        let mut archive = CountsArchiveWriter::new(Vec::new()).unwrap();
        let _writer = archive.new_count_writer(0, "chr1").unwrap();

        assert!(matches!(archive.finish(), Err(ArchiveError::InvalidState)));
    }

    #[test]
    fn test_stats() {
        let mut archive = CountsArchiveWriter::new(Vec::new()).unwrap();
        for (index, identifier) in ["chr1", "chr2"].into_iter().enumerate() {
            let mut writer = archive.new_count_writer(index as u32, identifier).unwrap();
            writer.append_count(0, 10).unwrap();
            writer.append_count(3, 5).unwrap();
            writer.append_count(0, 1).unwrap();
            archive.return_writer(writer).unwrap();
        }

        let stats = archive.stats();
        assert_eq!(stats.number_of_sequences, 2);
        assert_eq!(stats.total_transitions, 6);
        assert_eq!(stats.total_bases_seen, 30);
        assert_eq!(stats.total_sites_seen, 10);
        assert!(archive.finish().unwrap().starts_with(b"COVCOMP\0\x01"));
    }
}
