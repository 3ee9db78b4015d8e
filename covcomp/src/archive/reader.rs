use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use binrw::BinRead;
use log::{debug, trace};
use rayon::prelude::*;
use serde::Serialize;

use crate::archive::data::{
    ArchiveDirectoryEntry, ArchiveDirectoryHeader, ArchiveHeader, ArchiveTrailer,
    ARCHIVE_TRAILER_SIZE,
};
use crate::archive::{
    data_part_name, index_part_name, ArchiveError, ArchiveResult, ArchiveStats, PartName,
    ARCHIVE_VERSION, STATS_PART_NAME,
};
use crate::counts::{CountIndex, CountsReader, CountsSource};
use crate::error::CodecResult;

#[derive(Debug, Copy, Clone)]
struct PartLocation {
    offset: u64,
    length: u64,
    checksum: u32,
}

impl From<&ArchiveDirectoryEntry> for PartLocation {
    fn from(entry: &ArchiveDirectoryEntry) -> Self {
        Self {
            offset: entry.offset,
            length: entry.length,
            checksum: entry.checksum,
        }
    }
}

/// Per-sequence figures computed by decoding a whole counts stream.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSummary {
    pub index: u32,
    pub identifier: String,
    pub transitions: u64,
    /// Number of positions covered by the stream.
    pub length: u64,
    pub bases_seen: u64,
    pub sites_seen: u64,
    pub max_count: u32,
    pub compressed_bytes: u64,
}

impl SequenceSummary {
    fn compute(index: u32, identifier: String, data: Arc<[u8]>) -> CodecResult<Self> {
        let compressed_bytes = data.len() as u64;
        let mut reader = CountsReader::new(data)?;

        let mut summary = Self {
            index,
            identifier,
            transitions: 0,
            length: 0,
            bases_seen: 0,
            sites_seen: 0,
            max_count: 0,
            compressed_bytes,
        };
        for transition in reader.transitions() {
            let transition = transition?;
            let length = u64::from(transition.length);

            summary.transitions += 1;
            summary.length += length;
            summary.bases_seen += u64::from(transition.count) * length;
            if transition.count != 0 {
                summary.sites_seen += length;
            }
            summary.max_count = summary.max_count.max(transition.count);
        }

        Ok(summary)
    }
}

/// Reads a counts archive written by
/// [`CountsArchiveWriter`](crate::archive::CountsArchiveWriter).
///
/// The directory is read once when the archive is opened; the parts are
/// read and checksummed only when requested.
#[derive(Debug)]
pub struct CountsArchiveReader<R> {
    reader: R,
    parts: HashMap<String, PartLocation>,
    index_to_identifier: BTreeMap<u32, String>,
    identifier_to_index: HashMap<String, u32>,
    stats: Option<ArchiveStats>,
}

impl CountsArchiveReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> CountsArchiveReader<R> {
    pub fn new(mut reader: R) -> ArchiveResult<Self> {
        let header = ArchiveHeader::read(&mut reader)?;
        debug!("Read archive header: {:?}", header);
        if header.version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(header.version));
        }

        let stream_length = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::End(-ARCHIVE_TRAILER_SIZE))?;
        let trailer = ArchiveTrailer::read(&mut reader)?;
        if trailer.directory_offset > stream_length.saturating_sub(ARCHIVE_TRAILER_SIZE as u64) {
            return Err(ArchiveError::PartOutOfBounds("directory".to_owned()));
        }
        reader.seek(SeekFrom::Start(trailer.directory_offset))?;
        let directory_header = ArchiveDirectoryHeader::read(&mut reader)?;
        debug!(
            "Reading directory with {} parts at offset {}",
            directory_header.part_num, trailer.directory_offset
        );

        let mut archive = Self {
            reader,
            parts: HashMap::new(),
            index_to_identifier: BTreeMap::new(),
            identifier_to_index: HashMap::new(),
            stats: None,
        };
        for _ in 0..directory_header.part_num {
            let entry = ArchiveDirectoryEntry::read(&mut archive.reader)?;
            archive.add_part(&entry, trailer.directory_offset)?;
        }

        if archive.parts.contains_key(STATS_PART_NAME) {
            let data = archive.read_part(STATS_PART_NAME)?;
            archive.stats = Some(ArchiveStats::read_from(&mut data.as_ref())?);
        }
        Ok(archive)
    }

    fn add_part(&mut self, entry: &ArchiveDirectoryEntry, data_end: u64) -> ArchiveResult<()> {
        let name = String::from_utf8(entry.name.clone())?;
        trace!(
            "Directory entry {}: offset {}, length {}, checksum {:08X}",
            name,
            entry.offset,
            entry.length,
            entry.checksum
        );

        // parts lie between the header and the directory
        let end = entry.offset.checked_add(entry.length);
        if end.map_or(true, |end| end > data_end) {
            return Err(ArchiveError::PartOutOfBounds(name));
        }

        if let PartName::Data(index, identifier) = PartName::parse(&name)? {
            self.identifier_to_index.insert(identifier.clone(), index);
            self.index_to_identifier.insert(index, identifier);
        }
        if self.parts.insert(name.clone(), entry.into()).is_some() {
            return Err(ArchiveError::DuplicatePart(name));
        }
        Ok(())
    }

    fn read_part(&mut self, name: &str) -> ArchiveResult<Arc<[u8]>> {
        let location = *self
            .parts
            .get(name)
            .ok_or_else(|| ArchiveError::missing_part(name))?;

        self.reader.seek(SeekFrom::Start(location.offset))?;
        let mut data = vec![0; location.length as usize];
        self.reader.read_exact(&mut data)?;

        let checksum = crc32fast::hash(&data);
        if checksum != location.checksum {
            return Err(ArchiveError::checksum_mismatch(
                name,
                checksum,
                location.checksum,
            ));
        }
        Ok(data.into())
    }

    /// Identifiers of all the sequences, ordered by index.
    pub fn identifiers(&self) -> Vec<&str> {
        self.index_to_identifier.values().map(String::as_str).collect()
    }

    /// Indices of all the sequences, in increasing order.
    pub fn indices(&self) -> Vec<u32> {
        self.index_to_identifier.keys().copied().collect()
    }

    #[must_use]
    pub fn identifier(&self, index: u32) -> Option<&str> {
        self.index_to_identifier.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn index_of(&self, identifier: &str) -> Option<u32> {
        self.identifier_to_index.get(identifier).copied()
    }

    /// Number of sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index_to_identifier.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index_to_identifier.is_empty()
    }

    /// Totals stored in the `#stats` part, if the archive has one.
    #[must_use]
    pub fn stats(&self) -> Option<&ArchiveStats> {
        self.stats.as_ref()
    }

    fn resolve_identifier(&self, identifier: &str) -> ArchiveResult<(u32, String)> {
        let index = self
            .index_of(identifier)
            .ok_or_else(|| ArchiveError::missing_part(identifier))?;
        Ok((index, identifier.to_owned()))
    }

    fn resolve_index(&self, index: u32) -> ArchiveResult<(u32, String)> {
        let identifier = self
            .identifier(index)
            .ok_or_else(|| ArchiveError::missing_part(index.to_string()))?;
        Ok((index, identifier.to_owned()))
    }

    fn load_sequence(
        &mut self,
        index: u32,
        identifier: &str,
    ) -> ArchiveResult<(Arc<[u8]>, Option<CountIndex>)> {
        let data = self.read_part(&data_part_name(index, identifier))?;

        let index_name = index_part_name(index, identifier);
        let count_index = if self.parts.contains_key(&index_name) {
            let index_data = self.read_part(&index_name)?;
            let count_index = CountIndex::read_from(&mut index_data.as_ref())?;
            Some(count_index).filter(|count_index| !count_index.is_empty())
        } else {
            None
        };

        Ok((data, count_index))
    }

    fn make_reader(data: Arc<[u8]>, index: Option<CountIndex>) -> ArchiveResult<CountsReader> {
        let reader = match index {
            Some(index) => CountsReader::with_index(data, index)?,
            None => CountsReader::new(data)?,
        };
        Ok(reader)
    }

    /// Reader over the counts of a sequence, carrying the sequence's index
    /// when the archive has one.
    ///
    /// `identifier` may also be a full `"<index>,<identifier>"` part name.
    pub fn count_reader(&mut self, identifier: &str) -> ArchiveResult<CountsReader> {
        let (index, identifier) = self.resolve_part(identifier)?;
        let (data, count_index) = self.load_sequence(index, &identifier)?;
        Self::make_reader(data, count_index)
    }

    pub fn count_reader_by_index(&mut self, index: u32) -> ArchiveResult<CountsReader> {
        let (index, identifier) = self.resolve_index(index)?;
        let (data, count_index) = self.load_sequence(index, &identifier)?;
        Self::make_reader(data, count_index)
    }

    fn resolve_part(&self, identifier: &str) -> ArchiveResult<(u32, String)> {
        if self.identifier_to_index.contains_key(identifier) {
            return self.resolve_identifier(identifier);
        }
        match PartName::parse(identifier) {
            Ok(PartName::Data(index, name)) if self.identifier(index) == Some(name.as_str()) => {
                Ok((index, name))
            }
            _ => Err(ArchiveError::missing_part(identifier)),
        }
    }

    /// Decodes every sequence and summarizes it. The parts are read
    /// sequentially and decoded in parallel.
    pub fn summaries(&mut self) -> ArchiveResult<Vec<SequenceSummary>> {
        let sequences: Vec<(u32, String)> = self
            .index_to_identifier
            .iter()
            .map(|(&index, identifier)| (index, identifier.clone()))
            .collect();

        let mut loaded = Vec::with_capacity(sequences.len());
        for (index, identifier) in sequences {
            let data = self.read_part(&data_part_name(index, &identifier))?;
            loaded.push((index, identifier, data));
        }

        let summaries = loaded
            .into_par_iter()
            .map(|(index, identifier, data)| SequenceSummary::compute(index, identifier, data))
            .collect::<CodecResult<Vec<_>>>()?;
        Ok(summaries)
    }
}

/// [`CountsArchiveReader`] remembering the last sequence it loaded, so that
/// repeated queries about the same sequence do not read the archive again.
#[derive(Debug)]
pub struct CachingCountsArchiveReader<R> {
    archive: CountsArchiveReader<R>,
    cached: Option<(u32, Arc<[u8]>, Option<CountIndex>)>,
}

impl<R: Read + Seek> CachingCountsArchiveReader<R> {
    #[must_use]
    pub fn new(archive: CountsArchiveReader<R>) -> Self {
        Self {
            archive,
            cached: None,
        }
    }

    #[must_use]
    pub fn archive(&self) -> &CountsArchiveReader<R> {
        &self.archive
    }

    pub fn into_inner(self) -> CountsArchiveReader<R> {
        self.archive
    }

    pub fn count_reader(&mut self, identifier: &str) -> ArchiveResult<CountsReader> {
        let (index, _) = self.archive.resolve_part(identifier)?;
        self.count_reader_by_index(index)
    }

    pub fn count_reader_by_index(&mut self, index: u32) -> ArchiveResult<CountsReader> {
        match &self.cached {
            Some((cached_index, data, count_index)) if *cached_index == index => {
                trace!("Using cached sequence {}", index);
                CountsArchiveReader::<R>::make_reader(data.clone(), count_index.clone())
            }
            _ => {
                let (index, identifier) = self.archive.resolve_index(index)?;
                let (data, count_index) = self.archive.load_sequence(index, &identifier)?;
                self.cached = Some((index, data.clone(), count_index.clone()));
                CountsArchiveReader::<R>::make_reader(data, count_index)
            }
        }
    }
}
