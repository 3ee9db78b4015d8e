use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::counts::{CountsReader, CountsSource};
use crate::error::{CodecError, CodecResult};

/// State of a counts stream at the start of one transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CountIndexEntry {
    /// First position of the transition.
    pub position: u32,
    /// Offset of the transition's bits from the beginning of the stream.
    pub bit_offset: u64,
    /// Count holding from `position` on.
    pub count: u32,
}

impl CountIndexEntry {
    #[must_use]
    pub const fn new(position: u32, bit_offset: u64, count: u32) -> Self {
        Self {
            position,
            bit_offset,
            count,
        }
    }
}

/// Sparse index over a counts stream, allowing a reader to jump close to any
/// position without decoding everything before it.
///
/// Serialized as a big-endian `i32` entry count followed by three `i32`
/// arrays: positions, bit offsets and counts.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CountIndex {
    entries: Vec<CountIndexEntry>,
}

impl CountIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<CountIndexEntry>) -> CodecResult<Self> {
        let increasing = entries.windows(2).all(|pair| {
            pair[0].position < pair[1].position && pair[0].bit_offset < pair[1].bit_offset
        });
        if !increasing {
            return Err(CodecError::invalid_argument(
                "index entries must increase in position and bit offset",
            ));
        }

        Ok(Self { entries })
    }

    pub(crate) fn push(&mut self, entry: CountIndexEntry) {
        debug_assert!(self
            .entries
            .last()
            .map_or(true, |last| last.position < entry.position));
        self.entries.push(entry);
    }

    /// Builds an index by scanning a finished counts stream, recording every
    /// `stride`-th transition starting with the first one.
    pub fn build(data: &[u8], stride: u32) -> CodecResult<Self> {
        if stride == 0 {
            return Err(CodecError::invalid_argument("index stride must be positive"));
        }

        let mut reader = CountsReader::new(data.to_vec())?;
        let mut index = Self::new();
        let mut transitions: u64 = 0;
        loop {
            let bit_offset = reader.bit_position();
            if !reader.has_next_transition()? {
                break;
            }
            reader.next_transition()?;

            if transitions % u64::from(stride) == 0 {
                index.push(CountIndexEntry::new(
                    reader.position(),
                    bit_offset,
                    reader.count(),
                ));
            }
            transitions += 1;
        }

        debug!(
            "Built index with {} entries over {} transitions",
            index.len(),
            transitions
        );
        Ok(index)
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[CountIndexEntry] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last entry starting at or before `position`.
    #[must_use]
    pub fn entry_at_or_before(&self, position: u32) -> Option<&CountIndexEntry> {
        let after = self
            .entries
            .partition_point(|entry| entry.position <= position);
        after.checked_sub(1).map(|index| &self.entries[index])
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> CodecResult<()> {
        writer.write_i32::<BigEndian>(to_i32(self.entries.len() as u64, "entry count")?)?;
        for entry in &self.entries {
            writer.write_i32::<BigEndian>(to_i32(u64::from(entry.position), "position")?)?;
        }
        for entry in &self.entries {
            writer.write_i32::<BigEndian>(to_i32(entry.bit_offset, "bit offset")?)?;
        }
        for entry in &self.entries {
            writer.write_i32::<BigEndian>(to_i32(u64::from(entry.count), "count")?)?;
        }

        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> CodecResult<Self> {
        let len = from_i32(reader.read_i32::<BigEndian>()?, "entry count")? as usize;

        let mut read_array = || -> CodecResult<Vec<u32>> {
            (0..len)
                .map(|_| from_i32(reader.read_i32::<BigEndian>()?, "index value"))
                .collect()
        };
        let positions = read_array()?;
        let offsets = read_array()?;
        let counts = read_array()?;

        let entries = positions
            .into_iter()
            .zip(offsets)
            .zip(counts)
            .map(|((position, offset), count)| {
                CountIndexEntry::new(position, u64::from(offset), count)
            })
            .collect();
        Self::from_entries(entries).map_err(|_| CodecError::corrupt_stream("index not sorted"))
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        let mut data = Vec::with_capacity(4 + self.entries.len() * 12);
        self.write_to(&mut data)?;
        Ok(data)
    }
}

fn to_i32(value: u64, what: &str) -> CodecResult<i32> {
    i32::try_from(value)
        .map_err(|_| CodecError::invalid_argument(format!("index {} {} out of range", what, value)))
}

fn from_i32(value: i32, what: &str) -> CodecResult<u32> {
    u32::try_from(value)
        .map_err(|_| CodecError::corrupt_stream(format!("negative index {}: {}", what, value)))
}

#[cfg(test)]
mod tests {
    use crate::counts::{CountIndex, CountIndexEntry, CountsWriter, CountsWriterParams};
    use crate::error::CodecError;

    fn sample_index() -> CountIndex {
        CountIndex::from_entries(vec![
            CountIndexEntry::new(0, 9, 1),
            CountIndexEntry::new(100, 240, 0),
            CountIndexEntry::new(250, 410, 12),
        ])
        .unwrap()
    }

    #[test]
    fn test_entry_at_or_before() {
        let index = sample_index();

        assert_eq!(index.entry_at_or_before(0).unwrap().position, 0);
        assert_eq!(index.entry_at_or_before(99).unwrap().position, 0);
        assert_eq!(index.entry_at_or_before(100).unwrap().position, 100);
        assert_eq!(index.entry_at_or_before(5000).unwrap().position, 250);
        assert!(CountIndex::new().entry_at_or_before(5).is_none());
    }

    #[test]
    fn test_serialization() {
        let index = sample_index();
        let data = index.to_bytes().unwrap();

        assert_eq!(data.len(), 4 + 3 * 12);
        assert_eq!(&data[0..4], &[0, 0, 0, 3]);
        // positions first, then offsets
        assert_eq!(&data[8..12], &[0, 0, 0, 100]);
        assert_eq!(&data[16..20], &[0, 0, 0, 9]);
        assert_eq!(CountIndex::read_from(&mut data.as_slice()).unwrap(), index);
    }

    #[test]
    fn test_read_truncated() {
        let data = sample_index().to_bytes().unwrap();

        assert!(matches!(
            CountIndex::read_from(&mut &data[..20]),
            Err(CodecError::IoError(_))
        ));
    }

    #[test]
    fn test_unsorted_entries() {
        let result = CountIndex::from_entries(vec![
            CountIndexEntry::new(10, 9, 1),
            CountIndexEntry::new(5, 20, 0),
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_build_matches_writer() {
        let params = CountsWriterParams::builder().index_stride(3).build();
        let mut writer = CountsWriter::with_params(params).unwrap();
        for i in 0..100u32 {
            writer.append_count((i % 2) * (1 + i % 7), 1 + i % 5).unwrap();
        }
        let encoded = writer.finish().unwrap();

        let built = CountIndex::build(&encoded.data, 3).unwrap();
        assert!(!built.is_empty());
        assert_eq!(built, encoded.index);
    }

    #[test]
    fn test_build_invalid_stride() {
        assert!(CountIndex::build(&[], 0).is_err());
    }
}
