use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use serde::Serialize;

use crate::archive::{ArchiveError, ArchiveResult};
use crate::counts::CountsStats;
use crate::error::CodecError;

const TOTAL_BITS_WRITTEN_KEY: &str = "totalBitsWritten";
const TOTAL_TRANSITIONS_KEY: &str = "totalTransitions";
const TOTAL_BASES_SEEN_KEY: &str = "totalBasesSeen";
const TOTAL_SITES_SEEN_KEY: &str = "totalSitesSeen";
const NUMBER_OF_SEQUENCES_KEY: &str = "numberOfSequences";
const END_KEY: &str = "END";

/// Totals over all the sequences of an archive, stored in its `#stats` part.
///
/// The part is a list of (string key, 64-bit value) pairs closed by the key
/// `END`. Strings are a big-endian `u16` byte length followed by the bytes.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    pub total_bits_written: u64,
    pub total_transitions: u64,
    pub total_bases_seen: u64,
    pub total_sites_seen: u64,
    pub number_of_sequences: u64,
}

impl ArchiveStats {
    pub fn add_sequence(&mut self, stats: CountsStats) {
        self.total_bits_written += stats.bits_written;
        self.total_transitions += stats.transitions;
        self.total_bases_seen += stats.bases_seen;
        self.total_sites_seen += stats.sites_seen;
        self.number_of_sequences += 1;
    }

    /// Average count over the sites with a non-zero count.
    #[must_use]
    pub fn average_coverage(&self) -> f64 {
        if self.total_sites_seen == 0 {
            0.0
        } else {
            self.total_bases_seen as f64 / self.total_sites_seen as f64
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> ArchiveResult<()> {
        for (key, value) in [
            (TOTAL_BITS_WRITTEN_KEY, self.total_bits_written),
            (TOTAL_TRANSITIONS_KEY, self.total_transitions),
            (TOTAL_BASES_SEEN_KEY, self.total_bases_seen),
            (TOTAL_SITES_SEEN_KEY, self.total_sites_seen),
            (NUMBER_OF_SEQUENCES_KEY, self.number_of_sequences),
        ] {
            write_string(writer, key)?;
            let value = i64::try_from(value).map_err(|_| {
                CodecError::invalid_argument(format!("{} out of range: {}", key, value))
            })?;
            writer.write_i64::<BigEndian>(value)?;
        }
        write_string(writer, END_KEY)?;

        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> ArchiveResult<Self> {
        let mut stats = Self::default();
        loop {
            let key = read_string(reader)?;
            if key == END_KEY {
                break;
            }

            let value = reader.read_i64::<BigEndian>()?;
            let value = u64::try_from(value).map_err(|_| {
                CodecError::corrupt_stream(format!("negative {}: {}", key, value))
            })?;
            match key.as_str() {
                TOTAL_BITS_WRITTEN_KEY => stats.total_bits_written = value,
                TOTAL_TRANSITIONS_KEY => stats.total_transitions = value,
                TOTAL_BASES_SEEN_KEY => stats.total_bases_seen = value,
                TOTAL_SITES_SEEN_KEY => stats.total_sites_seen = value,
                NUMBER_OF_SEQUENCES_KEY => stats.number_of_sequences = value,
                _ => debug!("Ignoring unknown stats key: {}", key),
            }
        }

        Ok(stats)
    }

    pub fn to_bytes(&self) -> ArchiveResult<Vec<u8>> {
        let mut data = Vec::new();
        self.write_to(&mut data)?;
        Ok(data)
    }
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> ArchiveResult<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| CodecError::invalid_argument(format!("string too long: {}", value)))?;
    writer.write_u16::<BigEndian>(len)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> ArchiveResult<String> {
    let len = reader.read_u16::<BigEndian>()?;
    let mut data = vec![0; len as usize];
    reader.read_exact(&mut data)?;
    String::from_utf8(data).map_err(ArchiveError::from)
}
