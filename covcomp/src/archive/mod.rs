//! Container holding the counts of many sequences in a single file.
//!
//! Every sequence is stored as two parts: its counts stream under
//! `"<index>,<identifier>"` and the stream's [`CountIndex`](crate::counts::CountIndex)
//! under `"#index:<index>,<identifier>"`. The totals over all the sequences
//! are kept in a single `"#stats"` part.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::string::FromUtf8Error;

use crate::error::CodecError;

mod common;
mod data;
pub mod no_seek;
mod reader;
mod stats;
mod writer;

pub use reader::{CachingCountsArchiveReader, CountsArchiveReader, SequenceSummary};
pub use stats::ArchiveStats;
pub use writer::{CountsArchiveWriter, CountsArchiveWriterParams, CountsArchiveWriterParamsBuilder};

pub(crate) const ARCHIVE_VERSION: u8 = 1;

pub const STATS_PART_NAME: &str = "#stats";
const INDEX_PART_PREFIX: &str = "#index:";

#[derive(Debug, Default)]
pub enum ArchiveError {
    #[default]
    InvalidState,
    IoError(std::io::Error),
    SerializeError(binrw::Error),
    Utf8Error(FromUtf8Error),
    CodecError(CodecError),
    UnsupportedVersion(u8),
    ChecksumMismatch(String, u32, u32),
    MissingPart(String),
    InvalidPartName(String),
    WriterMismatch { expected: Option<u64>, actual: Option<u64> },
    DuplicatePart(String),
    PartOutOfBounds(String),
}

impl ArchiveError {
    #[must_use]
    pub fn checksum_mismatch(part: &str, actual: u32, expected: u32) -> Self {
        Self::ChecksumMismatch(part.to_owned(), actual, expected)
    }

    #[must_use]
    pub fn missing_part<T: Into<String>>(part: T) -> Self {
        Self::MissingPart(part.into())
    }

    #[must_use]
    pub fn invalid_part_name<T: Into<String>>(name: T) -> Self {
        Self::InvalidPartName(name.into())
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl From<binrw::Error> for ArchiveError {
    fn from(e: binrw::Error) -> Self {
        Self::SerializeError(e)
    }
}

impl From<FromUtf8Error> for ArchiveError {
    fn from(e: FromUtf8Error) -> Self {
        Self::Utf8Error(e)
    }
}

impl From<CodecError> for ArchiveError {
    fn from(e: CodecError) -> Self {
        Self::CodecError(e)
    }
}

impl Display for ArchiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::InvalidState => write!(f, "Invalid archive state"),
            ArchiveError::IoError(e) => write!(f, "IO error: {}", e),
            ArchiveError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            ArchiveError::Utf8Error(e) => write!(f, "UTF-8 error: {}", e),
            ArchiveError::CodecError(e) => write!(f, "Codec error: {}", e),
            ArchiveError::UnsupportedVersion(version) => {
                write!(f, "Unsupported archive version: {}", version)
            }
            ArchiveError::ChecksumMismatch(part, actual, expected) => write!(
                f,
                "Invalid checksum of part {} (actual: {:08X}, expected: {:08X})",
                part, actual, expected
            ),
            ArchiveError::MissingPart(part) => write!(f, "Missing archive part: {}", part),
            ArchiveError::InvalidPartName(name) => write!(f, "Invalid part name: {}", name),
            ArchiveError::WriterMismatch { expected, actual } => write!(
                f,
                "Returned counts writer does not match the current one \
                (expected: {:?}, actual: {:?})",
                expected, actual
            ),
            ArchiveError::DuplicatePart(part) => write!(f, "Duplicate archive part: {}", part),
            ArchiveError::PartOutOfBounds(part) => {
                write!(f, "Archive part {} extends past the data section", part)
            }
        }
    }
}

impl Error for ArchiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ArchiveError::IoError(e) => Some(e),
            ArchiveError::SerializeError(e) => Some(e),
            ArchiveError::Utf8Error(e) => Some(e),
            ArchiveError::CodecError(e) => Some(e),
            _ => None,
        }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[must_use]
pub fn data_part_name(index: u32, identifier: &str) -> String {
    format!("{},{}", index, identifier)
}

#[must_use]
pub fn index_part_name(index: u32, identifier: &str) -> String {
    format!("{}{}", INDEX_PART_PREFIX, data_part_name(index, identifier))
}

/// Kind of a part, decoded from its name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum PartName {
    Data(u32, String),
    Index(u32, String),
    Stats,
    Other,
}

impl PartName {
    pub fn parse(name: &str) -> ArchiveResult<Self> {
        if name == STATS_PART_NAME {
            return Ok(Self::Stats);
        }
        if let Some(data_name) = name.strip_prefix(INDEX_PART_PREFIX) {
            let (index, identifier) = Self::parse_data_name(data_name)?;
            return Ok(Self::Index(index, identifier));
        }
        if name.starts_with('#') {
            return Ok(Self::Other);
        }

        let (index, identifier) = Self::parse_data_name(name)?;
        Ok(Self::Data(index, identifier))
    }

    fn parse_data_name(name: &str) -> ArchiveResult<(u32, String)> {
        let (index, identifier) = name
            .split_once(',')
            .ok_or_else(|| ArchiveError::invalid_part_name(name))?;
        let index = index
            .parse()
            .map_err(|_| ArchiveError::invalid_part_name(name))?;
        if identifier.is_empty() {
            return Err(ArchiveError::invalid_part_name(name));
        }

        Ok((index, identifier.to_owned()))
    }
}
