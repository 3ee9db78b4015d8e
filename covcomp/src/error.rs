use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error occurring while encoding or decoding symbols and counts.
#[derive(Debug, Default)]
pub enum CodecError {
    /// Operation called in a state that does not permit it.
    #[default]
    InvalidState,
    /// Symbol outside of `[0, symbol_num)`.
    InvalidSymbol(usize, usize),
    /// Argument rejected by the codec (non-positive run length, empty
    /// alphabet, negative count and similar).
    InvalidArgument(String),
    /// The decoded data is inconsistent.
    CorruptStream(String),
    /// Operation not provided by this coder variant.
    UnsupportedOperation(&'static str),
    /// I/O error occurred when reading or writing the underlying stream.
    IoError(std::io::Error),
}

impl CodecError {
    #[must_use]
    pub fn invalid_symbol(symbol: usize, symbol_num: usize) -> Self {
        Self::InvalidSymbol(symbol, symbol_num)
    }

    #[must_use]
    pub fn invalid_argument<T: Into<String>>(message: T) -> Self {
        Self::InvalidArgument(message.into())
    }

    #[must_use]
    pub fn corrupt_stream<T: Into<String>>(message: T) -> Self {
        Self::CorruptStream(message.into())
    }

    #[must_use]
    pub fn end_of_stream() -> Self {
        Self::IoError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "end of bit stream",
        ))
    }

    /// Whether this error was caused by reaching the end of input data.
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, CodecError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::InvalidState => write!(f, "Invalid codec state"),
            CodecError::InvalidSymbol(symbol, symbol_num) => write!(
                f,
                "Invalid symbol (symbol: {}, alphabet size: {})",
                symbol, symbol_num
            ),
            CodecError::InvalidArgument(message) => write!(f, "Invalid argument: {}", message),
            CodecError::CorruptStream(message) => write!(f, "Corrupt stream: {}", message),
            CodecError::UnsupportedOperation(operation) => {
                write!(f, "Unsupported operation: {}", operation)
            }
            CodecError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CodecError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

/// The result of an encoding or decoding operation.
pub type CodecResult<T> = Result<T, CodecError>;
