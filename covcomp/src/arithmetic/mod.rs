//! Adaptive arithmetic coding of symbols from a fixed alphabet.
//!
//! [`ArithmeticCoder`]/[`ArithmeticDecoder`] code a single message with one
//! adaptive model. [`Order1Coder`] and [`PlusCoder`] (with their decoders)
//! route every symbol to one of several such coders depending on the
//! previous symbol, and multiplex the resulting bit buffers into one output.

use crate::bit_stream::{BitReader, BitWriter};
use crate::error::CodecResult;

mod coder;
mod decoder;
mod order1;
mod plus;

pub use coder::ArithmeticCoder;
pub use decoder::ArithmeticDecoder;
pub use order1::{Order1Coder, Order1Decoder};
pub use plus::{PlusCoder, PlusDecoder};

/// Number of significant bits of the coder state.
pub(crate) const BITS: u32 = 63;
pub(crate) const HALF: i64 = 1 << (BITS - 1);
pub(crate) const QUARTER: i64 = 1 << (BITS - 2);

pub trait SymbolEncoder {
    /// Encodes `symbol`, returning the number of bits written to `output`.
    fn encode(&mut self, symbol: usize, output: &mut BitWriter) -> CodecResult<usize>;

    /// Writes the bits needed to disambiguate the message. Must be called
    /// once after the last [`SymbolEncoder::encode`] call.
    fn flush(&mut self, output: &mut BitWriter) -> CodecResult<usize>;

    /// Prepares the encoder for a new message. Symbol statistics are kept.
    fn reset(&mut self);
}

pub trait SymbolDecoder {
    fn decode<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<usize>;

    /// Reads the disambiguating bits written by [`SymbolEncoder::flush`],
    /// returning their number.
    fn flush<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<usize>;

    /// The last 63 bits read from the input.
    fn window(&self) -> CodecResult<u64>;

    /// Leaves `input` positioned right after the data of this message, so
    /// that the next message sharing the stream can be read.
    fn reposition<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<()>;

    /// Prepares the decoder for a new message. Symbol statistics are kept.
    fn reset(&mut self);
}

/// Finds the shortest value in `[low, low + range)` that identifies the
/// interval regardless of the bits following it.
///
/// Returns the number of bits and the value itself, right-aligned.
pub(crate) fn disambiguating_bits(low: i64, range: i64) -> (u32, i64) {
    let high = low.wrapping_add(range - 1);
    let mut nbits = 1;
    let mut bits = 0;

    while nbits <= BITS {
        let shift = BITS - nbits;
        let roundup = (1i64 << shift) - 1;
        bits = (low.wrapping_add(roundup) as u64 >> shift) as i64;
        let value = bits.wrapping_shl(shift);
        let value_high = value.wrapping_add(roundup);

        // the second alternative covers `high` overflowing onto the sign bit
        if low <= value && (value_high <= high || (value_high >= 0 && high < 0)) {
            break;
        }
        nbits += 1;
    }

    (nbits, bits)
}

#[cfg(test)]
mod tests {
    use crate::arithmetic::{disambiguating_bits, HALF, QUARTER};

    #[test]
    fn test_disambiguating_bits_initial_state() {
        assert_eq!(disambiguating_bits(0, HALF), (1, 0));
    }

    #[test]
    fn test_disambiguating_bits_upper_half() {
        assert_eq!(disambiguating_bits(HALF, HALF), (1, 1));
        assert_eq!(disambiguating_bits(QUARTER, QUARTER + 1), (2, 1));
    }

    #[test]
    fn test_disambiguating_bits_sign_overflow() {
        // `low + range - 1` wraps around to a negative number
        let low = HALF + QUARTER;
        let (nbits, bits) = disambiguating_bits(low, HALF);

        assert_eq!(nbits, 2);
        assert_eq!(bits, 0b11);
    }

    #[test]
    fn test_disambiguating_bits_narrow_interval() {
        let (nbits, bits) = disambiguating_bits(12345, 2);
        assert!(nbits > 50);
        assert!(bits.wrapping_shl(63 - nbits) >= 12345);
    }
}
