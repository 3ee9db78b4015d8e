//! MSB-first bit streams with the universal integer codes used by the
//! counts codec and the multiplexing arithmetic coders.
//!
//! All codes are written most significant bit first, with no byte alignment
//! between consecutive values:
//!
//! * unary(x): `x` zeros followed by a one,
//! * gamma(x), `x >= 0`: unary(msb) followed by the `msb` low bits of `x + 1`,
//!   where `msb = floor(log2(x + 1))`,
//! * delta(x), `x >= 0`: gamma(msb) followed by the `msb` low bits of `x + 1`.

use crate::error::{CodecError, CodecResult};

/// Number of bits past the end of data that an arithmetic decoder may read
/// (as zeros) before the stream is considered truncated.
pub(crate) const LOOKAHEAD_BITS: u64 = 64;

/// In-memory bit sink.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_len: u64,
}

impl BitWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    #[inline]
    #[must_use]
    pub fn bits_written(&self) -> u64 {
        self.bit_len
    }

    /// Written bytes; the last byte is padded with zero bits.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.bit_len = 0;
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        let offset = (self.bit_len % 8) as u32;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> offset;
        }
        self.bit_len += 1;
    }

    /// Writes the `len` low bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, len: u32) -> usize {
        debug_assert!(len <= 64);

        for i in (0..len).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
        len as usize
    }

    pub fn write_unary(&mut self, value: u32) -> usize {
        for _ in 0..value {
            self.write_bit(false);
        }
        self.write_bit(true);
        value as usize + 1
    }

    pub fn write_gamma(&mut self, value: u32) -> usize {
        let value = u64::from(value) + 1;
        let msb = 63 - value.leading_zeros();
        self.write_unary(msb) + self.write_bits(value, msb)
    }

    pub fn write_delta(&mut self, value: u32) -> usize {
        let value = u64::from(value) + 1;
        let msb = 63 - value.leading_zeros();
        self.write_gamma(msb) + self.write_bits(value, msb)
    }

    /// Appends all the bits written to `other`.
    pub fn write_raw_bits(&mut self, other: &BitWriter) -> usize {
        if self.bit_len % 8 == 0 {
            self.data.extend_from_slice(&other.data);
            self.bit_len += other.bit_len;
        } else {
            let mut remaining = other.bit_len;
            for &byte in &other.data {
                let len = remaining.min(8) as u32;
                self.write_bits(u64::from(byte >> (8 - len)), len);
                remaining -= u64::from(len);
            }
        }
        other.bit_len as usize
    }
}

/// Bit source over an in-memory buffer, seekable to any bit offset.
#[derive(Debug, Clone)]
pub struct BitReader<B> {
    data: B,
    position: u64,
}

impl<B: AsRef<[u8]>> BitReader<B> {
    #[must_use]
    pub fn new(data: B) -> Self {
        Self { data, position: 0 }
    }

    /// Number of bits consumed since the beginning of the buffer.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn bit_len(&self) -> u64 {
        self.data.as_ref().len() as u64 * 8
    }

    /// Number of data bits left after the current position, not counting the
    /// zero-filled lookahead.
    #[inline]
    #[must_use]
    pub fn remaining_bits(&self) -> u64 {
        self.bit_len().saturating_sub(self.position)
    }

    #[must_use]
    pub fn get_ref(&self) -> &B {
        &self.data
    }

    pub fn seek(&mut self, position: u64) -> CodecResult<()> {
        if position > self.bit_len() {
            return Err(CodecError::invalid_argument(format!(
                "cannot seek to bit {} of a {}-bit stream",
                position,
                self.bit_len()
            )));
        }

        self.position = position;
        Ok(())
    }

    #[inline]
    fn bit_at(&self, position: u64) -> bool {
        let byte = self.data.as_ref()[(position / 8) as usize];
        (byte >> (7 - position % 8)) & 1 == 1
    }

    #[inline]
    pub fn read_bit(&mut self) -> CodecResult<bool> {
        if self.position >= self.bit_len() {
            return Err(CodecError::end_of_stream());
        }

        let bit = self.bit_at(self.position);
        self.position += 1;
        Ok(bit)
    }

    /// Reads a bit, yielding zeros for up to [`LOOKAHEAD_BITS`] bits past the
    /// end of data.
    #[inline]
    pub(crate) fn read_lookahead_bit(&mut self) -> CodecResult<bool> {
        let bit_len = self.bit_len();
        if self.position < bit_len {
            return self.read_bit();
        }
        if self.position >= bit_len + LOOKAHEAD_BITS {
            return Err(CodecError::end_of_stream());
        }

        self.position += 1;
        Ok(false)
    }

    /// Reads `len` bits (at most 64) as an unsigned number, most significant
    /// bit first.
    pub fn read_bits(&mut self, len: u32) -> CodecResult<u64> {
        debug_assert!(len <= 64);

        let mut value = 0u64;
        for _ in 0..len {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    pub fn read_unary(&mut self) -> CodecResult<u32> {
        let mut value = 0;
        while !self.read_bit()? {
            value += 1;
            if value > 64 {
                return Err(CodecError::corrupt_stream("unary code too long"));
            }
        }
        Ok(value)
    }

    pub fn read_gamma(&mut self) -> CodecResult<u32> {
        let msb = self.read_unary()?;
        self.read_msb_value(msb)
    }

    pub fn read_delta(&mut self) -> CodecResult<u32> {
        let msb = self.read_gamma()?;
        self.read_msb_value(msb)
    }

    fn read_msb_value(&mut self, msb: u32) -> CodecResult<u32> {
        if msb > 32 {
            return Err(CodecError::corrupt_stream(format!(
                "universal code with {} significant bits",
                msb
            )));
        }

        let value = ((1u64 << msb) | self.read_bits(msb)?) - 1;
        u32::try_from(value)
            .map_err(|_| CodecError::corrupt_stream(format!("universal code overflow: {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use crate::bit_stream::{BitReader, BitWriter, LOOKAHEAD_BITS};

    #[test]
    fn test_write_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0b11111, 5);
        writer.write_bit(true);

        assert_eq!(writer.bits_written(), 9);
        assert_eq!(writer.as_bytes(), &[0b1011_1111, 0b1000_0000]);
    }

    #[test]
    fn test_gamma_codes() {
        let mut writer = BitWriter::new();
        assert_eq!(writer.write_gamma(0), 1);
        assert_eq!(writer.write_gamma(1), 3);
        assert_eq!(writer.write_gamma(2), 3);
        assert_eq!(writer.write_gamma(6), 5);
        // 1 | 010 | 011 | 00111
        assert_eq!(writer.as_bytes(), &[0b1010_0110, 0b0111_0000]);

        let mut reader = BitReader::new(writer.as_bytes());
        assert_eq!(reader.read_gamma().unwrap(), 0);
        assert_eq!(reader.read_gamma().unwrap(), 1);
        assert_eq!(reader.read_gamma().unwrap(), 2);
        assert_eq!(reader.read_gamma().unwrap(), 6);
        assert_eq!(reader.position(), 12);
    }

    #[test]
    fn test_delta_codes() {
        let mut writer = BitWriter::new();
        assert_eq!(writer.write_delta(0), 1);
        // msb(2) = 1: gamma(1) = 010, then bit 0
        assert_eq!(writer.write_delta(1), 4);

        let values = [0, 1, 17, 1000, 277_492_431, u32::MAX - 1];
        for &value in &values[2..] {
            writer.write_delta(value);
        }

        let mut reader = BitReader::new(writer.as_bytes());
        for &value in &values {
            assert_eq!(reader.read_delta().unwrap(), value);
        }
    }

    #[test]
    fn test_large_gamma() {
        let mut writer = BitWriter::new();
        writer.write_gamma(u32::MAX - 1);
        writer.write_gamma(277_492_431);

        let mut reader = BitReader::new(writer.into_bytes());
        assert_eq!(reader.read_gamma().unwrap(), u32::MAX - 1);
        assert_eq!(reader.read_gamma().unwrap(), 277_492_431);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0xFFu8];
        let mut reader = BitReader::new(&data[..]);
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);

        let err = reader.read_bit().unwrap_err();
        assert!(err.is_end_of_stream());
    }

    #[test]
    fn test_corrupt_unary() {
        let data = [0u8; 16];
        let mut reader = BitReader::new(&data[..]);

        assert!(reader.read_gamma().is_err());
    }

    #[test]
    fn test_lookahead_bits() {
        let data = [0b1000_0000u8];
        let mut reader = BitReader::new(&data[..]);
        assert!(reader.read_lookahead_bit().unwrap());
        for _ in 1..8 + LOOKAHEAD_BITS {
            assert!(!reader.read_lookahead_bit().unwrap());
        }
        assert!(reader.read_lookahead_bit().is_err());
    }

    #[test]
    fn test_seek() {
        let data = [0b0000_0001u8, 0b1000_0000];
        let mut reader = BitReader::new(&data[..]);
        reader.seek(7).unwrap();
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
        assert_eq!(reader.position(), 9);

        assert!(reader.seek(16).is_ok());
        assert!(reader.seek(17).is_err());
    }

    #[test]
    fn test_write_raw_bits() {
        let mut inner = BitWriter::new();
        inner.write_bits(0b1_0110_1011, 9);

        let mut aligned = BitWriter::new();
        aligned.write_raw_bits(&inner);
        assert_eq!(aligned, inner);

        let mut unaligned = BitWriter::new();
        unaligned.write_bits(0b01, 2);
        assert_eq!(unaligned.write_raw_bits(&inner), 9);
        assert_eq!(unaligned.bits_written(), 11);

        let mut reader = BitReader::new(unaligned.as_bytes());
        assert_eq!(reader.read_bits(2).unwrap(), 0b01);
        assert_eq!(reader.read_bits(9).unwrap(), 0b1_0110_1011);
    }
}
