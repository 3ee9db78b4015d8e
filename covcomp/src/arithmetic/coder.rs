use crate::arithmetic::{disambiguating_bits, SymbolEncoder, HALF, QUARTER};
use crate::bit_stream::BitWriter;
use crate::error::{CodecError, CodecResult};
use crate::frequency_model::FrequencyModel;

/// Adaptive order-0 arithmetic coder with 63 bits of precision.
///
/// The symbol statistics survive [`SymbolEncoder::reset`], so several short
/// messages coded one after another share a single model.
#[derive(Debug, Clone)]
pub struct ArithmeticCoder {
    model: FrequencyModel,
    low: i64,
    range: i64,
    outstanding_bits: u64,
    first_bit: bool,
    flushed: bool,
}

impl ArithmeticCoder {
    pub fn new(symbol_num: usize) -> CodecResult<Self> {
        Ok(Self {
            model: FrequencyModel::new(symbol_num)?,
            low: 0,
            range: HALF,
            outstanding_bits: 0,
            first_bit: true,
            flushed: false,
        })
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &FrequencyModel {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn symbol_num(&self) -> usize {
        self.model.symbol_num()
    }

    /// Writes `bit` followed by all the outstanding bits, complemented.
    fn emit(&mut self, bit: bool, output: &mut BitWriter) -> usize {
        // always 0, never written
        if self.first_bit {
            self.first_bit = false;
            return 0;
        }

        output.write_bit(bit);
        for _ in 0..self.outstanding_bits {
            output.write_bit(!bit);
        }
        let written = 1 + self.outstanding_bits as usize;
        self.outstanding_bits = 0;
        written
    }
}

impl SymbolEncoder for ArithmeticCoder {
    fn encode(&mut self, symbol: usize, output: &mut BitWriter) -> CodecResult<usize> {
        if self.flushed {
            return Err(CodecError::InvalidState);
        }
        self.model.check_symbol(symbol)?;

        let r = self.range / i64::from(self.model.total());
        let low_count = i64::from(self.model.cumulative_count_unchecked(symbol));
        self.low = self.low.wrapping_add(r * low_count);
        if symbol == self.model.symbol_num() - 1 {
            self.range -= r * low_count;
        } else {
            let high_count = i64::from(self.model.cumulative_count_unchecked(symbol + 1));
            self.range = r * (high_count - low_count);
        }
        self.model.increment_unchecked(symbol)?;

        let mut written = 0;
        while self.range <= QUARTER {
            if self.low >= HALF {
                written += self.emit(true, output);
                self.low -= HALF;
            } else if self.low.wrapping_add(self.range) <= HALF {
                written += self.emit(false, output);
            } else {
                self.low -= QUARTER;
                self.outstanding_bits += 1;
            }

            self.low <<= 1;
            self.range <<= 1;
        }

        Ok(written)
    }

    fn flush(&mut self, output: &mut BitWriter) -> CodecResult<usize> {
        if self.flushed {
            return Err(CodecError::InvalidState);
        }

        let (nbits, bits) = disambiguating_bits(self.low, self.range);
        let mut written = 0;
        for i in 1..=nbits {
            let bit = (bits as u64 >> (nbits - i)) & 1 == 1;
            written += self.emit(bit, output);
        }

        self.flushed = true;
        Ok(written)
    }

    fn reset(&mut self) {
        self.low = 0;
        self.range = HALF;
        self.outstanding_bits = 0;
        self.first_bit = true;
        self.flushed = false;
    }
}
