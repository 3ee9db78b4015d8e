use crate::arithmetic::{disambiguating_bits, SymbolDecoder, BITS, HALF, QUARTER};
use crate::bit_stream::BitReader;
use crate::error::{CodecError, CodecResult};
use crate::frequency_model::FrequencyModel;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ArithmeticDecoderState {
    Uninitialized,
    Decoding,
    Flushed,
}

/// Decoder for the messages produced by
/// [`ArithmeticCoder`](crate::arithmetic::ArithmeticCoder).
#[derive(Debug, Clone)]
pub struct ArithmeticDecoder {
    model: FrequencyModel,
    range: i64,
    buffer: i64,
    window: i64,
    state: ArithmeticDecoderState,
    /// Cumulative count computed by the last symbol search.
    last_count: Option<(usize, u32)>,
}

impl ArithmeticDecoder {
    pub fn new(symbol_num: usize) -> CodecResult<Self> {
        Ok(Self {
            model: FrequencyModel::new(symbol_num)?,
            range: HALF,
            buffer: 0,
            window: 0,
            state: ArithmeticDecoderState::Uninitialized,
            last_count: None,
        })
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &FrequencyModel {
        &self.model
    }

    /// Binary search for the symbol whose cumulative range contains `value`.
    fn find_symbol(&mut self, value: u32) -> usize {
        let mut start = 1;
        let mut end = self.model.symbol_num();

        while start < end {
            let middle = (start + end) / 2;
            let count = self.model.cumulative_count_unchecked(middle);
            if value < count {
                end = middle;
            } else if value > count {
                start = middle + 1;
            } else {
                self.last_count = Some((middle, count));
                return middle;
            }
        }

        start - 1
    }

    fn cumulative_count(&self, symbol: usize) -> u32 {
        match self.last_count {
            Some((cached_symbol, count)) if cached_symbol == symbol => count,
            _ => self.model.cumulative_count_unchecked(symbol),
        }
    }
}

impl SymbolDecoder for ArithmeticDecoder {
    fn decode<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<usize> {
        match self.state {
            ArithmeticDecoderState::Flushed => return Err(CodecError::InvalidState),
            ArithmeticDecoderState::Uninitialized => {
                let mut value = 0;
                for _ in 0..BITS - 1 {
                    value = (value << 1) | i64::from(input.read_lookahead_bit()?);
                }
                self.buffer = value;
                self.window = value;
                self.state = ArithmeticDecoderState::Decoding;
            }
            ArithmeticDecoderState::Decoding => {}
        }

        let total = i64::from(self.model.total());
        let r = self.range / total;
        let value = (self.buffer / r).min(total - 1);
        if value < 0 {
            return Err(CodecError::corrupt_stream(format!(
                "negative cumulative index: {}",
                value
            )));
        }

        let symbol = self.find_symbol(value as u32);
        let low_count = i64::from(self.cumulative_count(symbol));
        self.last_count = None;

        self.buffer -= r * low_count;
        if symbol == self.model.symbol_num() - 1 {
            self.range -= r * low_count;
        } else {
            let high_count = i64::from(self.model.cumulative_count_unchecked(symbol + 1));
            self.range = r * (high_count - low_count);
        }
        self.model.increment_unchecked(symbol)?;

        while self.range <= QUARTER {
            self.buffer <<= 1;
            self.range <<= 1;
            self.window <<= 1;
            if input.read_lookahead_bit()? {
                self.buffer += 1;
                self.window += 1;
            }
        }

        Ok(symbol)
    }

    fn flush<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<usize> {
        match self.state {
            ArithmeticDecoderState::Flushed => return Err(CodecError::InvalidState),
            // nothing was encoded, so the coder did not write anything either
            ArithmeticDecoderState::Uninitialized => {
                self.state = ArithmeticDecoderState::Flushed;
                return Ok(0);
            }
            ArithmeticDecoderState::Decoding => {}
        }

        let low = ((self.window & (HALF - 1)) + HALF).wrapping_sub(self.buffer);
        let (nbits, _) = disambiguating_bits(low, self.range);
        for _ in 0..nbits {
            self.window = (self.window << 1) | i64::from(input.read_lookahead_bit()?);
        }

        self.state = ArithmeticDecoderState::Flushed;
        Ok(nbits as usize)
    }

    fn window(&self) -> CodecResult<u64> {
        Ok((self.window & i64::MAX) as u64)
    }

    fn reposition<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<()> {
        if self.state == ArithmeticDecoderState::Uninitialized {
            self.state = ArithmeticDecoderState::Flushed;
            return Ok(());
        }

        self.flush(input)?;
        let position = input
            .position()
            .checked_sub(u64::from(BITS))
            .ok_or_else(|| CodecError::corrupt_stream("arithmetic coded data too short"))?;
        input.seek(position)
    }

    fn reset(&mut self) {
        self.range = HALF;
        self.buffer = 0;
        self.window = 0;
        self.state = ArithmeticDecoderState::Uninitialized;
        self.last_count = None;
    }
}
