use crate::arithmetic::{ArithmeticCoder, ArithmeticDecoder, SymbolDecoder, SymbolEncoder};
use crate::bit_stream::{BitReader, BitWriter};
use crate::error::{CodecError, CodecResult};

/// Set of per-context arithmetic coders writing to private buffers.
///
/// Shared by the order-1 and plus coders. On flush, every context is written
/// as `gamma(symbol count)` followed by its coded bits.
#[derive(Debug, Clone)]
pub(super) struct ContextCoders {
    coders: Vec<ArithmeticCoder>,
    buffers: Vec<BitWriter>,
    lengths: Vec<u32>,
}

impl ContextCoders {
    pub fn new(context_num: usize, symbol_num: usize) -> CodecResult<Self> {
        let coders = (0..context_num)
            .map(|_| ArithmeticCoder::new(symbol_num))
            .collect::<CodecResult<Vec<_>>>()?;

        Ok(Self {
            coders,
            buffers: vec![BitWriter::new(); context_num],
            lengths: vec![0; context_num],
        })
    }

    pub fn encode(&mut self, context: usize, symbol: usize) -> CodecResult<()> {
        self.coders[context].encode(symbol, &mut self.buffers[context])?;
        self.lengths[context] += 1;
        Ok(())
    }

    pub fn flush(&mut self, output: &mut BitWriter) -> CodecResult<usize> {
        let mut written = 0;
        for ((coder, buffer), &length) in self
            .coders
            .iter_mut()
            .zip(self.buffers.iter_mut())
            .zip(self.lengths.iter())
        {
            coder.flush(buffer)?;
            written += output.write_gamma(length);
            written += output.write_raw_bits(buffer);
        }
        Ok(written)
    }

    pub fn reset(&mut self) {
        for coder in &mut self.coders {
            coder.reset();
        }
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.lengths.iter_mut().for_each(|length| *length = 0);
    }
}

#[derive(Debug, Clone)]
enum ContextDecodersState {
    Unloaded,
    Loaded {
        symbols: Vec<Vec<usize>>,
        cursors: Vec<usize>,
    },
}

/// Counterpart of [`ContextCoders`]: decodes every context eagerly on the
/// first request, then serves symbols from the decoded lists.
#[derive(Debug, Clone)]
pub(super) struct ContextDecoders {
    decoders: Vec<ArithmeticDecoder>,
    state: ContextDecodersState,
}

impl ContextDecoders {
    pub fn new(context_num: usize, symbol_num: usize) -> CodecResult<Self> {
        let decoders = (0..context_num)
            .map(|_| ArithmeticDecoder::new(symbol_num))
            .collect::<CodecResult<Vec<_>>>()?;

        Ok(Self {
            decoders,
            state: ContextDecodersState::Unloaded,
        })
    }

    fn load<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<()> {
        let mut symbols = Vec::with_capacity(self.decoders.len());
        for decoder in &mut self.decoders {
            let length = input.read_gamma()? as usize;
            // the length is untrusted; the list grows as symbols are decoded
            let capacity = (length as u64).min(input.remaining_bits()) as usize;
            let mut context_symbols = Vec::with_capacity(capacity);
            if length > 0 {
                for _ in 0..length {
                    context_symbols.push(decoder.decode(input)?);
                }
                decoder.reposition(input)?;
            }
            symbols.push(context_symbols);
        }

        let cursors = vec![0; symbols.len()];
        self.state = ContextDecodersState::Loaded { symbols, cursors };
        Ok(())
    }

    pub fn decode<B: AsRef<[u8]>>(
        &mut self,
        context: usize,
        input: &mut BitReader<B>,
    ) -> CodecResult<usize> {
        if let ContextDecodersState::Unloaded = self.state {
            self.load(input)?;
        }

        match &mut self.state {
            ContextDecodersState::Loaded { symbols, cursors } => {
                let symbol = symbols[context].get(cursors[context]).copied().ok_or_else(|| {
                    CodecError::corrupt_stream(format!(
                        "context {} exhausted after {} symbols",
                        context, cursors[context]
                    ))
                })?;
                cursors[context] += 1;
                Ok(symbol)
            }
            ContextDecodersState::Unloaded => Err(CodecError::InvalidState),
        }
    }

    pub fn reset(&mut self) {
        for decoder in &mut self.decoders {
            decoder.reset();
        }
        self.state = ContextDecodersState::Unloaded;
    }
}

/// Arithmetic coder using the previous symbol as the context.
#[derive(Debug, Clone)]
pub struct Order1Coder {
    contexts: ContextCoders,
    previous_symbol: usize,
}

impl Order1Coder {
    pub fn new(symbol_num: usize) -> CodecResult<Self> {
        Ok(Self {
            contexts: ContextCoders::new(symbol_num, symbol_num)?,
            previous_symbol: 0,
        })
    }
}

impl SymbolEncoder for Order1Coder {
    fn encode(&mut self, symbol: usize, _output: &mut BitWriter) -> CodecResult<usize> {
        self.contexts.encode(self.previous_symbol, symbol)?;
        self.previous_symbol = symbol;
        Ok(0)
    }

    fn flush(&mut self, output: &mut BitWriter) -> CodecResult<usize> {
        self.contexts.flush(output)
    }

    fn reset(&mut self) {
        self.contexts.reset();
        self.previous_symbol = 0;
    }
}

/// Decoder for the messages produced by [`Order1Coder`].
#[derive(Debug, Clone)]
pub struct Order1Decoder {
    contexts: ContextDecoders,
    previous_symbol: usize,
}

impl Order1Decoder {
    pub fn new(symbol_num: usize) -> CodecResult<Self> {
        Ok(Self {
            contexts: ContextDecoders::new(symbol_num, symbol_num)?,
            previous_symbol: 0,
        })
    }
}

impl SymbolDecoder for Order1Decoder {
    fn decode<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<usize> {
        let symbol = self.contexts.decode(self.previous_symbol, input)?;
        self.previous_symbol = symbol;
        Ok(symbol)
    }

    fn flush<B: AsRef<[u8]>>(&mut self, _input: &mut BitReader<B>) -> CodecResult<usize> {
        Err(CodecError::UnsupportedOperation("flush"))
    }

    fn window(&self) -> CodecResult<u64> {
        Err(CodecError::UnsupportedOperation("window"))
    }

    fn reposition<B: AsRef<[u8]>>(&mut self, _input: &mut BitReader<B>) -> CodecResult<()> {
        Err(CodecError::UnsupportedOperation("reposition"))
    }

    fn reset(&mut self) {
        self.contexts.reset();
        self.previous_symbol = 0;
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::arithmetic::{Order1Coder, Order1Decoder, SymbolDecoder, SymbolEncoder};
    use crate::bit_stream::{BitReader, BitWriter};
    use crate::error::CodecError;

    fn round_trip(symbol_num: usize, symbols: &[usize]) {
        let mut coder = Order1Coder::new(symbol_num).unwrap();
        let mut output = BitWriter::new();
        for &symbol in symbols {
            coder.encode(symbol, &mut output).unwrap();
        }
        coder.flush(&mut output).unwrap();
        output.write_delta(99);

        let mut decoder = Order1Decoder::new(symbol_num).unwrap();
        let mut input = BitReader::new(output.as_bytes());
        let decoded: Vec<usize> = (0..symbols.len())
            .map(|_| decoder.decode(&mut input).unwrap())
            .collect();
        assert_eq!(decoded, symbols);
        assert_eq!(input.read_delta().unwrap(), 99);
    }

    #[test]
    fn test_round_trip_small() {
        round_trip(3, &[0, 1, 2, 1, 0]);
    }

    #[test]
    fn test_oversized_context_length() {
        let mut output = BitWriter::new();
        output.write_gamma(u32::MAX - 1);

        let mut decoder = Order1Decoder::new(4).unwrap();
        let mut input = BitReader::new(output.as_bytes());
        let result = decoder.decode(&mut input);

        assert!(result.unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_round_trip_repeating_pattern() {
        let symbols: Vec<usize> = (0..5000).map(|i| [0, 4, 4, 2, 7][i % 5]).collect();
        round_trip(8, &symbols);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1337);
        let symbols: Vec<usize> = (0..3000).map(|_| rng.gen_range(0..20)).collect();
        round_trip(20, &symbols);
    }

    #[test]
    fn test_empty_contexts_write_only_lengths() {
        let mut coder = Order1Coder::new(4).unwrap();
        let mut output = BitWriter::new();
        coder.flush(&mut output).unwrap();

        // gamma(0) for each of the four contexts
        assert_eq!(output.bits_written(), 4);
    }

    #[test]
    fn test_multiple_messages() {
        let messages: [&[usize]; 2] = [&[1, 1, 2, 0, 1], &[2, 2, 2, 1]];

        let mut coder = Order1Coder::new(3).unwrap();
        let mut output = BitWriter::new();
        for message in messages {
            for &symbol in message {
                coder.encode(symbol, &mut output).unwrap();
            }
            coder.flush(&mut output).unwrap();
            coder.reset();
        }

        let mut decoder = Order1Decoder::new(3).unwrap();
        let mut input = BitReader::new(output.as_bytes());
        for message in messages {
            let decoded: Vec<usize> = (0..message.len())
                .map(|_| decoder.decode(&mut input).unwrap())
                .collect();
            assert_eq!(decoded, message);
            decoder.reset();
        }
    }

    #[test]
    fn test_unsupported_operations() {
        let mut decoder = Order1Decoder::new(3).unwrap();
        let data = [0u8; 8];
        let mut input = BitReader::new(&data[..]);

        assert!(matches!(
            decoder.flush(&mut input),
            Err(CodecError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            decoder.window(),
            Err(CodecError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            decoder.reposition(&mut input),
            Err(CodecError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_exhausted_context() {
        let mut coder = Order1Coder::new(2).unwrap();
        let mut output = BitWriter::new();
        coder.encode(1, &mut output).unwrap();
        coder.flush(&mut output).unwrap();

        let mut decoder = Order1Decoder::new(2).unwrap();
        let mut input = BitReader::new(output.as_bytes());
        assert_eq!(decoder.decode(&mut input).unwrap(), 1);
        assert!(matches!(
            decoder.decode(&mut input),
            Err(CodecError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_invalid_symbol() {
        let mut coder = Order1Coder::new(2).unwrap();
        let mut output = BitWriter::new();

        assert!(coder.encode(2, &mut output).is_err());
        coder.flush(&mut output).unwrap();
        assert_eq!(output.bits_written(), 2);
    }
}
