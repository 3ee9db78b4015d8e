use crate::arithmetic::order1::{ContextCoders, ContextDecoders};
use crate::arithmetic::{SymbolDecoder, SymbolEncoder};
use crate::bit_stream::{BitReader, BitWriter};
use crate::error::{CodecError, CodecResult};

const MOST_ABUNDANT_CONTEXT: usize = 0;
const OTHER_CONTEXT: usize = 1;

/// Running symbol counts, selecting context 0 whenever the previous symbol
/// is the most abundant one seen so far.
///
/// The coder and the decoder feed it the same symbols in the same order, so
/// they always agree on the selected context.
#[derive(Debug, Clone)]
struct MostAbundantTracker {
    counts: Vec<u32>,
    most_abundant_symbol: Option<usize>,
    most_abundant_count: u32,
    previous_symbol: usize,
}

impl MostAbundantTracker {
    fn new(symbol_num: usize) -> Self {
        Self {
            counts: vec![0; symbol_num],
            most_abundant_symbol: None,
            most_abundant_count: 0,
            previous_symbol: 0,
        }
    }

    fn select_context(&mut self) -> usize {
        let previous = self.previous_symbol;
        let previous_count = self.counts[previous];

        if previous_count > self.most_abundant_count || self.most_abundant_symbol == Some(previous)
        {
            self.most_abundant_symbol = Some(previous);
            self.most_abundant_count = previous_count;
            MOST_ABUNDANT_CONTEXT
        } else {
            OTHER_CONTEXT
        }
    }

    fn observe(&mut self, symbol: usize) {
        self.counts[symbol] += 1;
        self.previous_symbol = symbol;
    }

    /// Starts a new message; symbol counts are kept.
    fn reset(&mut self) {
        self.previous_symbol = 0;
    }
}

/// Two-context arithmetic coder: one context for symbols following the most
/// abundant symbol, one for everything else.
///
/// Suited to data dominated by a single value, such as coverage with long
/// stretches of zero or of a typical depth.
#[derive(Debug, Clone)]
pub struct PlusCoder {
    contexts: ContextCoders,
    tracker: MostAbundantTracker,
}

impl PlusCoder {
    pub fn new(symbol_num: usize) -> CodecResult<Self> {
        Ok(Self {
            contexts: ContextCoders::new(2, symbol_num)?,
            tracker: MostAbundantTracker::new(symbol_num),
        })
    }
}

impl SymbolEncoder for PlusCoder {
    fn encode(&mut self, symbol: usize, _output: &mut BitWriter) -> CodecResult<usize> {
        if symbol >= self.tracker.counts.len() {
            return Err(CodecError::invalid_symbol(symbol, self.tracker.counts.len()));
        }

        let context = self.tracker.select_context();
        self.contexts.encode(context, symbol)?;
        self.tracker.observe(symbol);
        Ok(0)
    }

    fn flush(&mut self, output: &mut BitWriter) -> CodecResult<usize> {
        self.contexts.flush(output)
    }

    fn reset(&mut self) {
        self.contexts.reset();
        self.tracker.reset();
    }
}

/// Decoder for the messages produced by [`PlusCoder`].
#[derive(Debug, Clone)]
pub struct PlusDecoder {
    contexts: ContextDecoders,
    tracker: MostAbundantTracker,
}

impl PlusDecoder {
    pub fn new(symbol_num: usize) -> CodecResult<Self> {
        Ok(Self {
            contexts: ContextDecoders::new(2, symbol_num)?,
            tracker: MostAbundantTracker::new(symbol_num),
        })
    }
}

impl SymbolDecoder for PlusDecoder {
    fn decode<B: AsRef<[u8]>>(&mut self, input: &mut BitReader<B>) -> CodecResult<usize> {
        let context = self.tracker.select_context();
        let symbol = self.contexts.decode(context, input)?;
        self.tracker.observe(symbol);
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
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use crate::arithmetic::plus::{MostAbundantTracker, MOST_ABUNDANT_CONTEXT, OTHER_CONTEXT};
    use crate::arithmetic::{PlusCoder, PlusDecoder, SymbolDecoder, SymbolEncoder};
    use crate::bit_stream::{BitReader, BitWriter};
    use crate::error::CodecError;

    fn encode_messages(symbol_num: usize, messages: &[Vec<usize>]) -> BitWriter {
        let mut coder = PlusCoder::new(symbol_num).unwrap();
        let mut output = BitWriter::new();
        for message in messages {
            for &symbol in message {
                coder.encode(symbol, &mut output).unwrap();
            }
            coder.flush(&mut output).unwrap();
            coder.reset();
        }
        output
    }

    fn decode_messages(symbol_num: usize, data: &[u8], lengths: &[usize]) -> Vec<Vec<usize>> {
        let mut decoder = PlusDecoder::new(symbol_num).unwrap();
        let mut input = BitReader::new(data);
        lengths
            .iter()
            .map(|&len| {
                let message = (0..len)
                    .map(|_| decoder.decode(&mut input).unwrap())
                    .collect();
                decoder.reset();
                message
            })
            .collect()
    }

    #[test]
    fn test_context_selection() {
        let mut tracker = MostAbundantTracker::new(3);

        // nothing seen yet
        assert_eq!(tracker.select_context(), OTHER_CONTEXT);
        tracker.observe(1);
        assert_eq!(tracker.select_context(), MOST_ABUNDANT_CONTEXT);
        tracker.observe(2);
        assert_eq!(tracker.select_context(), OTHER_CONTEXT);
        tracker.observe(1);
        assert_eq!(tracker.select_context(), MOST_ABUNDANT_CONTEXT);
        tracker.observe(2);
        assert_eq!(tracker.select_context(), OTHER_CONTEXT);
        tracker.observe(2);
        // 2 has been seen three times, 1 twice
        assert_eq!(tracker.select_context(), MOST_ABUNDANT_CONTEXT);
        assert_eq!(tracker.most_abundant_symbol, Some(2));
    }

    #[test]
    fn test_round_trip_skewed() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1337);
        let message: Vec<usize> = (0..10_000)
            .map(|_| if rng.gen_bool(0.9) { 0 } else { rng.gen_range(0..50) })
            .collect();
        let messages = vec![message];
        let output = encode_messages(50, &messages);

        assert_eq!(
            decode_messages(50, output.as_bytes(), &[messages[0].len()]),
            messages
        );
    }

    #[test]
    fn test_round_trip_multiple_messages() {
        let messages = vec![
            vec![3, 3, 3, 1, 3, 3, 0],
            vec![1, 1, 1, 1, 2],
            vec![0, 3, 3, 3, 3, 3, 3, 3, 2, 3],
        ];
        let lengths: Vec<usize> = messages.iter().map(Vec::len).collect();
        let output = encode_messages(4, &messages);

        assert_eq!(decode_messages(4, output.as_bytes(), &lengths), messages);
    }

    #[test]
    fn test_invalid_symbol() {
        let mut coder = PlusCoder::new(4).unwrap();
        let mut output = BitWriter::new();

        assert!(matches!(
            coder.encode(4, &mut output),
            Err(CodecError::InvalidSymbol(4, 4))
        ));
    }

    #[test]
    fn test_unsupported_operations() {
        let mut decoder = PlusDecoder::new(2).unwrap();
        let data = [0u8; 8];
        let mut input = BitReader::new(&data[..]);

        assert!(decoder.flush(&mut input).is_err());
        assert!(decoder.window().is_err());
        assert!(decoder.reposition(&mut input).is_err());
    }
}
