use std::sync::Arc;

use crate::bit_stream::BitReader;
use crate::counts::{
    decode_delta, CountIndex, CountIndexEntry, CountsSource, Transition, END_OF_DATA_MARKER,
};
use crate::error::{CodecError, CodecResult};

#[derive(Debug, Copy, Clone)]
struct DecodedTransition {
    transition: Transition,
    delta_count: i64,
}

/// Reads the transitions of a counts stream.
///
/// With a [`CountIndex`] attached, [`CountsReader::reposition`] and
/// [`CountsSource::skip_to`] jump to the nearest indexed transition instead
/// of decoding the stream from the beginning.
#[derive(Debug, Clone)]
pub struct CountsReader {
    input: BitReader<Arc<[u8]>>,
    index: Option<CountIndex>,
    header_bits: u64,
    initial_count: u32,
    current: Option<DecodedTransition>,
    pending: Option<DecodedTransition>,
    end_of_stream: bool,
}

impl CountsReader {
    pub fn new<D: Into<Arc<[u8]>>>(data: D) -> CodecResult<Self> {
        let mut input = BitReader::new(data.into());
        let initial_count = input.read_delta()?.checked_sub(1).ok_or_else(|| {
            CodecError::corrupt_stream("invalid initial count in the stream header")
        })?;

        Ok(Self {
            header_bits: input.position(),
            input,
            index: None,
            initial_count,
            current: None,
            pending: None,
            end_of_stream: false,
        })
    }

    pub fn with_index<D: Into<Arc<[u8]>>>(data: D, index: CountIndex) -> CodecResult<Self> {
        let mut reader = Self::new(data)?;
        reader.index = Some(index);
        Ok(reader)
    }

    #[must_use]
    pub fn index(&self) -> Option<&CountIndex> {
        self.index.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn initial_count(&self) -> u32 {
        self.initial_count
    }

    /// Difference between the current count and the previous one.
    #[inline]
    #[must_use]
    pub fn delta_count(&self) -> i64 {
        self.current.map_or(0, |current| current.delta_count)
    }

    /// Last position of the current run.
    #[inline]
    #[must_use]
    pub fn last_position(&self) -> u32 {
        self.current
            .map_or(0, |current| current.transition.last_position())
    }

    /// Offset of the next unread bit from the beginning of the stream.
    pub(crate) fn bit_position(&self) -> u64 {
        self.input.position()
    }

    fn decode_pair(&mut self) -> CodecResult<Option<(i64, u32)>> {
        let encoded_delta = self.input.read_gamma()?;
        if encoded_delta == END_OF_DATA_MARKER {
            return Ok(None);
        }

        let length = self.input.read_gamma()?;
        if length == 0 {
            return Err(CodecError::corrupt_stream("zero run length"));
        }
        Ok(Some((decode_delta(encoded_delta), length)))
    }

    fn decode_next(&mut self) -> CodecResult<Option<DecodedTransition>> {
        let (delta_count, length) = match self.decode_pair()? {
            Some(pair) => pair,
            None => return Ok(None),
        };

        let (position, previous_count) = match self.current {
            Some(current) => (
                current
                    .transition
                    .position
                    .checked_add(current.transition.length),
                current.transition.count,
            ),
            None => (Some(0), self.initial_count),
        };
        let position =
            position.ok_or_else(|| CodecError::corrupt_stream("position out of range"))?;
        let count = i64::from(previous_count) + delta_count;
        let count = u32::try_from(count).map_err(|_| {
            CodecError::corrupt_stream(format!(
                "count out of range at position {}: {}",
                position, count
            ))
        })?;

        Ok(Some(DecodedTransition {
            transition: Transition::new(position, length, count),
            delta_count,
        }))
    }

    /// Restores the state right after reading the transition of `entry`.
    fn load_entry(&mut self, entry: CountIndexEntry) -> CodecResult<()> {
        self.input.seek(entry.bit_offset)?;
        let (delta_count, length) = self.decode_pair()?.ok_or_else(|| {
            CodecError::corrupt_stream("index entry points at the end of data")
        })?;

        self.current = Some(DecodedTransition {
            transition: Transition::new(entry.position, length, entry.count),
            delta_count,
        });
        self.pending = None;
        self.end_of_stream = false;
        Ok(())
    }

    fn rewind(&mut self) -> CodecResult<()> {
        self.input.seek(self.header_bits)?;
        self.current = None;
        self.pending = None;
        self.end_of_stream = false;
        Ok(())
    }

    /// Moves to the first transition starting at or after `position`, or to
    /// the last transition if there is none. Unlike
    /// [`CountsSource::skip_to`], this can also move backwards.
    ///
    /// Requires an index.
    pub fn reposition(&mut self, position: u32) -> CodecResult<()> {
        let entry = self
            .index
            .as_ref()
            .ok_or(CodecError::UnsupportedOperation(
                "reposition without an index",
            ))?
            .entry_at_or_before(position)
            .copied();

        match entry {
            Some(entry) => {
                self.load_entry(entry)?;
                if entry.position >= position {
                    return Ok(());
                }
            }
            None => self.rewind()?,
        }

        while self.has_next_transition()? {
            self.next_transition()?;
            if self.position() >= position {
                break;
            }
        }
        Ok(())
    }
}

impl CountsSource for CountsReader {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }
        if self.end_of_stream {
            return Ok(false);
        }

        match self.decode_next()? {
            Some(decoded) => {
                self.pending = Some(decoded);
                Ok(true)
            }
            None => {
                self.end_of_stream = true;
                Ok(false)
            }
        }
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        if !self.has_next_transition()? {
            return Err(CodecError::InvalidState);
        }

        self.current = self.pending.take();
        Ok(())
    }

    fn position(&self) -> u32 {
        self.current.map_or(0, |current| current.transition.position)
    }

    fn length(&self) -> u32 {
        self.current.map_or(0, |current| current.transition.length)
    }

    fn count(&self) -> u32 {
        self.current
            .map_or(self.initial_count, |current| current.transition.count)
    }

    fn skip_to(&mut self, position: u32) -> CodecResult<()> {
        let entry = self
            .index
            .as_ref()
            .and_then(|index| index.entry_at_or_before(position))
            .copied();

        if let Some(entry) = entry {
            let ahead = self
                .current
                .map_or(true, |current| entry.position > current.transition.position);
            if ahead {
                self.load_entry(entry)?;
                if entry.position >= position {
                    return Ok(());
                }
            }
        }

        while self.has_next_transition()? {
            self.next_transition()?;
            if self.position() >= position {
                break;
            }
        }
        Ok(())
    }
}

/// Count at every single position covered by a source, starting from the
/// first transition.
#[derive(Debug)]
pub struct BaseCounts<S> {
    source: S,
    position: u32,
    remaining: u32,
    count: u32,
}

impl<S: CountsSource> BaseCounts<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            position: 0,
            remaining: 0,
            count: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: CountsSource> Iterator for BaseCounts<S> {
    /// `(position, count)`
    type Item = CodecResult<(u32, u32)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            match self.source.has_next_transition() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
            if let Err(e) = self.source.next_transition() {
                return Some(Err(e));
            }

            self.position = self.source.position();
            self.remaining = self.source.length();
            self.count = self.source.count();
        }

        let item = (self.position, self.count);
        self.remaining -= 1;
        match self.position.checked_add(1) {
            Some(position) => self.position = position,
            // no run extends past the last addressable position
            None => self.remaining = 0,
        }
        Some(Ok(item))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::counts::{
        BaseCounts, CountIndex, CountsReader, CountsSource, CountsWriter, CountsWriterParams,
        Transition, TransitionList,
    };
    use crate::error::{CodecError, CodecResult};

    fn write_runs(runs: &[(u32, u32)], index_stride: u32) -> (Vec<u8>, CountIndex) {
        let params = CountsWriterParams::builder()
            .index_stride(index_stride)
            .build();
        let mut writer = CountsWriter::with_params(params).unwrap();
        for &(count, length) in runs {
            writer.append_count(count, length).unwrap();
        }
        let encoded = writer.finish().unwrap();
        (encoded.data, encoded.index)
    }

    /// Eight runs of ten positions each.
    fn indexed_reader() -> CountsReader {
        let runs = [0, 1, 2, 3, 10, 11, 9, 7].map(|count| (count, 10));
        let (data, index) = write_runs(&runs, 1);
        CountsReader::with_index(data, index).unwrap()
    }

    #[test]
    fn test_read_transitions() {
        let (data, _) = write_runs(&[(0, 3), (5, 2), (0, 1)], 0);
        let mut reader = CountsReader::new(data).unwrap();

        let mut positions = Vec::new();
        let mut last_positions = Vec::new();
        let mut counts = Vec::new();
        while reader.has_next_transition().unwrap() {
            reader.next_transition().unwrap();
            positions.push(reader.position());
            last_positions.push(reader.last_position());
            counts.push(reader.count());
        }

        assert_eq!(positions, vec![0, 3, 5]);
        assert_eq!(last_positions, vec![2, 4, 5]);
        assert_eq!(counts, vec![0, 5, 0]);
        assert!(matches!(
            reader.next_transition(),
            Err(CodecError::InvalidState)
        ));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let (data, _) = write_runs(&[(4, 3), (5, 2)], 0);
        let mut reader = CountsReader::new(data).unwrap();
        assert_eq!(reader.count(), 0);

        assert!(reader.has_next_transition().unwrap());
        assert!(reader.has_next_transition().unwrap());
        assert_eq!(reader.count(), 0);
        reader.next_transition().unwrap();
        assert_eq!(reader.transition(), Transition::new(0, 3, 4));
        assert_eq!(reader.delta_count(), 4);
        reader.next_transition().unwrap();
        assert_eq!(reader.transition(), Transition::new(3, 2, 5));
        assert_eq!(reader.delta_count(), 1);
    }

    #[test]
    fn test_empty_stream() {
        let (data, _) = write_runs(&[], 0);
        let mut reader = CountsReader::new(data).unwrap();

        assert!(!reader.has_next_transition().unwrap());
        assert_eq!(reader.transitions().count(), 0);
    }

    #[test]
    fn test_reposition() {
        let mut reader = indexed_reader();

        reader.reposition(60).unwrap();
        assert_eq!((reader.position(), reader.count()), (60, 9));
        reader.reposition(30).unwrap();
        assert_eq!((reader.position(), reader.count()), (30, 3));
        reader.reposition(70).unwrap();
        assert_eq!((reader.position(), reader.count()), (70, 7));
        reader.reposition(15).unwrap();
        assert_eq!((reader.position(), reader.count()), (20, 2));

        reader.next_transition().unwrap();
        assert_eq!((reader.position(), reader.count()), (30, 3));
    }

    #[test]
    fn test_reposition_past_end() {
        let mut reader = indexed_reader();

        reader.reposition(1000).unwrap();
        assert_eq!((reader.position(), reader.count()), (70, 7));
        assert!(!reader.has_next_transition().unwrap());
    }

    #[test]
    fn test_skip_to() {
        let mut reader = indexed_reader();

        reader.skip_to(35).unwrap();
        assert_eq!((reader.position(), reader.count()), (40, 10));
        reader.skip_to(35).unwrap();
        assert_eq!((reader.position(), reader.count()), (50, 11));
        reader.skip_to(60).unwrap();
        assert_eq!((reader.position(), reader.count()), (60, 9));
        reader.next_transition().unwrap();
        assert_eq!((reader.position(), reader.count()), (70, 7));
    }

    #[test]
    fn test_reposition_requires_index() {
        let (data, _) = write_runs(&[(1, 3)], 0);
        let mut reader = CountsReader::new(data).unwrap();

        assert!(matches!(
            reader.reposition(1),
            Err(CodecError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_sparse_index_matches_linear_scan() {
        let runs: Vec<(u32, u32)> = (0..500u32)
            .map(|i| ((i * 7919) % 13 + (i % 2) * 20, 1 + i % 9))
            .collect();
        let (data, index) = write_runs(&runs, 16);
        assert!(index.len() > 10);
        let data: Arc<[u8]> = data.into();

        let mut linear = CountsReader::new(data.clone()).unwrap();
        let expected: Vec<Transition> = linear.transitions().collect::<CodecResult<_>>().unwrap();

        let mut reader = CountsReader::with_index(data, index).unwrap();
        for target in [0, 1, 17, 400, 1234, 2000, 5, 2190] {
            reader.reposition(target).unwrap();
            let rest: Vec<Transition> = std::iter::once(Ok(reader.transition()))
                .chain(reader.transitions())
                .collect::<CodecResult<_>>()
                .unwrap();

            let skipped = expected
                .iter()
                .position(|t| t.position >= target)
                .unwrap_or(expected.len() - 1);
            assert_eq!(rest, expected[skipped..].to_vec());
        }
    }

    #[test]
    fn test_base_counts() {
        let (data, _) = write_runs(&[(0, 3), (5, 2), (0, 1)], 0);
        let reader = CountsReader::new(data).unwrap();

        let counts: Vec<(u32, u32)> = BaseCounts::new(reader)
            .collect::<CodecResult<_>>()
            .unwrap();
        assert_eq!(counts, vec![(0, 0), (1, 0), (2, 0), (3, 5), (4, 5), (5, 0)]);
    }

    #[test]
    fn test_base_counts_at_last_position() {
        let source = TransitionList::new(vec![
            Transition::new(u32::MAX - 4, 2, 0),
            Transition::new(u32::MAX - 2, 3, 1),
        ]);
        let counts: Vec<(u32, u32)> = BaseCounts::new(source)
            .collect::<CodecResult<_>>()
            .unwrap();
        assert_eq!(
            counts,
            vec![
                (u32::MAX - 4, 0),
                (u32::MAX - 3, 0),
                (u32::MAX - 2, 1),
                (u32::MAX - 1, 1),
                (u32::MAX, 1)
            ]
        );

        let source = TransitionList::new(vec![Transition::new(u32::MAX - 1, 5, 3)]);
        assert_eq!(BaseCounts::new(source).count(), 2);
    }

    #[test]
    fn test_negative_count() {
        let mut output = crate::bit_stream::BitWriter::new();
        output.write_delta(3);
        // delta -5 from the initial count 2
        output.write_gamma(11);
        output.write_gamma(1);

        let mut reader = CountsReader::new(output.into_bytes()).unwrap();
        assert!(matches!(
            reader.has_next_transition(),
            Err(CodecError::CorruptStream(_))
        ));
    }
}
