//! Run-length coding of per-position counts.
//!
//! A counts stream describes a step function over positions `0, 1, 2, ...`
//! as a list of [`Transition`]s. On the wire it is:
//!
//! ```text
//! delta(initial count + 1)
//! gamma(zigzag(count - previous count)) gamma(run length)   (repeated)
//! gamma(END_OF_DATA_MARKER)
//! ```

use serde::Serialize;

use crate::error::{CodecError, CodecResult};

mod accumulator;
mod index;
mod reader;
mod writer;

pub use accumulator::CountsAccumulator;
pub use index::{CountIndex, CountIndexEntry};
pub use reader::{BaseCounts, CountsReader};
pub use writer::{
    CountsStats, CountsWriter, CountsWriterParams, CountsWriterParamsBuilder, EncodedCounts,
};

/// Gamma-coded value terminating a counts stream.
pub const END_OF_DATA_MARKER: u32 = 277_492_431;

/// Default number of transitions between two index entries.
pub const DEFAULT_INDEX_STRIDE: u32 = 10_000;

/// Maps a signed delta to a natural number: non-negative deltas to even
/// numbers, negative ones to odd numbers.
pub(crate) fn encode_delta(delta: i64) -> CodecResult<u32> {
    let encoded = if delta < 0 {
        -2 * delta + 1
    } else {
        2 * delta
    };

    match u32::try_from(encoded) {
        Ok(END_OF_DATA_MARKER) | Err(_) => Err(CodecError::invalid_argument(format!(
            "count delta {} cannot be encoded",
            delta
        ))),
        Ok(encoded) => Ok(encoded),
    }
}

pub(crate) fn decode_delta(encoded: u32) -> i64 {
    let encoded = i64::from(encoded);
    if encoded % 2 == 1 {
        -((encoded - 1) / 2)
    } else {
        encoded / 2
    }
}

/// A run of positions sharing the same count.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct Transition {
    /// First position of the run.
    pub position: u32,
    pub length: u32,
    pub count: u32,
}

impl Transition {
    #[must_use]
    pub const fn new(position: u32, length: u32, count: u32) -> Self {
        Self {
            position,
            length,
            count,
        }
    }

    /// Position right after the run.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.position.saturating_add(self.length)
    }

    /// Last position of the run.
    #[inline]
    #[must_use]
    pub const fn last_position(&self) -> u32 {
        self.end().saturating_sub(1)
    }
}

/// Source of transitions: a counts stream or a view derived from one.
///
/// Iteration is two-phase: [`CountsSource::has_next_transition`] peeks and
/// [`CountsSource::next_transition`] advances, after which the getters
/// describe the new current transition.
pub trait CountsSource {
    fn has_next_transition(&mut self) -> CodecResult<bool>;

    /// Advances to the next transition; fails with
    /// [`CodecError::InvalidState`] when there is none.
    fn next_transition(&mut self) -> CodecResult<()>;

    fn position(&self) -> u32;

    fn length(&self) -> u32;

    fn count(&self) -> u32;

    #[must_use]
    fn transition(&self) -> Transition {
        Transition::new(self.position(), self.length(), self.count())
    }

    /// Advances at least once, until the current transition starts at or
    /// after `position` or the source is exhausted.
    fn skip_to(&mut self, position: u32) -> CodecResult<()> {
        while self.has_next_transition()? {
            self.next_transition()?;
            if self.position() >= position {
                break;
            }
        }
        Ok(())
    }

    /// Iterator over the remaining transitions.
    fn transitions(&mut self) -> Transitions<'_, Self>
    where
        Self: Sized,
    {
        Transitions { source: self }
    }
}

impl<S: CountsSource + ?Sized> CountsSource for Box<S> {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        (**self).has_next_transition()
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        (**self).next_transition()
    }

    fn position(&self) -> u32 {
        (**self).position()
    }

    fn length(&self) -> u32 {
        (**self).length()
    }

    fn count(&self) -> u32 {
        (**self).count()
    }

    fn skip_to(&mut self, position: u32) -> CodecResult<()> {
        (**self).skip_to(position)
    }
}

/// Iterator returned by [`CountsSource::transitions`].
#[derive(Debug)]
pub struct Transitions<'a, S> {
    source: &'a mut S,
}

impl<'a, S: CountsSource> Iterator for Transitions<'a, S> {
    type Item = CodecResult<Transition>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.has_next_transition() {
            Ok(true) => Some(
                self.source
                    .next_transition()
                    .map(|_| self.source.transition()),
            ),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// In-memory transitions, laid out back to back from position 0.
#[derive(Debug, Clone, Default)]
pub struct TransitionList {
    transitions: Vec<Transition>,
    current: Option<usize>,
}

impl TransitionList {
    /// Creates the list from `(length, count)` runs; zero-length runs are
    /// skipped.
    #[must_use]
    pub fn from_runs(runs: &[(u32, u32)]) -> Self {
        let mut position = 0;
        let transitions = runs
            .iter()
            .filter(|(length, _)| *length > 0)
            .map(|&(length, count)| {
                let transition = Transition::new(position, length, count);
                position += length;
                transition
            })
            .collect();

        Self::new(transitions)
    }

    #[must_use]
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self {
            transitions,
            current: None,
        }
    }

    fn current(&self) -> Transition {
        self.current
            .map(|index| self.transitions[index])
            .unwrap_or_else(|| Transition::new(0, 0, 0))
    }
}

impl CountsSource for TransitionList {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        let next = self.current.map_or(0, |index| index + 1);
        Ok(next < self.transitions.len())
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        if !self.has_next_transition()? {
            return Err(CodecError::InvalidState);
        }
        self.current = Some(self.current.map_or(0, |index| index + 1));
        Ok(())
    }

    fn position(&self) -> u32 {
        self.current().position
    }

    fn length(&self) -> u32 {
        self.current().length
    }

    fn count(&self) -> u32 {
        self.current().count
    }
}

#[cfg(test)]
mod tests {
    use crate::counts::{
        decode_delta, encode_delta, CountsSource, Transition, TransitionList, END_OF_DATA_MARKER,
    };
    use crate::error::CodecError;

    #[test]
    fn test_delta_coding() {
        assert_eq!(encode_delta(0).unwrap(), 0);
        assert_eq!(encode_delta(5).unwrap(), 10);
        assert_eq!(encode_delta(-1).unwrap(), 3);
        assert_eq!(encode_delta(-5).unwrap(), 11);

        for delta in [-1000, -3, -1, 0, 1, 2, 77, 123_456] {
            assert_eq!(decode_delta(encode_delta(delta).unwrap()), delta);
        }
    }

    #[test]
    fn test_delta_colliding_with_marker() {
        let delta = decode_delta(END_OF_DATA_MARKER);
        assert!(matches!(
            encode_delta(delta),
            Err(CodecError::InvalidArgument(_))
        ));
        assert!(encode_delta(delta + 1).is_ok());
        assert!(encode_delta(i64::from(u32::MAX)).is_err());
    }

    #[test]
    fn test_transition() {
        let transition = Transition::new(10, 5, 3);

        assert_eq!(transition.end(), 15);
        assert_eq!(transition.last_position(), 14);
    }

    #[test]
    fn test_transition_list() {
        let mut list = TransitionList::from_runs(&[(3, 0), (0, 7), (2, 5), (1, 0)]);
        let transitions: Vec<Transition> = list.transitions().map(Result::unwrap).collect();

        assert_eq!(
            transitions,
            vec![
                Transition::new(0, 3, 0),
                Transition::new(3, 2, 5),
                Transition::new(5, 1, 0)
            ]
        );
        assert!(!list.has_next_transition().unwrap());
        assert!(matches!(
            list.next_transition(),
            Err(CodecError::InvalidState)
        ));
    }

    #[test]
    fn test_default_skip_to() {
        let mut list = TransitionList::from_runs(&[(10, 1), (10, 2), (10, 3), (10, 4)]);

        list.skip_to(15).unwrap();
        assert_eq!(list.transition(), Transition::new(20, 10, 3));
        // always advances at least once
        list.skip_to(15).unwrap();
        assert_eq!(list.position(), 30);
        list.skip_to(1000).unwrap();
        assert_eq!(list.position(), 30);
    }
}
