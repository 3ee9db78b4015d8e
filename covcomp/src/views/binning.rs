use crate::counts::{CountsSource, Transition};
use crate::error::{CodecError, CodecResult};
use crate::views::BinnedSource;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
struct Bin {
    position: u32,
    length: u32,
    average: f64,
    max: u32,
}

/// Groups the transitions of a source into bins covering at least
/// `bin_size` positions with a non-zero count each.
///
/// A bin starts at its first non-zero transition (or at its first transition
/// if all of its transitions are zero) and ends with its last transition.
/// The average is taken over the positions with a non-zero count only.
#[derive(Debug)]
pub struct CountBinningAdapter<S> {
    source: S,
    bin_size: u32,
    current: Bin,
    pending: Option<Bin>,
}

impl<S: CountsSource> CountBinningAdapter<S> {
    pub fn new(source: S, bin_size: u32) -> CodecResult<Self> {
        if bin_size == 0 {
            return Err(CodecError::invalid_argument("bin size must be positive"));
        }

        Ok(Self {
            source,
            bin_size,
            current: Bin::default(),
            pending: None,
        })
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn load_bin(&mut self) -> CodecResult<Option<Bin>> {
        let mut first_position = None;
        let mut position: Option<u32> = None;
        let mut length = 0;
        let mut sites: u64 = 0;
        let mut sum: u64 = 0;
        let mut max = 0;

        while sites < u64::from(self.bin_size) && self.source.has_next_transition()? {
            self.source.next_transition()?;
            let transition = self.source.transition();
            first_position.get_or_insert(transition.position);

            length = match position {
                Some(start) => transition.end().saturating_sub(start).max(transition.length),
                None => transition.length,
            };
            if transition.count != 0 {
                position.get_or_insert(transition.position);
                sites += u64::from(transition.length);
            }
            sum += u64::from(transition.count) * u64::from(transition.length);
            max = max.max(transition.count);
        }

        let position = match position.or(first_position) {
            Some(position) => position,
            None => return Ok(None),
        };
        let average = if sites == 0 {
            0.0
        } else {
            sum as f64 / sites as f64
        };
        Ok(Some(Bin {
            position,
            length,
            average,
            max,
        }))
    }
}

impl<S: CountsSource> CountsSource for CountBinningAdapter<S> {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        if self.pending.is_none() {
            self.pending = self.load_bin()?;
        }
        Ok(self.pending.is_some())
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        if !self.has_next_transition()? {
            return Err(CodecError::InvalidState);
        }
        self.current = self.pending.take().unwrap_or_default();
        Ok(())
    }

    fn position(&self) -> u32 {
        self.current.position
    }

    fn length(&self) -> u32 {
        self.current.length
    }

    fn count(&self) -> u32 {
        self.current.average as u32
    }
}

impl<S: CountsSource> BinnedSource for CountBinningAdapter<S> {
    fn average(&self) -> f64 {
        self.current.average
    }

    fn max(&self) -> u32 {
        self.current.max
    }
}

/// Groups the transitions of a source into alternating bins: maximal
/// stretches of zero counts and maximal stretches of non-zero counts.
#[derive(Debug)]
pub struct CountAdaptiveBinningAdapter<S> {
    source: S,
    current: Bin,
    pending: Option<Bin>,
    lookahead: Option<Transition>,
}

impl<S: CountsSource> CountAdaptiveBinningAdapter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: Bin::default(),
            pending: None,
            lookahead: None,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn next_source_transition(&mut self) -> CodecResult<Option<Transition>> {
        if let Some(transition) = self.lookahead.take() {
            return Ok(Some(transition));
        }
        if !self.source.has_next_transition()? {
            return Ok(None);
        }
        self.source.next_transition()?;
        Ok(Some(self.source.transition()))
    }

    fn load_bin(&mut self) -> CodecResult<Option<Bin>> {
        let first = match self.next_source_transition()? {
            Some(transition) => transition,
            None => return Ok(None),
        };
        let zero = first.count == 0;
        let mut end = first.end();
        let mut sum = u64::from(first.count) * u64::from(first.length);
        let mut max = first.count;

        while let Some(transition) = self.next_source_transition()? {
            if (transition.count == 0) != zero {
                self.lookahead = Some(transition);
                break;
            }
            end = transition.end();
            sum += u64::from(transition.count) * u64::from(transition.length);
            max = max.max(transition.count);
        }

        let length = end - first.position;
        Ok(Some(Bin {
            position: first.position,
            length,
            average: sum as f64 / f64::from(length),
            max,
        }))
    }
}

impl<S: CountsSource> CountsSource for CountAdaptiveBinningAdapter<S> {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        if self.pending.is_none() {
            self.pending = self.load_bin()?;
        }
        Ok(self.pending.is_some())
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        if !self.has_next_transition()? {
            return Err(CodecError::InvalidState);
        }
        self.current = self.pending.take().unwrap_or_default();
        Ok(())
    }

    fn position(&self) -> u32 {
        self.current.position
    }

    fn length(&self) -> u32 {
        self.current.length
    }

    fn count(&self) -> u32 {
        self.current.average as u32
    }
}

impl<S: CountsSource> BinnedSource for CountAdaptiveBinningAdapter<S> {
    fn average(&self) -> f64 {
        self.current.average
    }

    fn max(&self) -> u32 {
        self.current.max
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::counts::{CountsSource, TransitionList};
    use crate::views::{BinnedSource, CountAdaptiveBinningAdapter, CountBinningAdapter};

    /// Zeros, a short peak, zeros and a higher peak.
    fn sample_source() -> TransitionList {
        TransitionList::from_runs(&[(10, 0), (2, 2), (10, 0), (4, 6)])
    }

    #[test]
    fn test_bin_whole_source() {
        for bin_size in [5, 20, 50] {
            let mut bins = CountBinningAdapter::new(sample_source(), bin_size).unwrap();

            assert!(bins.has_next_transition().unwrap());
            bins.next_transition().unwrap();
            assert_eq!(bins.position(), 10);
            assert_eq!(bins.length(), 16);
            assert_abs_diff_eq!(bins.average(), 28.0 / 6.0);
            assert_eq!(bins.count(), 4);
            assert_eq!(bins.max(), 6);
            assert!(!bins.has_next_transition().unwrap());
        }
    }

    #[test]
    fn test_bin_smaller_than_transitions() {
        let mut bins = CountBinningAdapter::new(sample_source(), 1).unwrap();

        bins.next_transition().unwrap();
        assert_eq!((bins.position(), bins.length()), (10, 2));
        assert_abs_diff_eq!(bins.average(), 2.0);
        assert_eq!(bins.max(), 2);

        bins.next_transition().unwrap();
        assert_eq!((bins.position(), bins.length()), (22, 4));
        assert_abs_diff_eq!(bins.average(), 6.0);
        assert_eq!(bins.max(), 6);

        assert!(!bins.has_next_transition().unwrap());
    }

    #[test]
    fn test_bin_trailing_zeros() {
        let source = TransitionList::from_runs(&[(3, 1), (7, 0)]);
        let mut bins = CountBinningAdapter::new(source, 3).unwrap();

        bins.next_transition().unwrap();
        assert_eq!((bins.position(), bins.length()), (0, 3));
        bins.next_transition().unwrap();
        assert_eq!((bins.position(), bins.length()), (3, 7));
        assert_abs_diff_eq!(bins.average(), 0.0);
        assert!(!bins.has_next_transition().unwrap());
    }

    #[test]
    fn test_bin_size_zero() {
        assert!(CountBinningAdapter::new(sample_source(), 0).is_err());
    }

    #[test]
    fn test_adaptive_bins() {
        let source = TransitionList::from_runs(&[(10, 0), (2, 2), (3, 4), (10, 0), (4, 6)]);
        let mut bins = CountAdaptiveBinningAdapter::new(source);

        let mut result = Vec::new();
        while bins.has_next_transition().unwrap() {
            bins.next_transition().unwrap();
            result.push((bins.position(), bins.length(), bins.average(), bins.max()));
        }

        assert_eq!(
            result,
            vec![
                (0, 10, 0.0, 0),
                (10, 5, 16.0 / 5.0, 4),
                (15, 10, 0.0, 0),
                (25, 4, 6.0, 6),
            ]
        );
    }

    #[test]
    fn test_adaptive_bins_starting_with_peak() {
        let source = TransitionList::from_runs(&[(2, 3), (2, 5), (1, 0)]);
        let mut bins = CountAdaptiveBinningAdapter::new(source);

        bins.next_transition().unwrap();
        assert_eq!((bins.position(), bins.length(), bins.max()), (0, 4, 5));
        assert_abs_diff_eq!(bins.average(), 4.0);
        bins.next_transition().unwrap();
        assert_eq!((bins.position(), bins.length(), bins.count()), (4, 1, 0));
        assert!(bins.next_transition().is_err());
    }
}
