use serde::Serialize;

use crate::counts::{CountsSource, Transition};
use crate::error::CodecResult;

/// A maximal stretch of adjacent transitions whose counts exceed the
/// detection threshold.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct Peak {
    pub start: u32,
    pub length: u32,
    /// Sum of the counts over all the positions of the peak.
    pub total: u64,
    pub max: u32,
}

impl Peak {
    fn new(transition: Transition) -> Self {
        Self {
            start: transition.position,
            length: transition.length,
            total: u64::from(transition.count) * u64::from(transition.length),
            max: transition.count,
        }
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.length)
    }

    fn extend(&mut self, transition: Transition) {
        self.length = self.length.saturating_add(transition.length);
        self.total += u64::from(transition.count) * u64::from(transition.length);
        self.max = self.max.max(transition.count);
    }
}

/// Iterator over the peaks of a source.
///
/// # Examples
/// ```
/// use covcomp::counts::TransitionList;
/// use covcomp::views::PeakAggregator;
///
/// let source = TransitionList::from_runs(&[(10, 0), (2, 5), (3, 8), (10, 1)]);
/// let peaks: Vec<_> = PeakAggregator::new(source, 1)
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(peaks.len(), 1);
/// assert_eq!((peaks[0].start, peaks[0].length, peaks[0].max), (10, 5, 8));
/// ```
#[derive(Debug)]
pub struct PeakAggregator<S> {
    source: S,
    threshold: u32,
    lookahead: Option<Transition>,
    done: bool,
}

impl<S: CountsSource> PeakAggregator<S> {
    /// Creates the aggregator; transitions with a count greater than
    /// `threshold` are part of peaks.
    pub fn new(source: S, threshold: u32) -> Self {
        Self {
            source,
            threshold,
            lookahead: None,
            done: false,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn next_peak(&mut self) -> CodecResult<Option<Peak>> {
        let mut peak = self.lookahead.take().map(Peak::new);

        while self.source.has_next_transition()? {
            self.source.next_transition()?;
            let transition = self.source.transition();

            if transition.count <= self.threshold {
                if peak.is_some() {
                    break;
                }
                continue;
            }
            match &mut peak {
                Some(current) if current.end() == u64::from(transition.position) => {
                    current.extend(transition)
                }
                Some(_) => {
                    self.lookahead = Some(transition);
                    break;
                }
                None => peak = Some(Peak::new(transition)),
            }
        }

        Ok(peak)
    }
}

impl<S: CountsSource> Iterator for PeakAggregator<S> {
    type Item = CodecResult<Peak>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_peak() {
            Ok(Some(peak)) => Some(Ok(peak)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::counts::{Transition, TransitionList};
    use crate::error::CodecResult;
    use crate::views::{Peak, PeakAggregator};

    fn peaks(source: TransitionList, threshold: u32) -> Vec<Peak> {
        PeakAggregator::new(source, threshold)
            .collect::<CodecResult<_>>()
            .unwrap()
    }

    #[test]
    fn test_peaks() {
        let source = TransitionList::from_runs(&[(5, 0), (2, 3), (3, 9), (4, 1), (2, 4), (1, 0)]);

        assert_eq!(
            peaks(source.clone(), 1),
            vec![
                Peak {
                    start: 5,
                    length: 5,
                    total: 33,
                    max: 9
                },
                Peak {
                    start: 14,
                    length: 2,
                    total: 8,
                    max: 4
                },
            ]
        );
        assert_eq!(peaks(source.clone(), 0).len(), 1);
        assert_eq!(peaks(source.clone(), 0)[0].length, 11);
        assert!(peaks(source, 9).is_empty());
    }

    #[test]
    fn test_peaks_across_gap() {
        let source = TransitionList::new(vec![
            Transition::new(0, 2, 5),
            Transition::new(4, 2, 5),
        ]);

        let peaks = peaks(source, 0);
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[1].start, peaks[1].length), (4, 2));
    }

    #[test]
    fn test_peak_at_end() {
        let source = TransitionList::from_runs(&[(3, 0), (3, 2)]);

        assert_eq!(
            peaks(source, 1),
            vec![Peak {
                start: 3,
                length: 3,
                total: 6,
                max: 2
            }]
        );
    }
}
