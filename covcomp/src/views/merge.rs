use crate::counts::{CountsSource, Transition};
use crate::error::{CodecError, CodecResult};

/// A stretch of positions over which none of the merged sources changes its
/// count.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MergedTransition {
    pub position: u32,
    pub length: u32,
    /// Count of every source, in the order the sources were given. Sources
    /// with no transition covering the stretch count as zero.
    pub counts: Vec<u32>,
}

impl MergedTransition {
    /// Position right after the stretch.
    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.position) + u64::from(self.length)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts
            .iter()
            .fold(0u32, |total, &count| total.saturating_add(count))
    }
}

/// Merges several sources position-wise, producing a transition wherever
/// any of the sources has one.
#[derive(Debug)]
pub struct AnyTransitionIterator<S> {
    sources: Vec<S>,
    heads: Vec<Option<Transition>>,
    exhausted: Vec<bool>,
    cursor: u64,
    current: MergedTransition,
    pending: Option<MergedTransition>,
}

impl<S: CountsSource> AnyTransitionIterator<S> {
    #[must_use]
    pub fn new(sources: Vec<S>) -> Self {
        let source_num = sources.len();
        Self {
            sources,
            heads: vec![None; source_num],
            exhausted: vec![false; source_num],
            cursor: 0,
            current: MergedTransition {
                counts: vec![0; source_num],
                ..MergedTransition::default()
            },
            pending: None,
        }
    }

    #[must_use]
    pub fn source_num(&self) -> usize {
        self.sources.len()
    }

    /// Count of the source at `source_index` over the current transition.
    #[must_use]
    pub fn count_of(&self, source_index: usize) -> u32 {
        self.current.counts[source_index]
    }

    #[must_use]
    pub fn current(&self) -> &MergedTransition {
        &self.current
    }

    pub fn into_sources(self) -> Vec<S> {
        self.sources
    }

    /// Makes the head of a source the first of its transitions ending after
    /// the cursor.
    fn advance_source(&mut self, index: usize) -> CodecResult<()> {
        let cursor = self.cursor;
        while self.heads[index].map_or(!self.exhausted[index], |head| {
            u64::from(head.position) + u64::from(head.length) <= cursor
        }) {
            let source = &mut self.sources[index];
            if source.has_next_transition()? {
                source.next_transition()?;
                self.heads[index] = Some(source.transition());
            } else {
                self.exhausted[index] = true;
                self.heads[index] = None;
            }
        }
        Ok(())
    }

    fn load_next(&mut self) -> CodecResult<Option<MergedTransition>> {
        for index in 0..self.sources.len() {
            self.advance_source(index)?;
        }

        let cursor = self.cursor;
        let start = match self
            .heads
            .iter()
            .flatten()
            .map(|head| u64::from(head.position).max(cursor))
            .min()
        {
            Some(start) => start,
            None => return Ok(None),
        };

        let mut end = u64::MAX;
        let mut counts = Vec::with_capacity(self.heads.len());
        for head in &self.heads {
            let count = match head {
                Some(head) if u64::from(head.position) <= start => {
                    end = end.min(u64::from(head.position) + u64::from(head.length));
                    head.count
                }
                Some(head) => {
                    end = end.min(u64::from(head.position));
                    0
                }
                None => 0,
            };
            counts.push(count);
        }

        self.cursor = end;
        Ok(Some(MergedTransition {
            position: start as u32,
            length: (end - start) as u32,
            counts,
        }))
    }
}

impl<S: CountsSource> CountsSource for AnyTransitionIterator<S> {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        if self.pending.is_none() {
            self.pending = self.load_next()?;
        }
        Ok(self.pending.is_some())
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        if !self.has_next_transition()? {
            return Err(CodecError::InvalidState);
        }
        if let Some(pending) = self.pending.take() {
            self.current = pending;
        }
        Ok(())
    }

    fn position(&self) -> u32 {
        self.current.position
    }

    fn length(&self) -> u32 {
        self.current.length
    }

    /// Sum of the counts of all the sources.
    fn count(&self) -> u32 {
        self.current.total()
    }
}

/// [`AnyTransitionIterator`] that also merges adjacent transitions in which
/// every source has the same count, so that each transition marks a change
/// of at least one source.
#[derive(Debug)]
pub struct UnionIterator<S> {
    inner: AnyTransitionIterator<S>,
    lookahead: Option<MergedTransition>,
    current: MergedTransition,
    pending: Option<MergedTransition>,
}

impl<S: CountsSource> UnionIterator<S> {
    #[must_use]
    pub fn new(sources: Vec<S>) -> Self {
        let inner = AnyTransitionIterator::new(sources);
        let current = inner.current().clone();
        Self {
            inner,
            lookahead: None,
            current,
            pending: None,
        }
    }

    #[must_use]
    pub fn source_num(&self) -> usize {
        self.inner.source_num()
    }

    #[must_use]
    pub fn count_of(&self, source_index: usize) -> u32 {
        self.current.counts[source_index]
    }

    #[must_use]
    pub fn current(&self) -> &MergedTransition {
        &self.current
    }

    fn next_inner(&mut self) -> CodecResult<Option<MergedTransition>> {
        if let Some(transition) = self.lookahead.take() {
            return Ok(Some(transition));
        }
        if !self.inner.has_next_transition()? {
            return Ok(None);
        }
        self.inner.next_transition()?;
        Ok(Some(self.inner.current().clone()))
    }

    fn load_next(&mut self) -> CodecResult<Option<MergedTransition>> {
        let mut merged = match self.next_inner()? {
            Some(transition) => transition,
            None => return Ok(None),
        };

        while let Some(next) = self.next_inner()? {
            if u64::from(next.position) != merged.end() || next.counts != merged.counts {
                self.lookahead = Some(next);
                break;
            }
            merged.length = merged.length.saturating_add(next.length);
        }
        Ok(Some(merged))
    }
}

impl<S: CountsSource> CountsSource for UnionIterator<S> {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        if self.pending.is_none() {
            self.pending = self.load_next()?;
        }
        Ok(self.pending.is_some())
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        if !self.has_next_transition()? {
            return Err(CodecError::InvalidState);
        }
        if let Some(pending) = self.pending.take() {
            self.current = pending;
        }
        Ok(())
    }

    fn position(&self) -> u32 {
        self.current.position
    }

    fn length(&self) -> u32 {
        self.current.length
    }

    fn count(&self) -> u32 {
        self.current.total()
    }
}

#[cfg(test)]
mod tests {
    use crate::counts::{CountsSource, Transition, TransitionList};
    use crate::views::{AnyTransitionIterator, MergedTransition, UnionIterator};

    fn collect<S: CountsSource>(
        source: &mut S,
        current: impl Fn(&S) -> MergedTransition,
    ) -> Vec<MergedTransition> {
        let mut result = Vec::new();
        while source.has_next_transition().unwrap() {
            source.next_transition().unwrap();
            result.push(current(source));
        }
        result
    }

    fn merged(position: u32, length: u32, counts: &[u32]) -> MergedTransition {
        MergedTransition {
            position,
            length,
            counts: counts.to_vec(),
        }
    }

    #[test]
    fn test_any_transition() {
        let first = TransitionList::from_runs(&[(5, 0), (5, 3), (10, 0)]);
        let second = TransitionList::from_runs(&[(7, 1), (3, 2)]);
        let mut iterator = AnyTransitionIterator::new(vec![first, second]);

        assert_eq!(
            collect(&mut iterator, |it| it.current().clone()),
            vec![
                merged(0, 5, &[0, 1]),
                merged(5, 2, &[3, 1]),
                merged(7, 3, &[3, 2]),
                merged(10, 10, &[0, 0]),
            ]
        );
        assert_eq!(iterator.count(), 0);
        assert_eq!(iterator.count_of(1), 0);
    }

    #[test]
    fn test_any_transition_count_is_sum() {
        let first = TransitionList::from_runs(&[(4, 2)]);
        let second = TransitionList::from_runs(&[(2, 5), (2, 1)]);
        let mut iterator = AnyTransitionIterator::new(vec![first, second]);

        iterator.next_transition().unwrap();
        assert_eq!(iterator.transition(), Transition::new(0, 2, 7));
        iterator.next_transition().unwrap();
        assert_eq!(iterator.transition(), Transition::new(2, 2, 3));
        assert!(!iterator.has_next_transition().unwrap());
    }

    #[test]
    fn test_any_transition_gap() {
        let first = TransitionList::new(vec![
            Transition::new(0, 2, 1),
            Transition::new(10, 2, 4),
        ]);
        let mut iterator = AnyTransitionIterator::new(vec![first]);

        assert_eq!(
            collect(&mut iterator, |it| it.current().clone()),
            vec![merged(0, 2, &[1]), merged(10, 2, &[4])]
        );
    }

    #[test]
    fn test_any_transition_no_sources() {
        let mut iterator = AnyTransitionIterator::<TransitionList>::new(Vec::new());

        assert!(!iterator.has_next_transition().unwrap());
    }

    #[test]
    fn test_union_coalesces_identical_counts() {
        // the second source ends at 10, the first one has an explicit zero run
        let first = TransitionList::from_runs(&[(6, 2), (4, 0), (6, 0)]);
        let second = TransitionList::from_runs(&[(3, 0), (7, 0)]);
        let mut any = AnyTransitionIterator::new(vec![first.clone(), second.clone()]);
        let mut union = UnionIterator::new(vec![first, second]);

        assert_eq!(collect(&mut any, |it| it.current().clone()).len(), 4);
        assert_eq!(
            collect(&mut union, |it| it.current().clone()),
            vec![merged(0, 6, &[2, 0]), merged(6, 10, &[0, 0])]
        );
    }
}
