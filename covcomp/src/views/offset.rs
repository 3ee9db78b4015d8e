use crate::counts::CountsSource;
use crate::error::CodecResult;

/// Shifts the positions of a source by a constant, e.g. to lay out several
/// sequences one after another.
#[derive(Debug)]
pub struct OffsetAdapter<S> {
    source: S,
    offset: u32,
}

impl<S: CountsSource> OffsetAdapter<S> {
    pub fn new(source: S, offset: u32) -> Self {
        Self { source, offset }
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: CountsSource> CountsSource for OffsetAdapter<S> {
    fn has_next_transition(&mut self) -> CodecResult<bool> {
        self.source.has_next_transition()
    }

    fn next_transition(&mut self) -> CodecResult<()> {
        self.source.next_transition()
    }

    fn position(&self) -> u32 {
        self.source.position().saturating_add(self.offset)
    }

    fn length(&self) -> u32 {
        self.source.length()
    }

    fn count(&self) -> u32 {
        self.source.count()
    }

    fn skip_to(&mut self, position: u32) -> CodecResult<()> {
        self.source.skip_to(position.saturating_sub(self.offset))
    }
}
