//! Read-only views over [`CountsSource`]s: binning, merging several sources
//! position-wise, peak detection and wiggle track output.

use crate::counts::CountsSource;

mod binning;
mod merge;
mod offset;
mod peaks;
mod wiggle;

pub use binning::{CountAdaptiveBinningAdapter, CountBinningAdapter};
pub use merge::{AnyTransitionIterator, MergedTransition, UnionIterator};
pub use offset::OffsetAdapter;
pub use peaks::{Peak, PeakAggregator};
pub use wiggle::WiggleWriter;

/// A source whose transitions summarize several transitions of another
/// source. [`CountsSource::count`] is the average, rounded down.
pub trait BinnedSource: CountsSource {
    /// Average count of the current bin.
    fn average(&self) -> f64;

    /// Maximum count of the current bin.
    fn max(&self) -> u32;
}
