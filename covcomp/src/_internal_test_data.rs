use itertools::Itertools;
use lazy_static::lazy_static;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::counts::{CountsWriter, CountsWriterParams, EncodedCounts};

/// Generates `(length, count)` runs resembling sequencing coverage: long
/// zero stretches, short low-coverage islands and occasional spikes.
///
/// Adjacent runs never share a count.
pub fn random_coverage_runs(seed: u64, run_num: usize) -> Vec<(u32, u32)> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    (0..run_num)
        .map(|_| {
            let length = if rng.gen_bool(0.8) {
                rng.gen_range(1..50)
            } else {
                rng.gen_range(50..5_000)
            };
            let count = match rng.gen_range(0..10) {
                0..=2 => 0,
                3..=8 => rng.gen_range(1..40),
                _ => rng.gen_range(40..10_000),
            };
            (length, count)
        })
        .coalesce(|previous, current| {
            if previous.1 == current.1 {
                Ok((previous.0 + current.0, previous.1))
            } else {
                Err((previous, current))
            }
        })
        .collect()
}

/// Symbols from a skewed distribution over `symbol_num` symbols.
pub fn random_symbols(seed: u64, symbol_num: usize, len: usize) -> Vec<usize> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    (0..len)
        .map(|_| {
            if rng.gen_bool(0.75) {
                rng.gen_range(0..symbol_num.min(4))
            } else {
                rng.gen_range(0..symbol_num)
            }
        })
        .collect()
}

/// Encodes `runs` from position 0 with an initial count of 0.
pub fn encode_runs(runs: &[(u32, u32)], index_stride: u32) -> EncodedCounts {
    let params = CountsWriterParams::builder()
        .index_stride(index_stride)
        .build();
    let mut writer = CountsWriter::with_params(params).unwrap();
    for &(length, count) in runs {
        writer.append_count(count, length).unwrap();
    }
    writer.finish().unwrap()
}

/// Total length of `runs`.
pub fn runs_length(runs: &[(u32, u32)]) -> u64 {
    runs.iter().map(|&(length, _)| u64::from(length)).sum()
}

lazy_static! {
    pub static ref COVERAGE_RUNS: Vec<(u32, u32)> = random_coverage_runs(1337, 20_000);
    pub static ref SMALL_COVERAGE_RUNS: Vec<(u32, u32)> = random_coverage_runs(42, 300);
    pub static ref SKEWED_SYMBOLS: Vec<usize> = random_symbols(1337, 256, 100_000);
}
