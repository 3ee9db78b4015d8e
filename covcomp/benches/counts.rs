use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use covcomp::_internal_test_data::{encode_runs, runs_length, COVERAGE_RUNS};
use covcomp::counts::{CountsReader, CountsSource, DEFAULT_INDEX_STRIDE};

fn encode_counts(c: &mut Criterion) {
    c.bench_function("Encode 20k coverage runs", |b| {
        b.iter(|| encode_runs(&COVERAGE_RUNS, DEFAULT_INDEX_STRIDE))
    });
}

fn decode_counts(c: &mut Criterion) {
    let encoded = encode_runs(&COVERAGE_RUNS, DEFAULT_INDEX_STRIDE);

    c.bench_function("Decode 20k coverage runs", |b| {
        b.iter_batched_ref(
            || CountsReader::new(encoded.data.clone()).unwrap(),
            |reader| {
                let transitions = reader.transitions().count();
                assert_eq!(transitions, COVERAGE_RUNS.len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn reposition_counts(c: &mut Criterion) {
    let encoded = encode_runs(&COVERAGE_RUNS, DEFAULT_INDEX_STRIDE);
    let length = runs_length(&COVERAGE_RUNS) as u32;

    c.bench_function("Reposition over 20k coverage runs", |b| {
        b.iter_batched_ref(
            || CountsReader::with_index(encoded.data.clone(), encoded.index.clone()).unwrap(),
            |reader| {
                for step in (0..16).rev() {
                    reader.reposition(length / 16 * step).unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, encode_counts, decode_counts, reposition_counts);
criterion_main!(benches);
