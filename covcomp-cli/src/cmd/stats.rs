use std::path::Path;

use covcomp::archive::{CountsArchiveReader, SequenceSummary};
use serde_json::json;

use crate::csv_stat::CsvStatOutput;
use crate::PROGRESS_BAR;

pub(crate) fn stats(input: &Path, csv: bool, json: bool) -> anyhow::Result<()> {
    let mut archive = CountsArchiveReader::open(input)?;
    PROGRESS_BAR.set_sequence_num(archive.len() as u64);
    let summaries = archive.summaries()?;
    let stats = archive.stats().copied().unwrap_or_default();
    PROGRESS_BAR.finish();

    if json {
        let value = json!({
            "archive": stats,
            "averageCoverage": stats.average_coverage(),
            "sequences": summaries,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if csv {
        let mut output = CsvStatOutput::new();
        for summary in &summaries {
            output.add_summary(summary)?;
        }
        output.flush()?;
    } else {
        eprintln!("Archive:");
        eprintln!("  Sequences: {}", stats.number_of_sequences);
        eprintln!("  Transitions: {}", stats.total_transitions);
        eprintln!("  Bases seen: {}", stats.total_bases_seen);
        eprintln!("  Sites seen: {}", stats.total_sites_seen);
        eprintln!("  Average coverage: {:.4}", stats.average_coverage());
        eprintln!(
            "  Bits per transition: {:.4}",
            bits_per_transition(stats.total_bits_written, stats.total_transitions)
        );
        eprintln!();
        eprintln!("Sequences:");
        for summary in &summaries {
            print_summary(summary);
        }
    }

    Ok(())
}

fn bits_per_transition(bits: u64, transitions: u64) -> f64 {
    if transitions == 0 {
        0.0
    } else {
        bits as f64 / transitions as f64
    }
}

fn print_summary(summary: &SequenceSummary) {
    eprintln!(
        "  {} ({}): length {}, {} transitions, max count {}, {:.4} bits per transition",
        summary.identifier,
        summary.index,
        summary.length,
        summary.transitions,
        summary.max_count,
        bits_per_transition(summary.compressed_bytes * 8, summary.transitions),
    );
}
