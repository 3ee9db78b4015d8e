use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use covcomp::archive::CountsArchiveReader;
use covcomp::views::{Peak, PeakAggregator};
use log::info;
use rayon::prelude::*;

use crate::cmd::selected_indices;
use crate::PROGRESS_BAR;

/// Writes `identifier<TAB>start<TAB>end<TAB>max<TAB>total` for every peak,
/// with 0-based starts and exclusive ends.
pub fn peaks<W: Write>(
    input: &Path,
    writer: W,
    threshold: u32,
    sequence: Option<&str>,
) -> anyhow::Result<()> {
    let mut archive = CountsArchiveReader::open(input)?;
    let indices = selected_indices(&archive, sequence)?;
    PROGRESS_BAR.set_sequence_num(indices.len() as u64);

    let mut readers = Vec::with_capacity(indices.len());
    for index in indices {
        let identifier = archive.identifier(index).unwrap_or_default().to_owned();
        let reader = archive
            .count_reader_by_index(index)
            .with_context(|| format!("Could not read sequence {}", identifier))?;
        readers.push((identifier, reader));
    }

    let sequence_peaks: Vec<(String, Vec<Peak>)> = readers
        .into_par_iter()
        .map(|(identifier, reader)| {
            let peaks = PeakAggregator::new(reader, threshold).collect::<Result<Vec<_>, _>>();
            PROGRESS_BAR.inc_sequences();
            peaks
                .map(|peaks| (identifier.clone(), peaks))
                .with_context(|| format!("Could not decode sequence {}", identifier))
        })
        .collect::<anyhow::Result<_>>()?;

    let mut writer = BufWriter::new(writer);
    let mut peak_num = 0;
    for (identifier, peaks) in &sequence_peaks {
        for peak in peaks {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                identifier,
                peak.start,
                peak.end(),
                peak.max,
                peak.total
            )?;
        }
        peak_num += peaks.len();
    }
    writer.flush()?;

    info!(
        "Found {} peaks above {} in {} sequences",
        peak_num,
        threshold,
        sequence_peaks.len()
    );
    Ok(())
}
