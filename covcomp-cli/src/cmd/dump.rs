use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use covcomp::archive::CountsArchiveReader;
use covcomp::counts::CountsSource;

use crate::cmd::selected_indices;
use crate::PROGRESS_BAR;

/// Writes `identifier<TAB>position<TAB>length<TAB>count` for every
/// transition of the selected sequences.
pub fn dump<W: Write>(input: &Path, writer: W, sequence: Option<&str>) -> anyhow::Result<()> {
    let mut archive = CountsArchiveReader::open(input)?;
    let indices = selected_indices(&archive, sequence)?;
    PROGRESS_BAR.set_sequence_num(indices.len() as u64);

    let mut writer = BufWriter::new(writer);
    for index in indices {
        let identifier = archive.identifier(index).unwrap_or_default().to_owned();
        let mut reader = archive
            .count_reader_by_index(index)
            .with_context(|| format!("Could not read sequence {}", identifier))?;

        for transition in reader.transitions() {
            let transition = transition?;
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                identifier, transition.position, transition.length, transition.count
            )?;
        }
        PROGRESS_BAR.inc_sequences();
    }
    writer.flush()?;

    Ok(())
}
