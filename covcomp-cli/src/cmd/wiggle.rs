use std::io::Write;
use std::path::Path;

use anyhow::Context;
use covcomp::archive::CountsArchiveReader;
use covcomp::counts::CountsSource;
use covcomp::views::{CountBinningAdapter, WiggleWriter};

use crate::PROGRESS_BAR;

pub fn wiggle<W: Write>(
    input: &Path,
    writer: W,
    window: u32,
    bin: Option<u32>,
    name: &str,
) -> anyhow::Result<()> {
    let mut archive = CountsArchiveReader::open(input)?;
    PROGRESS_BAR.set_sequence_num(archive.len() as u64);

    let mut wiggle = WiggleWriter::new(writer, window)?;
    wiggle.write_track_header(name)?;
    for index in archive.indices() {
        let identifier = archive.identifier(index).unwrap_or_default().to_owned();
        let reader = archive
            .count_reader_by_index(index)
            .with_context(|| format!("Could not read sequence {}", identifier))?;

        wiggle.start_sequence(&identifier)?;
        let mut source: Box<dyn CountsSource> = match bin {
            Some(bin) => Box::new(CountBinningAdapter::new(reader, bin)?),
            None => Box::new(reader),
        };
        wiggle
            .add_source(&mut source)
            .with_context(|| format!("Could not decode sequence {}", identifier))?;
        PROGRESS_BAR.inc_sequences();
    }
    wiggle.finish()?;

    Ok(())
}
