use std::io::{BufRead, BufReader, Read, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use covcomp::archive::{CountsArchiveWriter, CountsArchiveWriterParams};
use covcomp::counts::CountsAccumulator;
use covcomp::progress::ProgressNotifier;
use itertools::Itertools;
use log::debug;

/// Parses a `reference<TAB>position<TAB>count` line.
fn parse_line(line: &str) -> anyhow::Result<(&str, u32, i64)> {
    let (reference, position, count) = line
        .split('\t')
        .collect_tuple()
        .ok_or_else(|| anyhow!("Expected 3 tab-separated columns"))?;

    let position = position
        .trim()
        .parse()
        .with_context(|| format!("Invalid position: {}", position))?;
    let count = count
        .trim()
        .parse()
        .with_context(|| format!("Invalid count: {}", count))?;
    Ok((reference, position, count))
}

pub fn compress<R: Read, W: Write>(
    reader: R,
    writer: W,
    index_stride: u32,
    progress_notifier: Arc<dyn ProgressNotifier>,
) -> anyhow::Result<()> {
    let params = CountsArchiveWriterParams::builder()
        .index_stride(index_stride)
        .progress_notifier(progress_notifier)
        .build();
    let mut archive = CountsArchiveWriter::with_params(writer, params)?;

    let mut current: Option<(String, CountsAccumulator)> = None;
    let mut next_index = 0;
    for (line_num, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Could not read the input file")?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (reference, position, count) =
            parse_line(&line).with_context(|| format!("Invalid line {}", line_num + 1))?;

        if current.as_ref().map(|(name, _)| name.as_str()) != Some(reference) {
            if let Some((name, accumulator)) = current.take() {
                debug!("Finished reference {}", name);
                archive.return_writer(accumulator.close()?)?;
            }
            let writer = archive
                .new_count_writer(next_index, reference)
                .with_context(|| format!("Could not start reference {}", reference))?;
            next_index += 1;
            current = Some((reference.to_owned(), CountsAccumulator::new(writer)));
        }

        if let Some((_, accumulator)) = current.as_mut() {
            accumulator
                .append(count, position)
                .with_context(|| format!("Invalid line {}", line_num + 1))?;
        }
    }
    if let Some((_, accumulator)) = current {
        archive.return_writer(accumulator.close()?)?;
    }

    archive.finish()?;

    Ok(())
}
