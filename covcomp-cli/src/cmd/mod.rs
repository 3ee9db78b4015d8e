use std::fs::File;
use std::io::BufReader;

use anyhow::anyhow;
use covcomp::archive::CountsArchiveReader;

pub mod compress;
pub mod dump;
pub mod peaks;
pub mod stats;
pub mod wiggle;

/// Indices of the sequences to process: the one named `sequence`, or all of
/// them.
pub(crate) fn selected_indices(
    archive: &CountsArchiveReader<BufReader<File>>,
    sequence: Option<&str>,
) -> anyhow::Result<Vec<u32>> {
    match sequence {
        Some(identifier) => {
            let index = archive
                .index_of(identifier)
                .ok_or_else(|| anyhow!("Sequence {} not found in the archive", identifier))?;
            Ok(vec![index])
        }
        None => Ok(archive.indices()),
    }
}
