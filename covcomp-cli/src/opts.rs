use std::fmt::Display;
use std::fs::File;
use std::io;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::bail;
use atty::Stream;
use log::info;

const STDIO_PATH: &str = "-";

/// Path of an archive; archives are read with random access, so they can't
/// come from the standard input.
#[derive(Debug, Clone)]
pub struct InputFile {
    path: PathBuf,
}

pub fn input_file(path: &str) -> Result<InputFile, String> {
    let path = PathBuf::from(path);
    if !path.is_file() {
        return Err(format!("{} is not a file", path.display()));
    }

    Ok(InputFile { path })
}

impl InputFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without the extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "coverage".to_owned())
    }
}

/// A file path, or `-` for the standard input or output.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum StreamPath {
    #[default]
    Stdio,
    File(PathBuf),
}

pub fn stream_path(path: &str) -> Result<StreamPath, String> {
    if path == STDIO_PATH {
        Ok(StreamPath::Stdio)
    } else {
        Ok(StreamPath::File(PathBuf::from(path)))
    }
}

impl Display for StreamPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamPath::Stdio => write!(f, "{}", STDIO_PATH),
            StreamPath::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl StreamPath {
    /// Same file with the extension replaced; the standard input maps to the
    /// standard output.
    #[must_use]
    pub fn with_extension(&self, extension: &str) -> Self {
        match self {
            StreamPath::Stdio => StreamPath::Stdio,
            StreamPath::File(path) => StreamPath::File(path.with_extension(extension)),
        }
    }

    pub fn open(&self) -> anyhow::Result<Box<dyn Read + Send>> {
        info!("Input file: {}", self);

        Ok(match self {
            StreamPath::Stdio => Box::new(io::stdin()),
            StreamPath::File(path) => Box::new(File::open(path)?),
        })
    }

    /// Opens the output; binary data is never written to a terminal.
    pub fn create(&self, binary: bool) -> anyhow::Result<Box<dyn Write + Send>> {
        info!("Output file: {}", self);

        Ok(match self {
            StreamPath::Stdio => {
                if binary && atty::is(Stream::Stdout) {
                    bail!("Cannot output binary file to stdout when running in terminal; please use -o option instead or pipe the standard output");
                }
                Box::new(io::stdout())
            }
            StreamPath::File(path) => Box::new(File::create(path)?),
        })
    }
}
