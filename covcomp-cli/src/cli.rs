use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use covcomp::counts::DEFAULT_INDEX_STRIDE;

use crate::opts::{input_file, stream_path, InputFile, StreamPath};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Don't display a progress bar/spinner
    #[clap(long, global = true, value_parser)]
    pub no_progress: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress a TSV file of `reference<TAB>position<TAB>count` lines into
    /// a counts archive
    ///
    /// Positions are 0-based and must be increasing within a reference; the
    /// lines of a reference must not be interleaved with other references.
    Compress {
        /// Input TSV file to read; `-` is the standard input
        #[clap(default_value_t, value_parser = stream_path)]
        input: StreamPath,

        /// Output archive path; `-` is the standard output. Defaults to the
        /// input path with the `cov` extension
        #[clap(short, long, value_parser = stream_path)]
        output: Option<StreamPath>,

        /// Distance between the positions of the random access index entries;
        /// 0 disables the index
        #[clap(default_value_t = DEFAULT_INDEX_STRIDE, long, value_parser)]
        index_stride: u32,
    },

    /// Print the transitions stored in an archive as TSV
    Dump {
        /// Input archive path
        #[clap(value_parser = input_file)]
        input: InputFile,

        /// Output file path
        #[clap(short, long, default_value = "-", value_parser = stream_path)]
        output: StreamPath,

        /// Only dump the sequence with given identifier
        #[clap(short, long, value_parser)]
        sequence: Option<String>,
    },

    /// Print statistics about an archive and the sequences it contains
    Stats {
        /// Input archive path
        #[clap(value_parser = input_file)]
        input: InputFile,

        /// Output per-sequence statistics as a CSV file to the standard output
        #[clap(long, value_parser, conflicts_with = "json")]
        csv: bool,

        /// Output all the statistics as JSON to the standard output
        #[clap(long, value_parser)]
        json: bool,
    },

    /// Find the stretches with counts above a threshold, as BED-like TSV
    Peaks {
        /// Input archive path
        #[clap(value_parser = input_file)]
        input: InputFile,

        /// Output file path
        #[clap(short, long, default_value = "-", value_parser = stream_path)]
        output: StreamPath,

        /// Positions with a count greater than this belong to peaks
        #[clap(short, long, default_value_t = 0, value_parser)]
        threshold: u32,

        /// Only search the sequence with given identifier
        #[clap(short, long, value_parser)]
        sequence: Option<String>,
    },

    /// Convert an archive to a variableStep wiggle track
    Wiggle {
        /// Input archive path
        #[clap(value_parser = input_file)]
        input: InputFile,

        /// Output file path
        #[clap(short, long, default_value = "-", value_parser = stream_path)]
        output: StreamPath,

        /// Wiggle window size
        #[clap(short, long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
        window: u32,

        /// Average the counts over bins with this many covered positions
        /// before windowing
        #[clap(long, value_parser = clap::value_parser!(u32).range(1..))]
        bin: Option<u32>,

        /// Track name; defaults to the archive file name
        #[clap(long, value_parser)]
        name: Option<String>,
    },
}
