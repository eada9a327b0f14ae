use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use log::info;
use phylign::util::{
    io::{new_output, read_fasta},
    version::built_info,
};

use super::{
    command::Command,
    common::{AlignerOptions, MatrixOptions},
};

/// Aligns every pair of sequences in a FASTA file and writes the matrix of alignment scores.
///
/// The output is tab-separated: a header line of sequence names, then one line per sequence
/// starting with its name.  With `--distances` the scores are converted to distances with
/// `d(i,j) = (s(i,i) + s(j,j)) / 2 - s(i,j)`, suitable as input to the `tree` and `msa` commands.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width = 0)]
pub struct Scores {
    /// The path to the input FASTA.
    #[clap(long, short = 'i', display_order = 1)]
    input: PathBuf,

    /// The path to the output file, otherwise standard output.
    #[clap(long, short = 'o', display_order = 2)]
    output: Option<PathBuf>,

    /// Write distances instead of scores.
    #[clap(long, short = 'D', default_value = "false", display_order = 3)]
    distances: bool,

    #[clap(flatten)]
    matrix: MatrixOptions,

    #[clap(flatten)]
    aligner: AlignerOptions,
}

impl Command for Scores {
    fn execute(&self) -> Result<()> {
        let matrix = self.matrix.load()?;
        info!("Reading sequences from {}", self.input.display());
        let sequences = read_fasta(&self.input)?;
        let scores = self.aligner.scores(&matrix, &sequences)?;

        let mut writer = new_output(self.output.as_ref())?;
        if self.distances {
            scores.to_distances()?.write_tsv(&mut writer, scores.names())?;
        } else {
            scores.write_tsv(&mut writer)?;
        }
        writer.flush()?;
        let kind = if self.distances { "distances" } else { "scores" };
        info!("Wrote {} for {} sequences", kind, sequences.len());
        Ok(())
    }
}
