use std::{io::Write, path::PathBuf};

use anyhow::{ensure, Result};
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

/// Aligns the first two sequences of a FASTA file to each other.
///
/// The two aligned sequences are written in FASTA format, with the alignment score added to
/// each record header (e.g. `>name score=30`).  Linear gap penalties are used by default, or
/// affine gap penalties with `--affine`.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width = 0)]
pub struct Pairwise {
    /// The path to the input FASTA; the first two records are aligned.
    #[clap(long, short = 'i', display_order = 1)]
    input: PathBuf,

    /// The path to the output file, otherwise standard output.
    #[clap(long, short = 'o', display_order = 2)]
    output: Option<PathBuf>,

    #[clap(flatten)]
    matrix: MatrixOptions,

    #[clap(flatten)]
    aligner: AlignerOptions,
}

impl Command for Pairwise {
    fn execute(&self) -> Result<()> {
        let matrix = self.matrix.load()?;
        info!("Reading sequences from {}", self.input.display());
        let sequences = read_fasta(&self.input)?;
        ensure!(
            sequences.len() >= 2,
            "Expected at least two sequences in {}, found {}",
            self.input.display(),
            sequences.len()
        );
        if sequences.len() > 2 {
            info!("Aligning the first two of {} sequences", sequences.len());
        }

        let aligner = self.aligner.aligner()?;
        let alignment = aligner.sequence(self.aligner.mode, &matrix, &sequences[0], &sequences[1])?;
        info!("Aligned with score {} and cigar {}", alignment.score, alignment.cigar());

        let mut writer = new_output(self.output.as_ref())?;
        for sequence in alignment.alignment.sequences() {
            writeln!(writer, ">{} score={}", sequence.name(), alignment.score)?;
            writeln!(writer, "{sequence}")?;
        }
        writer.flush()?;
        Ok(())
    }
}
