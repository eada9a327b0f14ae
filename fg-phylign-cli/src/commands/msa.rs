use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use log::info;
use phylign::{
    align::aligners::constants::DEFAULT_GAP_PENALTY,
    msa::ProgressiveAlignerBuilder,
    util::{
        io::{new_output, read_fasta, write_fasta},
        version::built_info,
    },
};

use super::{
    command::Command,
    common::{distances_for, AlignerOptions, MatrixOptions},
};

/// Progressively aligns the sequences in a FASTA file into a multiple sequence alignment.
///
/// A Neighbor-Joining guide tree is built from `--distances`, or from the pairwise alignment
/// scores of the sequences if not given.  Alignments are then merged from the leaves of the tree
/// up, scoring aligned columns with the profile sum-of-pairs score and each inserted column of
/// gaps with `--profile-gap`.  The aligned sequences are written in the input order.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width = 0)]
pub struct Msa {
    /// The path to the input FASTA.
    #[clap(long, short = 'i', display_order = 1)]
    input: PathBuf,

    /// The path to a matrix of pairwise distances between the input sequences.
    #[clap(long, short = 'd', display_order = 2)]
    distances: Option<PathBuf>,

    /// The path to the output FASTA, otherwise standard output.
    #[clap(long, short = 'o', display_order = 3)]
    output: Option<PathBuf>,

    /// The score for each column of gaps inserted when merging two alignments.
    #[clap(
        long,
        short = 'p',
        default_value_t = DEFAULT_GAP_PENALTY,
        allow_hyphen_values = true,
        display_order = 4
    )]
    profile_gap: i32,

    #[clap(flatten)]
    matrix: MatrixOptions,

    #[clap(flatten)]
    aligner: AlignerOptions,
}

impl Command for Msa {
    fn execute(&self) -> Result<()> {
        let matrix = self.matrix.load()?;
        info!("Reading sequences from {}", self.input.display());
        let sequences = read_fasta(&self.input)?;
        let distances =
            distances_for(self.distances.as_ref(), &self.aligner, &matrix, &sequences)?;

        let aligner = ProgressiveAlignerBuilder::default().gap_penalty(self.profile_gap).build()?;
        info!("Aligning {} sequences", sequences.len());
        let alignment = aligner.align_sequences(&distances, &sequences, &matrix)?;
        info!("Aligned {} sequences into {} columns", alignment.size(), alignment.num_columns());

        let mut writer = new_output(self.output.as_ref())?;
        write_fasta(&mut writer, alignment.sequences())?;
        writer.flush()?;
        Ok(())
    }
}
