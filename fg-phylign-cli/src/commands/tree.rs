use std::{io::Write, path::PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use phylign::{
    tree::{construct_newick, DistanceMatrix},
    util::{
        io::{new_output, read_fasta},
        version::built_info,
    },
};

use super::{
    command::Command,
    common::{distances_for, AlignerOptions, MatrixOptions},
};

/// Builds a Neighbor-Joining tree and writes it in Newick format.
///
/// Distances are read from `--distances`, a whitespace separated matrix optionally with a header
/// line of names and/or rows prefixed by names.  Otherwise they are computed from the pairwise
/// alignment scores of the sequences in `--input`.  Taxa are named by the distance matrix, then
/// by the input sequences, and otherwise by their 1-based position.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width = 0)]
pub struct Tree {
    /// The path to the input FASTA.
    #[clap(long, short = 'i', required_unless_present = "distances", display_order = 1)]
    input: Option<PathBuf>,

    /// The path to a matrix of pairwise distances.
    #[clap(long, short = 'd', display_order = 2)]
    distances: Option<PathBuf>,

    /// The path to the output file, otherwise standard output.
    #[clap(long, short = 'o', display_order = 3)]
    output: Option<PathBuf>,

    #[clap(flatten)]
    matrix: MatrixOptions,

    #[clap(flatten)]
    aligner: AlignerOptions,
}

impl Tree {
    /// The distances between taxa, along with their names.
    fn distances_and_names(&self) -> Result<(DistanceMatrix, Vec<String>)> {
        match (&self.input, &self.distances) {
            (Some(input), distances) => {
                info!("Reading sequences from {}", input.display());
                let sequences = read_fasta(input)?;
                let matrix = self.matrix.load()?;
                let distances =
                    distances_for(distances.as_ref(), &self.aligner, &matrix, &sequences)?;
                Ok((distances, sequences.iter().map(|s| s.name().clone()).collect()))
            }
            (None, Some(path)) => {
                info!("Reading distances from {}", path.display());
                let (distances, names) = DistanceMatrix::load(path)?;
                let names = names
                    .unwrap_or_else(|| (1..=distances.size()).map(|i| i.to_string()).collect());
                Ok((distances, names))
            }
            (None, None) => bail!("Either --input or --distances must be given"),
        }
    }
}

impl Command for Tree {
    fn execute(&self) -> Result<()> {
        let (distances, names) = self.distances_and_names()?;
        info!("Building a Neighbor-Joining tree over {} taxa", names.len());
        let newick = construct_newick(&distances, &names)?;
        let mut writer = new_output(self.output.as_ref())?;
        writeln!(writer, "{newick}")?;
        writer.flush()?;
        Ok(())
    }
}
