use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::{
    builder::{PossibleValuesParser, TypedValueParser as _},
    Args,
};
use log::info;
use phylign::{
    align::{
        aligners::{
            constants::{DEFAULT_EXTEND_GAP_PENALTY, DEFAULT_GAP_PENALTY, DEFAULT_OPEN_GAP_PENALTY},
            AffineAligner, AlignmentMode, LinearAligner, PairwiseAligner,
        },
        scoring::SubstitutionMatrix,
        sequence::Sequence,
    },
    tree::{distance::pairwise_scores_with_progress, DistanceMatrix, ScoreMatrix},
};
use proglog::{CountFormatterKind, ProgLogBuilder};

use super::command::ValueEnum;

/// Parses a gap character, which must be a single printable ASCII character.
fn parse_gap_character(value: &str) -> Result<u8, String> {
    match value.as_bytes() {
        [c] if c.is_ascii_graphic() => Ok(*c),
        _ => Err(format!("expected a single printable character, found '{value}'")),
    }
}

/// Options for the substitution matrix used to score aligned symbols.
#[derive(Args, Debug, Clone)]
pub struct MatrixOptions {
    /// The path to a substitution matrix file.  The built-in BLOSUM62 matrix is used if not given.
    #[clap(long, short = 'M')]
    pub matrix: Option<PathBuf>,

    /// The character used for gaps in the aligned sequences.
    #[clap(long, default_value = "-", value_parser = parse_gap_character)]
    pub gap_char: u8,
}

impl MatrixOptions {
    pub fn load(&self) -> Result<SubstitutionMatrix> {
        let matrix = match &self.matrix {
            Some(path) => {
                info!("Reading substitution matrix from {}", path.display());
                SubstitutionMatrix::load(path)?
            }
            None => SubstitutionMatrix::blosum62(),
        };
        Ok(matrix.with_gap_character(self.gap_char))
    }
}

/// Options for the pairwise aligner.
#[derive(Args, Debug, Clone)]
pub struct AlignerOptions {
    /// The alignment mode:
    /// - Global: aligns the full first sequence versus the full second sequence.
    /// - Local: aligns a sub-sequence of the first versus a sub-sequence of the second.
    #[clap(
        long,
        short = 'm',
        value_parser = PossibleValuesParser::new(AlignmentMode::possible_values())
            .map(|s| s.parse::<AlignmentMode>().unwrap()),
        default_value_t = AlignmentMode::Global,
        ignore_case = true,
        verbatim_doc_comment
    )]
    pub mode: AlignmentMode,

    /// The score for each gap position when using linear gap penalties.
    #[clap(long, short = 'g', default_value_t = DEFAULT_GAP_PENALTY, allow_hyphen_values = true)]
    pub gap: i32,

    /// Use affine gap penalties (`--open` and `--extend`) instead of `--gap`.  Global mode only.
    #[clap(long, short = 'a', default_value = "false")]
    pub affine: bool,

    /// The score for the first position of a gap when using affine gap penalties.
    #[clap(long, short = 'O', default_value_t = DEFAULT_OPEN_GAP_PENALTY, allow_hyphen_values = true)]
    pub open: i32,

    /// The score for each further position of a gap when using affine gap penalties.
    #[clap(long, short = 'E', default_value_t = DEFAULT_EXTEND_GAP_PENALTY, allow_hyphen_values = true)]
    pub extend: i32,
}

impl AlignerOptions {
    pub fn aligner(&self) -> Result<Box<dyn PairwiseAligner>> {
        if self.affine {
            ensure!(
                self.mode.is_global(),
                "Affine gap penalties may only be used with global alignment, found mode: {}",
                self.mode
            );
            Ok(Box::new(AffineAligner::new(self.open, self.extend)))
        } else {
            Ok(Box::new(LinearAligner::new(self.gap)))
        }
    }

    /// Aligns every pair of sequences, logging progress.
    pub fn scores(
        &self,
        matrix: &SubstitutionMatrix,
        sequences: &[Sequence],
    ) -> Result<ScoreMatrix> {
        let aligner = self.aligner()?;
        let num_pairs = sequences.len() * (sequences.len() + 1) / 2;
        info!("Aligning {} pairs of sequences", num_pairs);
        let progress_logger = ProgLogBuilder::new()
            .name("phylign-progress")
            .noun("pairs")
            .verb("Aligned")
            .unit(1_000)
            .count_formatter(CountFormatterKind::Comma)
            .build();
        pairwise_scores_with_progress(aligner.as_ref(), self.mode, matrix, sequences, |_, _| {
            progress_logger.record();
        })
    }
}

/// Reads the distance matrix at `path` if given, otherwise computes distances from the pairwise
/// alignment scores of the sequences.  Names in a distance matrix file must match the sequence
/// names.
pub fn distances_for(
    path: Option<&PathBuf>,
    aligner: &AlignerOptions,
    matrix: &SubstitutionMatrix,
    sequences: &[Sequence],
) -> Result<DistanceMatrix> {
    match path {
        Some(path) => {
            info!("Reading distances from {}", path.display());
            let (distances, names) = DistanceMatrix::load(path)?;
            ensure!(
                distances.size() == sequences.len(),
                "Distance matrix has {} rows but {} sequences were given",
                distances.size(),
                sequences.len()
            );
            if let Some(names) = names {
                let expected = sequences.iter().map(|s| s.name().as_str());
                ensure!(
                    names.iter().map(String::as_str).eq(expected),
                    "Distance matrix names do not match the sequence names"
                );
            }
            Ok(distances)
        }
        None => aligner.scores(matrix, sequences)?.to_distances(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_gap_character, AlignerOptions};
    use phylign::align::aligners::AlignmentMode;

    #[test]
    fn test_parse_gap_character() {
        assert_eq!(parse_gap_character("-"), Ok(b'-'));
        assert_eq!(parse_gap_character("."), Ok(b'.'));
        assert!(parse_gap_character("").is_err());
        assert!(parse_gap_character("--").is_err());
        assert!(parse_gap_character(" ").is_err());
    }

    #[test]
    fn test_affine_requires_global_mode() {
        let options = AlignerOptions {
            mode: AlignmentMode::Local,
            gap: -1,
            affine: true,
            open: -4,
            extend: -1,
        };
        assert!(options.aligner().is_err());
        let options = AlignerOptions { affine: false, ..options };
        assert!(options.aligner().is_ok());
    }
}
