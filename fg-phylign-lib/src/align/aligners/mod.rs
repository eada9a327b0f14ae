pub mod affine;
pub mod constants;
pub mod linear;

pub use affine::AffineAligner;
pub use constants::AlignmentMode;
pub use linear::LinearAligner;

use anyhow::Result;

use crate::align::{alignment::PairwiseAlignment, scoring::SubstitutionMatrix, sequence::Sequence};

use constants::AlignmentOperation;

/// Aligns two sequences against each other, scoring substitutions with a substitution matrix.
pub trait PairwiseAligner {
    /// Produces one optimal alignment of `x` (the first sequence) against `y` (the second), along
    /// with its score.
    fn sequence(
        &self,
        mode: AlignmentMode,
        matrix: &SubstitutionMatrix,
        x: &Sequence,
        y: &Sequence,
    ) -> Result<PairwiseAlignment>;
}

/// The operation for aligning symbol `a` against symbol `b`, ignoring case.
pub(crate) fn match_or_subst(a: u8, b: u8) -> AlignmentOperation {
    if a.eq_ignore_ascii_case(&b) {
        AlignmentOperation::Match
    } else {
        AlignmentOperation::Subst
    }
}
