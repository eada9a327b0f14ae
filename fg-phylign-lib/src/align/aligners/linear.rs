use anyhow::Result;
use std::cmp::max;

use crate::align::{
    aligners::{
        constants::{AlignmentMode, AlignmentOperation, DEFAULT_GAP_PENALTY},
        match_or_subst, PairwiseAligner,
    },
    alignment::PairwiseAlignment,
    matrix::Matrix,
    scoring::SubstitutionMatrix,
    sequence::Sequence,
};

/// A pairwise aligner with a single penalty for every gap position.  Supports global
/// (Needleman-Wunsch) and local (Smith-Waterman) alignment.
///
/// `V(i,j)` is the best score aligning the first `i` symbols of `x` with the first `j` symbols
/// of `y`:
/// ```ignore
/// V(i,j) = max(V(i-1,j-1) + s(x_i, y_j), V(i-1,j) + gap, V(i,j-1) + gap)
/// ```
/// with local alignment additionally bounding every cell below by zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinearAligner {
    gap_penalty: i32,
}

impl Default for LinearAligner {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_PENALTY)
    }
}

impl LinearAligner {
    pub fn new(gap_penalty: i32) -> Self {
        Self { gap_penalty }
    }

    pub fn gap_penalty(&self) -> i32 {
        self.gap_penalty
    }

    /// Fills the score table, returning it along with the cell where the traceback starts.
    fn fill(
        &self,
        mode: AlignmentMode,
        matrix: &SubstitutionMatrix,
        x: &[u8],
        y: &[u8],
    ) -> (Matrix<i32>, usize, usize) {
        let (m, n) = (x.len(), y.len());
        let mut scores = Matrix::for_lengths(m, n, 0);
        if mode.is_global() {
            for i in 1..=m {
                scores.set(i, 0, i as i32 * self.gap_penalty);
            }
            for j in 1..=n {
                scores.set(0, j, j as i32 * self.gap_penalty);
            }
        }

        let mut best = (0, 0, 0);
        for i in 1..=m {
            for j in 1..=n {
                let diagonal = scores.get(i - 1, j - 1) + matrix.score(x[i - 1], y[j - 1]);
                let vertical = scores.get(i - 1, j) + self.gap_penalty;
                let horizontal = scores.get(i, j - 1) + self.gap_penalty;
                let mut value = max(diagonal, max(vertical, horizontal));
                if !mode.is_global() {
                    value = max(value, 0);
                    if value > best.0 {
                        best = (value, i, j);
                    }
                }
                scores.set(i, j, value);
            }
        }

        if mode.is_global() {
            (scores, m, n)
        } else {
            (scores, best.1, best.2)
        }
    }
}

impl PairwiseAligner for LinearAligner {
    fn sequence(
        &self,
        mode: AlignmentMode,
        matrix: &SubstitutionMatrix,
        x: &Sequence,
        y: &Sequence,
    ) -> Result<PairwiseAlignment> {
        matrix.validate_sequence(x)?;
        matrix.validate_sequence(y)?;
        let (xs, ys) = (x.bases().as_slice(), y.bases().as_slice());
        let (scores, mut i, mut j) = self.fill(mode, matrix, xs, ys);
        let score = *scores.get(i, j);

        let mut operations = Vec::with_capacity(xs.len() + ys.len());
        while i > 0 && j > 0 && (mode.is_global() || *scores.get(i, j) > 0) {
            let value = *scores.get(i, j);
            if value == scores.get(i - 1, j - 1) + matrix.score(xs[i - 1], ys[j - 1]) {
                operations.push(match_or_subst(xs[i - 1], ys[j - 1]));
                i -= 1;
                j -= 1;
            } else if value == scores.get(i - 1, j) + self.gap_penalty {
                operations.push(AlignmentOperation::Del);
                i -= 1;
            } else {
                operations.push(AlignmentOperation::Ins);
                j -= 1;
            }
        }
        if mode.is_global() {
            operations.extend(std::iter::repeat(AlignmentOperation::Del).take(i));
            operations.extend(std::iter::repeat(AlignmentOperation::Ins).take(j));
            i = 0;
            j = 0;
        }
        operations.reverse();

        Ok(PairwiseAlignment::from_operations(
            x,
            y,
            i,
            j,
            operations,
            score,
            matrix.gap_character(),
        ))
    }
}
