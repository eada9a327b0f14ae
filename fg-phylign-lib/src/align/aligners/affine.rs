use anyhow::{ensure, Result};
use std::cmp::max;

use crate::align::{
    aligners::{
        constants::{
            AlignmentMode, AlignmentOperation, DEFAULT_EXTEND_GAP_PENALTY,
            DEFAULT_OPEN_GAP_PENALTY, MIN_SCORE,
        },
        match_or_subst, PairwiseAligner,
    },
    alignment::PairwiseAlignment,
    matrix::Matrix,
    scoring::SubstitutionMatrix,
    sequence::Sequence,
};

/// The state an alignment prefix ends in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// `x[i]` aligned to `y[j]`
    A,
    /// `x[i]` aligned to a gap
    B,
    /// `y[j]` aligned to a gap
    C,
}

/// The best scores for each of the three states at one cell of the table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct AffineCell {
    a: i32,
    b: i32,
    c: i32,
}

impl Default for AffineCell {
    fn default() -> Self {
        Self { a: MIN_SCORE, b: MIN_SCORE, c: MIN_SCORE }
    }
}

impl AffineCell {
    fn get(&self, state: State) -> i32 {
        match state {
            State::A => self.a,
            State::B => self.b,
            State::C => self.c,
        }
    }

    fn best(&self) -> i32 {
        max(self.a, max(self.b, self.c))
    }

    /// The first state, in the order A, B, C, holding the given value.
    fn state_of(&self, value: i32) -> State {
        if self.a == value {
            State::A
        } else if self.b == value {
            State::B
        } else {
            State::C
        }
    }
}

/// A global pairwise aligner (Gotoh) that charges `open` for the first position of a gap and
/// `extend` for each further position.
///
/// Three scores are kept for every cell:
/// - `A(i,j)`: the alignment ends with `x_i` aligned to `y_j`
/// - `B(i,j)`: the alignment ends with `x_i` aligned to a gap (a deletion)
/// - `C(i,j)`: the alignment ends with `y_j` aligned to a gap (an insertion)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AffineAligner {
    open_gap_penalty: i32,
    extend_gap_penalty: i32,
}

impl Default for AffineAligner {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_GAP_PENALTY, DEFAULT_EXTEND_GAP_PENALTY)
    }
}

impl AffineAligner {
    pub fn new(open_gap_penalty: i32, extend_gap_penalty: i32) -> Self {
        Self { open_gap_penalty, extend_gap_penalty }
    }

    pub fn open_gap_penalty(&self) -> i32 {
        self.open_gap_penalty
    }

    pub fn extend_gap_penalty(&self) -> i32 {
        self.extend_gap_penalty
    }

    /// The score of a gap of the given (non-zero) length.
    fn gap_score(&self, length: usize) -> i32 {
        self.open_gap_penalty + (length as i32 - 1) * self.extend_gap_penalty
    }

    fn fill(&self, matrix: &SubstitutionMatrix, x: &[u8], y: &[u8]) -> Matrix<AffineCell> {
        let (m, n) = (x.len(), y.len());
        let (open, extend) = (self.open_gap_penalty, self.extend_gap_penalty);
        let mut cells = Matrix::for_lengths(m, n, AffineCell::default());
        cells.get_mut(0, 0).a = 0;
        for i in 1..=m {
            cells.get_mut(i, 0).b = self.gap_score(i);
        }
        for j in 1..=n {
            cells.get_mut(0, j).c = self.gap_score(j);
        }

        for i in 1..=m {
            for j in 1..=n {
                let diagonal = cells.get(i - 1, j - 1);
                let up = cells.get(i - 1, j);
                let left = cells.get(i, j - 1);
                let cell = AffineCell {
                    a: diagonal.best() + matrix.score(x[i - 1], y[j - 1]),
                    b: max(up.a + open, max(up.b + extend, up.c + open)),
                    c: max(left.a + open, max(left.b + open, left.c + extend)),
                };
                cells.set(i, j, cell);
            }
        }
        cells
    }
}

impl PairwiseAligner for AffineAligner {
    fn sequence(
        &self,
        mode: AlignmentMode,
        matrix: &SubstitutionMatrix,
        x: &Sequence,
        y: &Sequence,
    ) -> Result<PairwiseAlignment> {
        ensure!(mode.is_global(), "Affine gap alignment supports global mode only, found: {mode}");
        ensure!(
            !x.is_empty() && !y.is_empty(),
            "Affine gap alignment requires non-empty sequences, found lengths {} ('{}') and {} ('{}')",
            x.len(),
            x.name(),
            y.len(),
            y.name()
        );
        matrix.validate_sequence(x)?;
        matrix.validate_sequence(y)?;

        let (xs, ys) = (x.bases().as_slice(), y.bases().as_slice());
        let (open, extend) = (self.open_gap_penalty, self.extend_gap_penalty);
        let cells = self.fill(matrix, xs, ys);
        let (mut i, mut j) = (xs.len(), ys.len());
        let score = cells.get(i, j).best();
        let mut state = cells.get(i, j).state_of(score);

        let mut operations = Vec::with_capacity(xs.len() + ys.len());
        while i > 0 && j > 0 {
            let value = cells.get(i, j).get(state);
            state = match state {
                State::A => {
                    operations.push(match_or_subst(xs[i - 1], ys[j - 1]));
                    let previous = value - matrix.score(xs[i - 1], ys[j - 1]);
                    i -= 1;
                    j -= 1;
                    cells.get(i, j).state_of(previous)
                }
                State::B => {
                    operations.push(AlignmentOperation::Del);
                    let up = cells.get(i - 1, j);
                    i -= 1;
                    if up.a + open == value {
                        State::A
                    } else if up.b + extend == value {
                        State::B
                    } else {
                        State::C
                    }
                }
                State::C => {
                    operations.push(AlignmentOperation::Ins);
                    let left = cells.get(i, j - 1);
                    j -= 1;
                    if left.a + open == value {
                        State::A
                    } else if left.b + open == value {
                        State::B
                    } else {
                        State::C
                    }
                }
            };
        }
        operations.extend(std::iter::repeat(AlignmentOperation::Del).take(i));
        operations.extend(std::iter::repeat(AlignmentOperation::Ins).take(j));
        operations.reverse();

        Ok(PairwiseAlignment::from_operations(
            x,
            y,
            0,
            0,
            operations,
            score,
            matrix.gap_character(),
        ))
    }
}
