use std::cmp::max;

use itertools::Itertools;

use crate::align::{
    alignment::Alignment, matrix::Matrix, scoring::SubstitutionMatrix, sequence::Sequence,
};

/// The number of occurrences of each alphabet symbol in each column of an alignment.  Symbols
/// outside the alphabet (including gaps) are not counted.
struct Profile {
    /// `counts[column][symbol]`, with symbols indexed by the matrix alphabet
    counts: Vec<Vec<i64>>,
}

impl Profile {
    fn new(alignment: &Alignment, matrix: &SubstitutionMatrix) -> Self {
        let alphabet_size = matrix.alphabet().len();
        let mut counts = vec![vec![0; alphabet_size]; alignment.num_columns()];
        for sequence in alignment.sequences() {
            for (column, symbol) in sequence.bases().iter().enumerate() {
                if let Some(index) = matrix.index_of(*symbol) {
                    counts[column][index] += 1;
                }
            }
        }
        Self { counts }
    }

    fn len(&self) -> usize {
        self.counts.len()
    }
}

/// The move taken at one step of the profile alignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    /// One column from each profile
    Both,
    /// A column of the first profile against gaps
    First,
    /// A column of the second profile against gaps
    Second,
}

/// Profile sum-of-pairs scores for every pair of columns of the two profiles:
/// `psp(i,j) = sum_x sum_y a_i(x) * b_j(y) * s(x,y)`.
fn column_scores(first: &Profile, second: &Profile, matrix: &SubstitutionMatrix) -> Matrix<i64> {
    let alphabet = matrix.alphabet();
    let scores = alphabet
        .iter()
        .map(|x| alphabet.iter().map(|y| i64::from(matrix.score(*x, *y))).collect_vec())
        .collect_vec();

    let mut psp = Matrix::new(first.len(), second.len(), 0);
    for (i, a) in first.counts.iter().enumerate() {
        // weight[y] = sum_x a(x) * s(x,y)
        let weights = (0..alphabet.len())
            .map(|y| a.iter().zip(scores.iter()).map(|(count, row)| count * row[y]).sum::<i64>())
            .collect_vec();
        for (j, b) in second.counts.iter().enumerate() {
            psp.set(i, j, weights.iter().zip(b.iter()).map(|(w, count)| w * count).sum());
        }
    }
    psp
}

/// Aligns two alignments against each other as profiles, with a linear penalty for each column
/// of gaps.  The rows of `first` precede the rows of `second` in the result, and gap columns are
/// filled with the matrix gap character.
pub(crate) fn align_profiles(
    first: &Alignment,
    second: &Alignment,
    matrix: &SubstitutionMatrix,
    gap_penalty: i32,
) -> (Alignment, i64) {
    let (a, b) = (Profile::new(first, matrix), Profile::new(second, matrix));
    let psp = column_scores(&a, &b, matrix);
    let gap = i64::from(gap_penalty);
    let (m, n) = (a.len(), b.len());

    let mut scores = Matrix::for_lengths(m, n, 0);
    for i in 1..=m {
        scores.set(i, 0, i as i64 * gap);
    }
    for j in 1..=n {
        scores.set(0, j, j as i64 * gap);
    }
    for i in 1..=m {
        for j in 1..=n {
            let diagonal = scores.get(i - 1, j - 1) + psp.get(i - 1, j - 1);
            let vertical = scores.get(i - 1, j) + gap;
            let horizontal = scores.get(i, j - 1) + gap;
            scores.set(i, j, max(diagonal, max(vertical, horizontal)));
        }
    }

    let (mut i, mut j) = (m, n);
    let mut steps = Vec::with_capacity(m + n);
    while i > 0 && j > 0 {
        let value = *scores.get(i, j);
        if value == scores.get(i - 1, j - 1) + psp.get(i - 1, j - 1) {
            steps.push(Step::Both);
            i -= 1;
            j -= 1;
        } else if value == scores.get(i - 1, j) + gap {
            steps.push(Step::First);
            i -= 1;
        } else {
            steps.push(Step::Second);
            j -= 1;
        }
    }
    steps.extend(std::iter::repeat(Step::First).take(i));
    steps.extend(std::iter::repeat(Step::Second).take(j));
    steps.reverse();

    let gap_character = matrix.gap_character();
    let mut rows = first
        .sequences()
        .iter()
        .chain(second.sequences().iter())
        .map(|s| Sequence::with_gap_character(s.name(), &[], gap_character))
        .collect_vec();
    let (mut column_a, mut column_b) = (0, 0);
    for step in steps {
        let (take_a, take_b) = match step {
            Step::Both => (true, true),
            Step::First => (true, false),
            Step::Second => (false, true),
        };
        let (rows_a, rows_b) = rows.split_at_mut(first.size());
        for (row, source) in rows_a.iter_mut().zip(first.sequences()) {
            if take_a {
                row.append(source[column_a]);
            } else {
                row.append_gap(gap_character);
            }
        }
        for (row, source) in rows_b.iter_mut().zip(second.sequences()) {
            if take_b {
                row.append(source[column_b]);
            } else {
                row.append_gap(gap_character);
            }
        }
        column_a += usize::from(take_a);
        column_b += usize::from(take_b);
    }

    (Alignment::new(rows), *scores.get(m, n))
}
