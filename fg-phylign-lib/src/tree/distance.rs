use std::{
    io::{BufRead, BufReader, Write},
    path::Path,
};

use anyhow::{bail, ensure, Context, Result};
use fgoxide::io::Io;
use itertools::Itertools;

use crate::{
    align::{
        aligners::{AlignmentMode, PairwiseAligner},
        scoring::SubstitutionMatrix,
        sequence::Sequence,
    },
    util::io::BUFFER_SIZE,
};

/// The largest difference allowed between `d(i,j)` and `d(j,i)`.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A symmetric square matrix of pairwise distances between clusters.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds a distance matrix from its rows, which must form a non-empty, square, symmetric
    /// matrix of finite values.
    pub fn new(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        ensure!(size > 0, "Distance matrix is empty");
        for (i, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == size,
                "Distance matrix is not square: row {} has {} values, expected {}",
                i,
                row.len(),
                size
            );
        }
        let matrix = Self { size, values: rows.iter().flatten().copied().collect() };
        for (i, j) in (0..size).cartesian_product(0..size) {
            let value = matrix.get(i, j);
            ensure!(value.is_finite(), "Distance matrix value at ({}, {}) is not finite: {}", i, j, value);
            ensure!(
                (value - matrix.get(j, i)).abs() <= SYMMETRY_TOLERANCE,
                "Distance matrix is not symmetric at ({}, {}): {} != {}",
                i,
                j,
                value,
                matrix.get(j, i)
            );
        }
        Ok(matrix)
    }

    /// The number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    pub fn sum_row(&self, i: usize) -> f64 {
        (0..self.size).map(|j| self.get(i, j)).sum()
    }

    pub fn sum_column(&self, j: usize) -> f64 {
        (0..self.size).map(|i| self.get(i, j)).sum()
    }

    /// Builds the matrix that results from merging clusters `i` and `j`: their rows and columns
    /// are removed, and one row and column is appended for the merged cluster.  `merged` holds the
    /// distance from the merged cluster to every remaining cluster, in their original order.
    pub fn remap(&self, i: usize, j: usize, merged: &[f64]) -> Result<Self> {
        ensure!(i != j && i < self.size && j < self.size, "Cannot merge clusters {} and {}", i, j);
        let remaining = (0..self.size).filter(|k| *k != i && *k != j).collect_vec();
        ensure!(
            merged.len() == remaining.len(),
            "Expected {} distances for the merged cluster, found {}",
            remaining.len(),
            merged.len()
        );
        let size = remaining.len() + 1;
        let mut values = Vec::with_capacity(size * size);
        for (row, k) in remaining.iter().enumerate() {
            values.extend(remaining.iter().map(|l| self.get(*k, *l)));
            values.push(merged[row]);
        }
        values.extend(merged.iter().copied());
        values.push(0.0);
        Ok(Self { size, values })
    }

    /// Reads a distance matrix: whitespace separated rows of values, optionally preceded by a
    /// header line of names and optionally with each row prefixed by its name.  Blank lines and
    /// lines starting with `#` are ignored.  Returns the names if any were present.
    ///
    /// Header and row names are recognized by their token counts, so names that look like
    /// numbers are read as names: for `n` rows, a first line of `n - 1` tokens among `n` lines
    /// is a header, and a row of `n + 1` tokens starts with its name.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<(Self, Option<Vec<String>>)> {
        let mut lines: Vec<(usize, Vec<String>)> = Vec::new();
        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            lines.push((line_index + 1, trimmed.split_whitespace().map(String::from).collect()));
        }

        let has_header =
            lines.first().map_or(false, |(_, tokens)| tokens.len() + 1 == lines.len());
        let header = if has_header { Some(lines.remove(0).1) } else { None };
        let size = lines.len();
        let mut row_names = Vec::new();
        let mut rows = Vec::with_capacity(size);
        for (line_number, tokens) in &lines {
            let values = if tokens.len() == size + 1 {
                row_names.push(tokens[0].clone());
                &tokens[1..]
            } else {
                &tokens[..]
            };
            let row = values
                .iter()
                .map(|t| {
                    t.parse::<f64>().with_context(|| {
                        format!("Invalid distance '{t}' on line {line_number}")
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(row);
        }

        if !row_names.is_empty() && row_names.len() != rows.len() {
            bail!("Either every row of the distance matrix or none must start with a name");
        }
        let matrix = Self::new(&rows)?;
        let names = match (header, row_names.is_empty()) {
            (Some(header), false) => {
                ensure!(header == row_names, "Distance matrix header names differ from row names");
                Some(header)
            }
            (Some(header), true) => Some(header),
            (None, false) => Some(row_names),
            (None, true) => None,
        };
        if let Some(names) = &names {
            ensure!(
                names.len() == matrix.size(),
                "Found {} names for a distance matrix of size {}",
                names.len(),
                matrix.size()
            );
        }
        Ok((matrix, names))
    }

    /// Reads a distance matrix from the given path (which may be GZIP compressed).
    pub fn load<P: AsRef<Path>>(path: &P) -> Result<(Self, Option<Vec<String>>)> {
        let fg_io = Io::new(5, BUFFER_SIZE);
        let reader = fg_io
            .new_reader(path)
            .with_context(|| format!("Could not open {}", path.as_ref().display()))?;
        Self::from_reader(BufReader::new(reader))
            .with_context(|| format!("Could not read distance matrix {}", path.as_ref().display()))
    }

    /// Writes the matrix as tab-separated values with a header line of names.
    pub fn write_tsv<W: Write>(&self, writer: &mut W, names: &[String]) -> Result<()> {
        ensure!(names.len() == self.size, "Expected {} names, found {}", self.size, names.len());
        writeln!(writer, "{}", names.join("\t"))?;
        for (i, name) in names.iter().enumerate() {
            let values = (0..self.size).map(|j| self.get(i, j).to_string()).join("\t");
            writeln!(writer, "{name}\t{values}")?;
        }
        Ok(())
    }
}

/// The all-vs-all pairwise alignment scores of a set of named sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreMatrix {
    names: Vec<String>,
    values: Vec<i32>,
}

impl ScoreMatrix {
    pub fn size(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, i: usize, j: usize) -> i32 {
        self.values[i * self.names.len() + j]
    }

    /// Converts similarity scores to distances with `d(i,j) = (s(i,i) + s(j,j)) / 2 - s(i,j)`,
    /// bounded below by zero.
    pub fn to_distances(&self) -> Result<DistanceMatrix> {
        let size = self.size();
        let rows = (0..size)
            .map(|i| {
                (0..size)
                    .map(|j| {
                        if i == j {
                            0.0
                        } else {
                            let own = f64::from(self.get(i, i)) + f64::from(self.get(j, j));
                            (own / 2.0 - f64::from(self.get(i, j))).max(0.0)
                        }
                    })
                    .collect_vec()
            })
            .collect_vec();
        DistanceMatrix::new(&rows)
    }

    /// Writes the scores as tab-separated values with a header line of names.
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", self.names.join("\t"))?;
        for (i, name) in self.names.iter().enumerate() {
            let values = (0..self.size()).map(|j| self.get(i, j)).join("\t");
            writeln!(writer, "{name}\t{values}")?;
        }
        Ok(())
    }
}

/// Aligns every pair of sequences (including each sequence with itself) once, returning the
/// symmetric matrix of scores.
pub fn pairwise_scores(
    aligner: &dyn PairwiseAligner,
    mode: AlignmentMode,
    matrix: &SubstitutionMatrix,
    sequences: &[Sequence],
) -> Result<ScoreMatrix> {
    pairwise_scores_with_progress(aligner, mode, matrix, sequences, |_, _| ())
}

/// As [`pairwise_scores`], calling `on_pair` after each pair of sequences has been aligned.
pub fn pairwise_scores_with_progress<F>(
    aligner: &dyn PairwiseAligner,
    mode: AlignmentMode,
    matrix: &SubstitutionMatrix,
    sequences: &[Sequence],
    mut on_pair: F,
) -> Result<ScoreMatrix>
where
    F: FnMut(usize, usize),
{
    ensure!(!sequences.is_empty(), "No sequences were given to score");
    let size = sequences.len();
    let mut values = vec![0; size * size];
    for i in 0..size {
        for j in i..size {
            let alignment = aligner
                .sequence(mode, matrix, &sequences[i], &sequences[j])
                .with_context(|| {
                    format!(
                        "Failed to align '{}' with '{}'",
                        sequences[i].name(),
                        sequences[j].name()
                    )
                })?;
            values[i * size + j] = alignment.score;
            values[j * size + i] = alignment.score;
            on_pair(i, j);
        }
    }
    Ok(ScoreMatrix { names: sequences.iter().map(|s| s.name().clone()).collect(), values })
}

#[cfg(test)]
pub mod tests {
    use super::{pairwise_scores, pairwise_scores_with_progress, DistanceMatrix};
    use crate::align::{
        aligners::{AlignmentMode, LinearAligner},
        scoring::SubstitutionMatrix,
        sequence::Sequence,
    };
    use rstest::rstest;

    fn four_taxa() -> DistanceMatrix {
        DistanceMatrix::new(&[
            vec![0.0, 5.0, 7.0, 8.0],
            vec![5.0, 0.0, 8.0, 9.0],
            vec![7.0, 8.0, 0.0, 9.0],
            vec![8.0, 9.0, 9.0, 0.0],
        ])
        .unwrap()
    }

    #[rstest]
    fn test_sums() {
        let matrix = four_taxa();
        assert_eq!(matrix.size(), 4);
        assert!((matrix.sum_row(0) - 20.0).abs() < 1e-12);
        assert!((matrix.sum_column(3) - 26.0).abs() < 1e-12);
    }

    #[rstest]
    fn test_remap() {
        let matrix = four_taxa().remap(0, 1, &[5.0, 6.0]).unwrap();
        assert_eq!(matrix.size(), 3);
        let expected = [[0.0, 9.0, 5.0], [9.0, 0.0, 6.0], [5.0, 6.0, 0.0]];
        for (i, row) in expected.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                assert!((matrix.get(i, j) - value).abs() < 1e-12, "({i}, {j})");
            }
        }
        assert!(four_taxa().remap(1, 1, &[1.0, 2.0]).is_err());
        assert!(four_taxa().remap(0, 1, &[1.0]).is_err());
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![vec![0.0, 1.0]])]
    #[case(vec![vec![0.0, 1.0], vec![2.0, 0.0]])]
    #[case(vec![vec![0.0, f64::NAN], vec![f64::NAN, 0.0]])]
    fn test_invalid(#[case] rows: Vec<Vec<f64>>) {
        assert!(DistanceMatrix::new(&rows).is_err());
    }

    #[rstest]
    fn test_from_reader_with_names() {
        let text = "# distances\nA\tB\tC\nA\t0\t1\t2\nB\t1\t0\t3\nC\t2\t3\t0\n";
        let (matrix, names) = DistanceMatrix::from_reader(text.as_bytes()).unwrap();
        assert_eq!(names.unwrap(), vec!["A", "B", "C"]);
        assert!((matrix.get(1, 2) - 3.0).abs() < 1e-12);

        let (matrix, names) = DistanceMatrix::from_reader("0 1.5\n1.5 0\n".as_bytes()).unwrap();
        assert!(names.is_none());
        assert!((matrix.get(0, 1) - 1.5).abs() < 1e-12);

        let (_, names) = DistanceMatrix::from_reader("x 0 1\ny 1 0\n".as_bytes()).unwrap();
        assert_eq!(names.unwrap(), vec!["x", "y"]);
    }

    #[rstest]
    #[case("A B\n0 1\n1 0\n0 0\n")]
    #[case("A B C\n0 1\n1 0\n")]
    #[case("A\tB\nA\t0\t1\nC\t1\t0\n")]
    #[case("0 1\n1 zero\n")]
    fn test_from_reader_invalid(#[case] text: &str) {
        assert!(DistanceMatrix::from_reader(text.as_bytes()).is_err());
    }

    #[rstest]
    #[case(&["1", "2", "3"])]
    #[case(&["1e5", "inf", "nan"])]
    fn test_numeric_names_round_trip(#[case] names: &[&str]) {
        let matrix =
            DistanceMatrix::new(&[vec![0.0, 2.0, 6.0], vec![2.0, 0.0, 8.0], vec![6.0, 8.0, 0.0]])
                .unwrap();
        let names = names.iter().map(|n| (*n).to_string()).collect::<Vec<_>>();
        let mut out = Vec::new();
        matrix.write_tsv(&mut out, &names).unwrap();
        let (read, read_names) = DistanceMatrix::from_reader(out.as_slice()).unwrap();
        assert_eq!(read, matrix);
        assert_eq!(read_names.unwrap(), names);
    }

    #[rstest]
    fn test_from_reader_numeric_header_without_row_names() {
        let (matrix, names) =
            DistanceMatrix::from_reader("10 20\n0 4\n4 0\n".as_bytes()).unwrap();
        assert_eq!(names.unwrap(), vec!["10", "20"]);
        assert!((matrix.get(0, 1) - 4.0).abs() < 1e-12);
    }

    #[rstest]
    fn test_write_tsv_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.tsv");
        let names = ["A", "B", "C", "D"].map(String::from).to_vec();
        let mut file = std::fs::File::create(&path).unwrap();
        four_taxa().write_tsv(&mut file, &names).unwrap();
        drop(file);
        let (matrix, loaded_names) = DistanceMatrix::load(&path).unwrap();
        assert_eq!(matrix, four_taxa());
        assert_eq!(loaded_names.unwrap(), names);
    }

    #[rstest]
    fn test_pairwise_scores_and_distances() {
        let matrix = SubstitutionMatrix::identity(b"ACGT", 1, -1).unwrap();
        let sequences = vec![
            Sequence::new("a", b"ACGT"),
            Sequence::new("b", b"ACGA"),
            Sequence::new("c", b"TTTT"),
        ];
        let mut pairs = Vec::new();
        let scores = pairwise_scores_with_progress(
            &LinearAligner::new(-2),
            AlignmentMode::Global,
            &matrix,
            &sequences,
            |i, j| pairs.push((i, j)),
        )
        .unwrap();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)]);
        assert_eq!(scores.names(), ["a", "b", "c"]);
        assert_eq!(scores.get(0, 0), 4);
        assert_eq!(scores.get(0, 1), 2);
        assert_eq!(scores.get(1, 0), 2);
        assert_eq!(scores.get(0, 2), -2);

        let distances = scores.to_distances().unwrap();
        assert!((distances.get(0, 1) - 2.0).abs() < 1e-12);
        assert!((distances.get(0, 2) - 6.0).abs() < 1e-12);
        assert!(distances.get(1, 1).abs() < 1e-12);

        let mut out = Vec::new();
        scores.write_tsv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a\tb\tc\na\t4\t2\t-2\nb\t2\t4\t-4\nc\t-2\t-4\t4\n"
        );
    }

    #[rstest]
    fn test_pairwise_scores_errors() {
        let matrix = SubstitutionMatrix::identity(b"ACGT", 1, -1).unwrap();
        let aligner = LinearAligner::default();
        assert!(pairwise_scores(&aligner, AlignmentMode::Global, &matrix, &[]).is_err());
        let sequences = vec![Sequence::new("a", b"ACGT"), Sequence::new("b", b"NNNN")];
        assert!(pairwise_scores(&aligner, AlignmentMode::Global, &matrix, &sequences).is_err());
    }
}
