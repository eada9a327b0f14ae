use std::{
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{bail, ensure, Context, Result};
use fgoxide::io::Io;
use itertools::Itertools;
use lazy_static::lazy_static;

use crate::{
    align::{aligners::constants::DEFAULT_GAP_CHARACTER, sequence::Sequence},
    util::io::BUFFER_SIZE,
};

/// The BLOSUM62 matrix as distributed by NCBI.
const BLOSUM62_TEXT: &str = include_str!("../../resources/BLOSUM62.txt");

lazy_static! {
    static ref BLOSUM62: SubstitutionMatrix = SubstitutionMatrix::from_reader(BLOSUM62_TEXT.as_bytes())
        .expect("Bug: the built-in BLOSUM62 matrix failed to parse");
}

/// The number of possible byte values, used to size the symbol lookup tables.
const NUM_SYMBOLS: usize = 256;

/// A square table of scores for substituting one alphabet symbol with another, along with the
/// symbol used to denote a gap.
///
/// Symbols are matched case-insensitively: labels are stored upper-cased and lookups upper-case
/// their arguments.  Rows and columns are indexed by their labels in the order they were given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstitutionMatrix {
    row_labels: Vec<u8>,
    column_labels: Vec<u8>,
    /// Row-major scores, `row_labels.len()` rows by `column_labels.len()` columns
    scores: Vec<i32>,
    row_index: Vec<Option<usize>>,
    column_index: Vec<Option<usize>>,
    gap: u8,
}

fn build_index(labels: &[u8]) -> Vec<Option<usize>> {
    let mut index = vec![None; NUM_SYMBOLS];
    for (i, label) in labels.iter().enumerate() {
        index[label.to_ascii_uppercase() as usize] = Some(i);
    }
    index
}

fn parse_label(token: &str, line_number: usize) -> Result<u8> {
    let bytes = token.as_bytes();
    ensure!(
        bytes.len() == 1,
        "Substitution matrix labels must be a single character, found '{}' on line {}",
        token,
        line_number
    );
    Ok(bytes[0].to_ascii_uppercase())
}

impl SubstitutionMatrix {
    /// Creates a new matrix where `labels` label both the rows and the columns of `scores`.
    pub fn new(labels: &[u8], scores: &[Vec<i32>]) -> Result<Self> {
        Self::with_labels(labels, labels, scores)
    }

    /// Creates a new matrix with (possibly differently ordered) row and column labels.
    pub fn with_labels(row_labels: &[u8], column_labels: &[u8], scores: &[Vec<i32>]) -> Result<Self> {
        let row_labels = row_labels.iter().map(u8::to_ascii_uppercase).collect_vec();
        let column_labels = column_labels.iter().map(u8::to_ascii_uppercase).collect_vec();
        ensure!(
            row_labels.len() == column_labels.len(),
            "Substitution matrix must be square, found {} rows and {} columns",
            row_labels.len(),
            column_labels.len()
        );
        ensure!(
            column_labels.iter().all_unique(),
            "Substitution matrix column labels must be unique: {}",
            String::from_utf8_lossy(&column_labels)
        );
        ensure!(
            row_labels.iter().all_unique(),
            "Substitution matrix row labels must be unique: {}",
            String::from_utf8_lossy(&row_labels)
        );
        ensure!(
            row_labels.iter().sorted().eq(column_labels.iter().sorted()),
            "Substitution matrix row and column labels differ"
        );
        ensure!(
            scores.len() == row_labels.len(),
            "Expected {} rows of scores, found {}",
            row_labels.len(),
            scores.len()
        );
        for (label, row) in row_labels.iter().zip(scores.iter()) {
            ensure!(
                row.len() == column_labels.len(),
                "Expected {} scores for row '{}', found {}",
                column_labels.len(),
                *label as char,
                row.len()
            );
        }

        Ok(Self {
            row_index: build_index(&row_labels),
            column_index: build_index(&column_labels),
            row_labels,
            column_labels,
            scores: scores.iter().flatten().copied().collect(),
            gap: DEFAULT_GAP_CHARACTER,
        })
    }

    /// Builds a matrix over the given alphabet that scores identical symbols with `match_score`
    /// and all other pairs with `mismatch_score`.
    pub fn identity(alphabet: &[u8], match_score: i32, mismatch_score: i32) -> Result<Self> {
        let scores = (0..alphabet.len())
            .map(|i| {
                (0..alphabet.len())
                    .map(|j| if i == j { match_score } else { mismatch_score })
                    .collect_vec()
            })
            .collect_vec();
        Self::new(alphabet, &scores)
    }

    /// The built-in BLOSUM62 amino acid matrix.
    pub fn blosum62() -> Self {
        BLOSUM62.clone()
    }

    /// Loads a matrix from the given path (which may be GZIP compressed).
    pub fn load<P: AsRef<Path>>(path: &P) -> Result<Self> {
        let fg_io = Io::new(5, BUFFER_SIZE);
        let reader = fg_io
            .new_reader(path)
            .with_context(|| format!("Could not open {}", path.as_ref().display()))?;
        Self::from_reader(BufReader::new(reader))
            .with_context(|| format!("Could not parse substitution matrix {}", path.as_ref().display()))
    }

    /// Parses a matrix: optional leading comment lines starting with `#`, then a header line with
    /// one single-character label per column, then one line per row holding the row label
    /// followed by one integer score per column.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut column_labels: Option<Vec<u8>> = None;
        let mut row_labels = Vec::new();
        let mut scores = Vec::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = line_index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut tokens = trimmed.split_whitespace();
            match column_labels {
                None => {
                    let labels = tokens
                        .map(|token| parse_label(token, line_number))
                        .collect::<Result<Vec<_>>>()?;
                    column_labels = Some(labels);
                }
                Some(ref labels) => {
                    let Some(label) = tokens.next() else {
                        bail!("Missing row label on line {}", line_number);
                    };
                    row_labels.push(parse_label(label, line_number)?);
                    let row = tokens
                        .map(|token| {
                            token.parse::<i32>().with_context(|| {
                                format!("Invalid score '{}' on line {}", token, line_number)
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    ensure!(
                        row.len() == labels.len(),
                        "Expected {} scores on line {}, found {}",
                        labels.len(),
                        line_number,
                        row.len()
                    );
                    scores.push(row);
                }
            }
        }

        let Some(column_labels) = column_labels else {
            bail!("Substitution matrix has no header line");
        };
        Self::with_labels(&row_labels, &column_labels, &scores)
    }

    /// Returns a copy of this matrix that uses the given gap character.
    #[must_use]
    pub fn with_gap_character(mut self, gap: u8) -> Self {
        self.gap = gap;
        self
    }

    pub fn gap_character(&self) -> u8 {
        self.gap
    }

    pub fn row_count(&self) -> usize {
        self.row_labels.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty() || self.column_labels.is_empty()
    }

    /// The (upper-case) column labels, which form the alphabet of the matrix.
    pub fn alphabet(&self) -> &[u8] {
        &self.column_labels
    }

    /// The score at the given row and column index.
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.scores[row * self.column_labels.len() + col]
    }

    /// The column index of the given symbol, if it is part of the alphabet.
    pub fn index_of(&self, symbol: u8) -> Option<usize> {
        self.column_index[symbol.to_ascii_uppercase() as usize]
    }

    pub fn contains(&self, symbol: u8) -> bool {
        self.index_of(symbol).is_some()
    }

    /// The score for substituting symbol `a` with symbol `b`, or `None` if either symbol is not
    /// in the alphabet.
    pub fn try_score(&self, a: u8, b: u8) -> Option<i32> {
        let row = self.row_index[a.to_ascii_uppercase() as usize]?;
        let col = self.column_index[b.to_ascii_uppercase() as usize]?;
        Some(self.get(row, col))
    }

    /// The score for substituting symbol `a` with symbol `b`.  Symbols outside the alphabet score
    /// the lowest value in the matrix.
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.try_score(a, b)
            .unwrap_or_else(|| self.scores.iter().copied().min().unwrap_or(0))
    }

    /// Ensures the matrix is usable and every symbol of the sequence is in its alphabet.
    pub fn validate_sequence(&self, sequence: &Sequence) -> Result<()> {
        ensure!(!self.is_empty(), "Sequences must be evaluated against a non-empty substitution matrix");
        if let Some(position) = sequence.bases().iter().position(|b| !self.contains(*b)) {
            bail!(
                "Sequence '{}' contains symbol '{}' at offset {} that is not in the substitution matrix alphabet '{}'",
                sequence.name(),
                sequence[position] as char,
                position,
                String::from_utf8_lossy(self.alphabet())
            );
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::SubstitutionMatrix;
    use crate::align::sequence::Sequence;
    use rstest::rstest;
    use std::io::Write;

    const NUC_MATRIX: &str = "# a comment\n# another comment\n   A  C  G  T\nA  1 -1 -1 -1\nC -1  1 -1 -1\nG -1 -1  1 -1\nT -1 -1 -1  1\n";

    #[rstest]
    fn test_from_reader() {
        let matrix = SubstitutionMatrix::from_reader(NUC_MATRIX.as_bytes()).unwrap();
        assert_eq!(matrix.row_count(), 4);
        assert_eq!(matrix.column_count(), 4);
        assert_eq!(matrix.alphabet(), b"ACGT");
        assert_eq!(matrix.score(b'A', b'A'), 1);
        assert_eq!(matrix.score(b'a', b'C'), -1);
        assert_eq!(matrix.score(b'g', b'g'), 1);
        assert_eq!(matrix.get(3, 3), 1);
        assert_eq!(matrix.try_score(b'N', b'A'), None);
        assert_eq!(matrix.gap_character(), b'-');
        assert_eq!(matrix.with_gap_character(b'.').gap_character(), b'.');
    }

    #[rstest]
    #[case("")]
    #[case("# only comments\n")]
    #[case("  A  C\nA  1 -1\nC -1\n")]
    #[case("  A  C\nA  1 -1\nC -1 x\n")]
    #[case("  AC  G\nA  1 -1\n")]
    #[case("  A  A\nA  1 -1\nA -1  1\n")]
    #[case("  A  C\nA  1 -1\nG -1  1\n")]
    #[case("  A  C\nA  1 -1\n")]
    fn test_from_reader_invalid(#[case] text: &str) {
        assert!(SubstitutionMatrix::from_reader(text.as_bytes()).is_err());
    }

    #[rstest]
    fn test_row_order_may_differ_from_column_order() {
        let text = "  A  C\nC -2  3\nA  5 -2\n";
        let matrix = SubstitutionMatrix::from_reader(text.as_bytes()).unwrap();
        assert_eq!(matrix.score(b'A', b'A'), 5);
        assert_eq!(matrix.score(b'C', b'C'), 3);
        assert_eq!(matrix.score(b'A', b'C'), -2);
    }

    #[rstest]
    fn test_blosum62() {
        let matrix = SubstitutionMatrix::blosum62();
        assert_eq!(matrix.column_count(), 24);
        assert_eq!(matrix.score(b'W', b'W'), 11);
        assert_eq!(matrix.score(b'A', b'R'), -1);
        assert_eq!(matrix.score(b'r', b'a'), -1);
        assert_eq!(matrix.score(b'*', b'*'), 1);
        assert_eq!(matrix.score(b'C', b'C'), 9);
        // unknown symbols score the minimum of the matrix
        assert_eq!(matrix.score(b'-', b'A'), -4);
    }

    #[rstest]
    fn test_identity() {
        let matrix = SubstitutionMatrix::identity(b"ACGT", 2, -3).unwrap();
        assert_eq!(matrix.score(b'A', b'A'), 2);
        assert_eq!(matrix.score(b'A', b't'), -3);
        assert!(SubstitutionMatrix::identity(b"AAC", 1, -1).is_err());
    }

    #[rstest]
    fn test_validate_sequence() {
        let matrix = SubstitutionMatrix::identity(b"ACGT", 1, -1).unwrap();
        assert!(matrix.validate_sequence(&Sequence::new("ok", b"acgtACGT")).is_ok());
        let err = matrix
            .validate_sequence(&Sequence::new("bad", b"ACNT"))
            .unwrap_err();
        assert!(err.to_string().contains("'N' at offset 2"));

        let empty = SubstitutionMatrix::new(&[], &[]).unwrap();
        assert!(empty.is_empty());
        assert!(empty.validate_sequence(&Sequence::new("ok", b"A")).is_err());
    }

    #[rstest]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(NUC_MATRIX.as_bytes()).unwrap();
        drop(file);
        let matrix = SubstitutionMatrix::load(&path).unwrap();
        assert_eq!(matrix.alphabet(), b"ACGT");
        assert!(SubstitutionMatrix::load(&dir.path().join("missing.txt")).is_err());
    }
}
