use std::fmt;

use anyhow::{ensure, Result};

use super::{aligners::constants::AlignmentOperation, sequence::Sequence};

/// An ordered collection of aligned sequences.  Once an alignment is complete, every sequence it
/// holds has the same (gap-padded) length.
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct Alignment {
    sequences: Vec<Sequence>,
}

impl Alignment {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    /// The number of sequences in this alignment.
    pub fn size(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    /// Returns the aligned sequence at the given index, if any.
    pub fn sequence(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn into_sequences(self) -> Vec<Sequence> {
        self.sequences
    }

    /// The number of columns in the alignment, being the length of the first sequence.
    pub fn num_columns(&self) -> usize {
        self.sequences.first().map_or(0, Sequence::len)
    }

    /// True if every sequence in the alignment has the same length.
    pub fn is_rectangular(&self) -> bool {
        let num_columns = self.num_columns();
        self.sequences.iter().all(|s| s.len() == num_columns)
    }

    /// Validates that the alignment is non-empty and every sequence has the same length.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.is_empty(), "Alignment contains no sequences");
        ensure!(
            self.is_rectangular(),
            "Aligned sequences differ in length: {}",
            self.sequences.iter().map(|s| s.len().to_string()).collect::<Vec<_>>().join(", ")
        );
        Ok(())
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sequence in &self.sequences {
            writeln!(f, "{sequence}")?;
        }
        Ok(())
    }
}

/// The result of aligning two sequences: a two-row alignment, its score, and the alignment
/// operations that transform the first sequence into the second.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct PairwiseAlignment {
    /// The alignment score
    pub score: i32,

    /// Start position of alignment in the first sequence (0-based)
    pub xstart: usize,

    /// End position of alignment in the first sequence (0-based exclusive)
    pub xend: usize,

    /// Start position of alignment in the second sequence (0-based)
    pub ystart: usize,

    /// End position of alignment in the second sequence (0-based exclusive)
    pub yend: usize,

    /// Vector of alignment operations
    pub operations: Vec<AlignmentOperation>,

    /// The two aligned (gapped) sequences.
    pub alignment: Alignment,
}

impl PairwiseAlignment {
    /// Builds the gapped sequences for the operations given, which start at `xstart` and `ystart`
    /// in the first and second sequence respectively.
    pub fn from_operations(
        x: &Sequence,
        y: &Sequence,
        xstart: usize,
        ystart: usize,
        operations: Vec<AlignmentOperation>,
        score: i32,
        gap: u8,
    ) -> Self {
        let mut aligned_x = Sequence::new(x.name(), &[]);
        let mut aligned_y = Sequence::new(y.name(), &[]);
        let mut xend = xstart;
        let mut yend = ystart;
        for op in &operations {
            match op {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    aligned_x.append(x[xend]);
                    aligned_y.append(y[yend]);
                }
                AlignmentOperation::Del => {
                    aligned_x.append(x[xend]);
                    aligned_y.append_gap(gap);
                }
                AlignmentOperation::Ins => {
                    aligned_x.append_gap(gap);
                    aligned_y.append(y[yend]);
                }
            }
            xend += op.length_on_x();
            yend += op.length_on_y();
        }
        Self {
            score,
            xstart,
            xend,
            ystart,
            yend,
            operations,
            alignment: Alignment::new(vec![aligned_x, aligned_y]),
        }
    }

    /// The aligned first sequence.
    pub fn first(&self) -> &Sequence {
        &self.alignment.sequences[0]
    }

    /// The aligned second sequence.
    pub fn second(&self) -> &Sequence {
        &self.alignment.sequences[1]
    }

    /// The number of alignment columns.
    pub fn length(&self) -> usize {
        self.operations.len()
    }

    /// The number of gap columns in the alignment.
    pub fn num_gaps(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, AlignmentOperation::Del | AlignmentOperation::Ins))
            .count()
    }

    /// The run-length encoded operations, e.g. `3=1X2I`.
    pub fn cigar(&self) -> String {
        let mut cigar: String = String::new();
        let mut iter = self.operations.iter().peekable();
        while let Some(op) = iter.next() {
            let mut len = 1;
            while iter.peek() == Some(&op) {
                iter.next();
                len += 1;
            }
            cigar.push_str(&format!("{}{}", len, op.as_char()));
        }
        cigar
    }
}

impl fmt::Display for PairwiseAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score: {} x: [{},{}) y: [{},{}) cigar: {}",
            self.score,
            self.xstart,
            self.xend,
            self.ystart,
            self.yend,
            self.cigar()
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::{Alignment, PairwiseAlignment};
    use crate::align::{
        aligners::constants::AlignmentOperation::{Del, Ins, Match, Subst},
        sequence::Sequence,
    };
    use rstest::rstest;

    #[rstest]
    fn test_from_operations() {
        let x = Sequence::new("x", b"ACGTT");
        let y = Sequence::new("y", b"ACCGA");
        let aln = PairwiseAlignment::from_operations(
            &x,
            &y,
            0,
            0,
            vec![Match, Ins, Match, Match, Subst, Del],
            3,
            b'-',
        );
        assert_eq!(aln.first().to_string(), "A-CGTT");
        assert_eq!(aln.second().to_string(), "ACCGA-");
        assert_eq!(aln.first().name(), "x");
        assert_eq!(aln.second().name(), "y");
        assert_eq!((aln.xend, aln.yend), (5, 5));
        assert_eq!(aln.cigar(), "1=1I2=1X1D");
        assert_eq!(aln.num_gaps(), 2);
        assert_eq!(aln.length(), 6);
        assert!(aln.first().is_gapped());
        assert!(aln.alignment.validate().is_ok());
    }

    #[rstest]
    fn test_from_operations_with_offsets() {
        let x = Sequence::new("x", b"TTACG");
        let y = Sequence::new("y", b"GACG");
        let aln =
            PairwiseAlignment::from_operations(&x, &y, 2, 1, vec![Match, Match, Match], 3, b'-');
        assert_eq!(aln.first().to_string(), "ACG");
        assert_eq!(aln.second().to_string(), "ACG");
        assert_eq!((aln.xstart, aln.xend, aln.ystart, aln.yend), (2, 5, 1, 4));
        assert_eq!(aln.cigar(), "3=");
    }

    #[rstest]
    fn test_empty_operations() {
        let x = Sequence::new("x", b"");
        let y = Sequence::new("y", b"");
        let aln = PairwiseAlignment::from_operations(&x, &y, 0, 0, vec![], 0, b'-');
        assert_eq!(aln.cigar(), "");
        assert_eq!(aln.alignment.size(), 2);
        assert_eq!(aln.alignment.num_columns(), 0);
    }

    #[rstest]
    fn test_validate() {
        let mut alignment = Alignment::default();
        assert!(alignment.validate().is_err());
        alignment.add_sequence(Sequence::new("a", b"AC-T"));
        alignment.add_sequence(Sequence::new("b", b"ACGT"));
        assert!(alignment.validate().is_ok());
        alignment.add_sequence(Sequence::new("c", b"ACG"));
        assert!(!alignment.is_rectangular());
        assert!(alignment.validate().is_err());
        assert_eq!(alignment.to_string(), "AC-T\nACGT\nACG\n");
    }
}
