//! Progressive multiple sequence alignment.
//!
//! Sequences are joined in the order given by a Neighbor-Joining guide tree.  Visiting the tree
//! from the leaves up, the alignments of the two children of each internal node are aligned to
//! each other as profiles, and the result becomes the alignment for that node.  Gaps introduced
//! at one level are never revisited at a higher level.

mod profile;

use std::collections::HashMap;

use anyhow::{bail, ensure, Context, Result};
use derive_builder::Builder;
use log::debug;

use crate::{
    align::{
        aligners::constants::DEFAULT_GAP_PENALTY, alignment::Alignment,
        scoring::SubstitutionMatrix, sequence::Sequence,
    },
    tree::{construct_tree, DistanceMatrix, GuideTree},
};

/// Aligns many sequences progressively along a guide tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Builder)]
pub struct ProgressiveAligner {
    /// The score for each column of gaps inserted into a profile
    #[builder(default = "DEFAULT_GAP_PENALTY")]
    gap_penalty: i32,
}

impl Default for ProgressiveAligner {
    fn default() -> Self {
        Self { gap_penalty: DEFAULT_GAP_PENALTY }
    }
}

impl ProgressiveAligner {
    pub fn gap_penalty(&self) -> i32 {
        self.gap_penalty
    }

    /// Aligns the sequences, building the guide tree from the distances between them.  The rows
    /// of the returned alignment are in the same order as `sequences`.
    pub fn align_sequences(
        &self,
        distances: &DistanceMatrix,
        sequences: &[Sequence],
        matrix: &SubstitutionMatrix,
    ) -> Result<Alignment> {
        ensure!(!sequences.is_empty(), "No sequences were given to align");
        ensure!(
            distances.size() == sequences.len(),
            "Distance matrix has {} rows but {} sequences were given",
            distances.size(),
            sequences.len()
        );
        ensure!(
            !matrix.is_empty(),
            "Sequences must be aligned with a non-empty substitution matrix"
        );
        for sequence in sequences {
            matrix
                .validate_sequence(sequence)
                .with_context(|| format!("Cannot align sequence '{}'", sequence.name()))?;
        }
        if sequences.len() == 1 {
            return Ok(Alignment::new(sequences.to_vec()));
        }
        let tree = construct_tree(distances, sequences)?;
        self.align_tree(&tree, matrix)
    }

    /// Aligns the sequences held by the leaves of the tree.  The rows of the returned alignment
    /// are in the order the leaves were added to the tree.
    pub fn align_tree(&self, tree: &GuideTree, matrix: &SubstitutionMatrix) -> Result<Alignment> {
        ensure!(!matrix.is_empty(), "Sequences must be aligned with a non-empty substitution matrix");
        let leaves = tree.leaves();
        let row_of: HashMap<_, _> =
            leaves.iter().enumerate().map(|(row, leaf)| (*leaf, row)).collect();

        // The alignment at each visited node, with the leaf row each of its sequences belongs to
        let mut partial: Vec<Option<(Alignment, Vec<usize>)>> = vec![None; tree.len()];
        let mut root = None;
        for index in tree.post_order()? {
            let node = tree.node(index);
            let aligned = match node.children().as_slice() {
                [] => {
                    let sequence = node.sequence().as_ref().with_context(|| {
                        format!("Guide tree leaf '{}' has no sequence", node.label())
                    })?;
                    matrix.validate_sequence(sequence)?;
                    (Alignment::new(vec![sequence.clone()]), vec![row_of[&index]])
                }
                [left, right] => {
                    let (first, first_rows) = partial[left.index()]
                        .take()
                        .with_context(|| format!("Guide tree node {} was not aligned", left.index()))?;
                    let (second, second_rows) = partial[right.index()]
                        .take()
                        .with_context(|| format!("Guide tree node {} was not aligned", right.index()))?;
                    let (merged, score) =
                        profile::align_profiles(&first, &second, matrix, self.gap_penalty);
                    debug!(
                        "Merged profiles of {} and {} sequences at node {} into {} columns with score {}",
                        first.size(),
                        second.size(),
                        index.index(),
                        merged.num_columns(),
                        score
                    );
                    (merged, first_rows.into_iter().chain(second_rows).collect())
                }
                children => bail!(
                    "Guide tree node {} has {} children, expected 0 or 2",
                    index.index(),
                    children.len()
                ),
            };
            partial[index.index()] = Some(aligned);
            root = Some(index);
        }

        let Some((alignment, rows)) = root.and_then(|r| partial[r.index()].take()) else {
            bail!("The guide tree has no nodes to align");
        };
        let mut ordered: Vec<Option<Sequence>> = vec![None; leaves.len()];
        for (sequence, row) in alignment.into_sequences().into_iter().zip(rows) {
            ordered[row] = Some(sequence);
        }
        let ordered = ordered
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .context("Not every leaf of the guide tree is reachable from its root")?;
        let alignment = Alignment::new(ordered);
        alignment.validate()?;
        Ok(alignment)
    }
}

#[cfg(test)]
pub mod tests {
    use super::{ProgressiveAligner, ProgressiveAlignerBuilder};
    use crate::{
        align::{scoring::SubstitutionMatrix, sequence::Sequence},
        tree::{DistanceMatrix, GuideTree},
    };
    use itertools::Itertools;
    use rstest::{fixture, rstest};

    #[fixture]
    fn matrix() -> SubstitutionMatrix {
        SubstitutionMatrix::identity(b"ACGT", 1, -1).unwrap()
    }

    fn six_taxa() -> (DistanceMatrix, Vec<Sequence>) {
        let distances = DistanceMatrix::new(&[
            vec![0.0, 5.0, 4.0, 7.0, 6.0, 8.0],
            vec![5.0, 0.0, 7.0, 10.0, 9.0, 11.0],
            vec![4.0, 7.0, 0.0, 7.0, 6.0, 8.0],
            vec![7.0, 10.0, 7.0, 0.0, 5.0, 9.0],
            vec![6.0, 9.0, 6.0, 5.0, 0.0, 8.0],
            vec![8.0, 11.0, 8.0, 9.0, 8.0, 0.0],
        ])
        .unwrap();
        let sequences = [
            ("A", "ACGTACGACT"),
            ("B", "AGCATCAGC"),
            ("C", "GACTAGCG"),
            ("D", "GACTACGATCG"),
            ("E", "GATCAGCTACTGACG"),
            ("F", "GACTACGATCAGCTA"),
        ]
        .iter()
        .map(|(name, bases)| Sequence::new(name, bases.as_bytes()))
        .collect_vec();
        (distances, sequences)
    }

    #[rstest]
    fn test_builder_defaults() {
        let aligner = ProgressiveAlignerBuilder::default().build().unwrap();
        assert_eq!(aligner, ProgressiveAligner::default());
        assert_eq!(ProgressiveAligner::default().gap_penalty(), -1);
        let aligner = ProgressiveAlignerBuilder::default().gap_penalty(-3).build().unwrap();
        assert_eq!(aligner.gap_penalty(), -3);
    }

    #[rstest]
    fn test_single_sequence_is_unchanged(matrix: SubstitutionMatrix) {
        let distances = DistanceMatrix::new(&[vec![0.0]]).unwrap();
        let sequences = vec![Sequence::new("only", b"ACGTTGCA")];
        let alignment =
            ProgressiveAligner::default().align_sequences(&distances, &sequences, &matrix).unwrap();
        assert_eq!(alignment.sequences(), sequences.as_slice());
    }

    #[rstest]
    fn test_six_sequences(matrix: SubstitutionMatrix) {
        let (distances, sequences) = six_taxa();
        let alignment =
            ProgressiveAligner::default().align_sequences(&distances, &sequences, &matrix).unwrap();
        assert_eq!(alignment.size(), 6);
        assert!(alignment.validate().is_ok());
        for (row, input) in alignment.sequences().iter().zip(sequences.iter()) {
            assert_eq!(row.name(), input.name());
            assert_eq!(row.ungapped(b'-'), *input.bases());
        }
        let rows = alignment.sequences().iter().map(Sequence::as_string).collect_vec();
        assert_eq!(
            rows,
            [
                "----A-CGT-AC-G---A-CT-",
                "----AGCATCA--G-----C--",
                "G---A-C-T-A--G-----CG-",
                "G---A-C-T-AC-G---ATC-G",
                "GATCAGC-T-ACTG---A-C-G",
                "G---A-C-T-AC-GATCAGCTA",
            ]
        );
    }

    #[rstest]
    fn test_three_sequences(matrix: SubstitutionMatrix) {
        let distances =
            DistanceMatrix::new(&[vec![0.0, 2.0, 4.0], vec![2.0, 0.0, 4.0], vec![4.0, 4.0, 0.0]])
                .unwrap();
        let sequences = vec![
            Sequence::new("a", b"ACGT"),
            Sequence::new("b", b"ACT"),
            Sequence::new("c", b"GGACGTT"),
        ];
        let alignment =
            ProgressiveAligner::default().align_sequences(&distances, &sequences, &matrix).unwrap();
        let rows = alignment.sequences().iter().map(Sequence::as_string).collect_vec();
        assert_eq!(rows, ["--ACG-T", "--AC--T", "GGACGTT"]);
    }

    #[rstest]
    fn test_invalid_inputs(matrix: SubstitutionMatrix) {
        let aligner = ProgressiveAligner::default();
        let (distances, sequences) = six_taxa();
        assert!(aligner.align_sequences(&distances, &sequences[..5], &matrix).is_err());
        assert!(aligner.align_sequences(&distances, &[], &matrix).is_err());
        let empty = SubstitutionMatrix::new(&[], &[]).unwrap();
        assert!(aligner.align_sequences(&distances, &sequences, &empty).is_err());
    }

    #[rstest]
    fn test_single_sequence_requires_non_empty_matrix() {
        let distances = DistanceMatrix::new(&[vec![0.0]]).unwrap();
        let sequences = vec![Sequence::new("only", b"ACGT")];
        let empty = SubstitutionMatrix::new(&[], &[]).unwrap();
        let result = ProgressiveAligner::default().align_sequences(&distances, &sequences, &empty);
        assert!(result.unwrap_err().to_string().contains("non-empty substitution matrix"));
    }

    #[rstest]
    fn test_symbols_outside_alphabet_fail(matrix: SubstitutionMatrix) {
        let aligner = ProgressiveAligner::default();
        let single = DistanceMatrix::new(&[vec![0.0]]).unwrap();
        let result = aligner.align_sequences(&single, &[Sequence::new("b", b"ACNT")], &matrix);
        assert!(result.unwrap_err().to_string().contains("'b'"));

        let distances =
            DistanceMatrix::new(&[vec![0.0, 2.0, 4.0], vec![2.0, 0.0, 4.0], vec![4.0, 4.0, 0.0]])
                .unwrap();
        let sequences = vec![
            Sequence::new("a", b"ACGT"),
            Sequence::new("b", b"ACNT"),
            Sequence::new("c", b"GGACGTT"),
        ];
        let result = aligner.align_sequences(&distances, &sequences, &matrix);
        assert!(result.unwrap_err().to_string().contains("'b'"));
    }

    #[rstest]
    fn test_tree_leaf_outside_alphabet_fails(matrix: SubstitutionMatrix) {
        let mut tree = GuideTree::new();
        let a = tree.add_leaf("a", Some(Sequence::new("a", b"ACGT")));
        let b = tree.add_leaf("b", Some(Sequence::new("b", b"AXGT")));
        let root = tree.add_internal("", &[(a, None), (b, None)]).unwrap();
        tree.set_root(root).unwrap();
        assert!(ProgressiveAligner::default().align_tree(&tree, &matrix).is_err());
    }

    #[rstest]
    fn test_node_with_three_children_fails(matrix: SubstitutionMatrix) {
        let mut tree = GuideTree::new();
        let children = ["ACGT", "ACG", "CGT"]
            .iter()
            .map(|bases| (tree.add_leaf(bases, Some(Sequence::new(bases, bases.as_bytes()))), None))
            .collect_vec();
        let root = tree.add_internal("", &children).unwrap();
        tree.set_root(root).unwrap();
        let result = ProgressiveAligner::default().align_tree(&tree, &matrix);
        assert!(result.unwrap_err().to_string().contains("has 3 children"));
    }

    #[rstest]
    fn test_leaf_without_sequence_fails(matrix: SubstitutionMatrix) {
        let mut tree = GuideTree::new();
        let a = tree.add_leaf("a", Some(Sequence::new("a", b"ACGT")));
        let b = tree.add_leaf("b", None);
        let root = tree.add_internal("", &[(a, None), (b, None)]).unwrap();
        tree.set_root(root).unwrap();
        assert!(ProgressiveAligner::default().align_tree(&tree, &matrix).is_err());
    }
}
