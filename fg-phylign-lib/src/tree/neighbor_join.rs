use anyhow::{ensure, Result};
use itertools::Itertools;
use log::debug;

use crate::{
    align::sequence::Sequence,
    tree::{distance::DistanceMatrix, newick::to_newick, GuideTree, NodeIndex},
};

/// Builds a guide tree over the given sequences by Neighbor-Joining.  Leaves are added to the
/// tree in the order of `sequences`, labelled by the sequence names.
pub fn construct_tree(distances: &DistanceMatrix, sequences: &[Sequence]) -> Result<GuideTree> {
    let leaves = sequences.iter().map(|s| (s.name().as_str(), Some(s.clone()))).collect_vec();
    neighbor_join(distances, leaves)
}

/// Builds a Neighbor-Joining tree over the named taxa and renders it in Newick format.
pub fn construct_newick(distances: &DistanceMatrix, names: &[String]) -> Result<String> {
    let leaves = names.iter().map(|n| (n.as_str(), None)).collect_vec();
    to_newick(&neighbor_join(distances, leaves)?)
}

/// The pair of active clusters, `i < j`, that minimises
/// `Q(i,j) = (N-2)d(i,j) - R(i) - C(j)` where `R` and `C` are row and column sums.  The first
/// minimum found scanning `i` then `j` in increasing order wins ties.
fn closest_pair(distances: &DistanceMatrix, row_sums: &[f64], column_sums: &[f64]) -> (usize, usize) {
    let n = distances.size();
    let factor = (n - 2) as f64;
    let mut best = (f64::INFINITY, 0, 1);
    for i in 0..n {
        for j in (i + 1)..n {
            let q = factor * distances.get(i, j) - row_sums[i] - column_sums[j];
            if q < best.0 {
                best = (q, i, j);
            }
        }
    }
    (best.1, best.2)
}

fn neighbor_join(
    distances: &DistanceMatrix,
    leaves: Vec<(&str, Option<Sequence>)>,
) -> Result<GuideTree> {
    ensure!(
        distances.size() >= 2,
        "Neighbor-Joining requires at least a 2x2 distance matrix, found {}x{}",
        distances.size(),
        distances.size()
    );
    ensure!(
        distances.size() == leaves.len(),
        "Distance matrix has {} rows but {} sequences were given",
        distances.size(),
        leaves.len()
    );

    let mut tree = GuideTree::new();
    let mut active: Vec<NodeIndex> =
        leaves.into_iter().map(|(label, sequence)| tree.add_leaf(label, sequence)).collect();
    let mut distances = distances.clone();

    while active.len() > 2 {
        let n = active.len();
        let row_sums = (0..n).map(|i| distances.sum_row(i)).collect_vec();
        let column_sums = (0..n).map(|j| distances.sum_column(j)).collect_vec();
        let (i, j) = closest_pair(&distances, &row_sums, &column_sums);

        let dij = distances.get(i, j);
        let branch_i = dij / 2.0 + (row_sums[i] - row_sums[j]) / (2.0 * (n - 2) as f64);
        let branch_j = dij - branch_i;
        let merged = (0..n)
            .filter(|k| *k != i && *k != j)
            .map(|k| (distances.get(i, k) + distances.get(j, k) - dij) / 2.0)
            .collect_vec();

        let parent =
            tree.add_internal("", &[(active[i], Some(branch_i)), (active[j], Some(branch_j))])?;
        debug!(
            "Joined nodes {} and {} (branch lengths {:.4} and {:.4}) into node {}",
            active[i].index(),
            active[j].index(),
            branch_i,
            branch_j,
            parent.index()
        );

        distances = distances.remap(i, j, &merged)?;
        active = active
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != i && *k != j)
            .map(|(_, node)| *node)
            .chain(std::iter::once(parent))
            .collect();
    }

    let half = distances.get(0, 1) / 2.0;
    let root = tree.add_internal("", &[(active[0], Some(half)), (active[1], Some(half))])?;
    tree.set_root(root)?;
    Ok(tree)
}

#[cfg(test)]
pub mod tests {
    use super::{construct_newick, construct_tree};
    use crate::{
        align::sequence::Sequence,
        tree::distance::DistanceMatrix,
    };
    use itertools::Itertools;
    use rstest::rstest;

    fn names(labels: &str) -> Vec<String> {
        labels.chars().map(|c| c.to_string()).collect()
    }

    /// Distances from the tree `((A:2,B:3):1,(C:4,D:5))`
    fn additive() -> DistanceMatrix {
        DistanceMatrix::new(&[
            vec![0.0, 5.0, 7.0, 8.0],
            vec![5.0, 0.0, 8.0, 9.0],
            vec![7.0, 8.0, 0.0, 9.0],
            vec![8.0, 9.0, 9.0, 0.0],
        ])
        .unwrap()
    }

    fn six_taxa() -> DistanceMatrix {
        DistanceMatrix::new(&[
            vec![0.0, 5.0, 4.0, 7.0, 6.0, 8.0],
            vec![5.0, 0.0, 7.0, 10.0, 9.0, 11.0],
            vec![4.0, 7.0, 0.0, 7.0, 6.0, 8.0],
            vec![7.0, 10.0, 7.0, 0.0, 5.0, 9.0],
            vec![6.0, 9.0, 6.0, 5.0, 0.0, 8.0],
            vec![8.0, 11.0, 8.0, 9.0, 8.0, 0.0],
        ])
        .unwrap()
    }

    #[rstest]
    fn test_additive_distances_are_reproduced() {
        for distances in [additive(), six_taxa()] {
            let sequences = (0..distances.size())
                .map(|i| Sequence::new(&format!("s{i}"), b"ACGT"))
                .collect_vec();
            let tree = construct_tree(&distances, &sequences).unwrap();
            let leaves = tree.leaves();
            assert_eq!(leaves.len(), distances.size());
            for (i, j) in (0..leaves.len()).tuple_combinations() {
                let length = tree.path_length(leaves[i], leaves[j]).unwrap();
                assert!((length - distances.get(i, j)).abs() < 1e-9, "({i}, {j}): {length}");
            }
        }
    }

    #[rstest]
    fn test_tree_shape() {
        let sequences = names("ABCD").iter().map(|n| Sequence::new(n, b"ACGT")).collect_vec();
        let tree = construct_tree(&additive(), &sequences).unwrap();
        assert_eq!(tree.len(), 7);
        let root = tree.node(tree.root().unwrap());
        assert_eq!(root.children().len(), 2);
        for leaf in tree.leaves() {
            let node = tree.node(leaf);
            assert_eq!(node.sequence().as_ref().map(|s| s.name()), Some(node.label()));
        }
        for node in tree.post_order().unwrap() {
            assert!(matches!(tree.node(node).children().len(), 0 | 2));
        }
    }

    #[rstest]
    #[case(additive(), "ABCD", "((A:2,B:3):0.5,(C:4,D:5):0.5);")]
    #[case(six_taxa(), "ABCDEF", "((D:3,E:2):0.5,(F:5,(C:2,(A:1,B:4):1):1):0.5);")]
    fn test_construct_newick(
        #[case] distances: DistanceMatrix,
        #[case] labels: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(construct_newick(&distances, &names(labels)).unwrap(), expected);
    }

    #[rstest]
    fn test_two_and_three_taxa() {
        let two = DistanceMatrix::new(&[vec![0.0, 3.0], vec![3.0, 0.0]]).unwrap();
        assert_eq!(construct_newick(&two, &names("xy")).unwrap(), "(x:1.5,y:1.5);");

        let three =
            DistanceMatrix::new(&[vec![0.0, 2.0, 4.0], vec![2.0, 0.0, 4.0], vec![4.0, 4.0, 0.0]])
                .unwrap();
        assert_eq!(construct_newick(&three, &names("abc")).unwrap(), "(c:1.5,(a:1,b:1):1.5);");
    }

    #[rstest]
    fn test_invalid_inputs() {
        let one = DistanceMatrix::new(&[vec![0.0]]).unwrap();
        assert!(construct_newick(&one, &names("a")).is_err());
        assert!(construct_newick(&additive(), &names("ABC")).is_err());
    }
}
