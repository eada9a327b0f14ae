//! Guide trees for progressive alignment.
//!
//! A [`GuideTree`] stores its nodes in an arena and refers to them by [`NodeIndex`].  Leaves
//! carry the sequence they represent; internal nodes carry their children, each of which records
//! the length of the branch to its parent.  Trees are built bottom-up: leaves are added first,
//! then internal nodes join existing parentless nodes, and finally one node is marked as the
//! root.

pub mod distance;
pub mod neighbor_join;
pub mod newick;

pub use distance::{pairwise_scores, DistanceMatrix, ScoreMatrix};
pub use neighbor_join::{construct_newick, construct_tree};
pub use newick::to_newick;

use anyhow::{bail, ensure, Context, Result};
use derive_getters::Getters;
use itertools::Itertools;

use crate::align::sequence::Sequence;

/// The index of a node within a [`GuideTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single node of a [`GuideTree`].
#[derive(Clone, Debug, PartialEq, Getters)]
pub struct GuideNode {
    /// The label rendered in Newick output; empty for unlabelled internal nodes
    label: String,
    /// The sequence for a leaf, if one was given
    sequence: Option<Sequence>,
    children: Vec<NodeIndex>,
    parent: Option<NodeIndex>,
    /// Length of the branch to the parent
    branch_length: Option<f64>,
}

impl GuideNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GuideTree {
    nodes: Vec<GuideNode>,
    root: Option<NodeIndex>,
}

impl GuideTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn node(&self, index: NodeIndex) -> &GuideNode {
        &self.nodes[index.0]
    }

    /// Adds a leaf with the given label and (optional) sequence.
    pub fn add_leaf(&mut self, label: &str, sequence: Option<Sequence>) -> NodeIndex {
        self.nodes.push(GuideNode {
            label: label.to_string(),
            sequence,
            children: Vec::new(),
            parent: None,
            branch_length: None,
        });
        NodeIndex(self.nodes.len() - 1)
    }

    /// Adds an internal node whose children are the given nodes, each paired with the length of
    /// its branch to the new node.  Each child must exist and not yet have a parent.
    pub fn add_internal(
        &mut self,
        label: &str,
        children: &[(NodeIndex, Option<f64>)],
    ) -> Result<NodeIndex> {
        let parent = NodeIndex(self.nodes.len());
        for (child, _) in children {
            let node = self
                .nodes
                .get(child.0)
                .with_context(|| format!("No node exists with index {}", child.0))?;
            ensure!(node.parent.is_none(), "Node {} already has a parent", child.0);
        }
        ensure!(
            children.iter().map(|(c, _)| c).all_unique(),
            "A node may not be joined to the same parent twice"
        );
        for (child, branch_length) in children {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.branch_length = *branch_length;
        }
        self.nodes.push(GuideNode {
            label: label.to_string(),
            sequence: None,
            children: children.iter().map(|(c, _)| *c).collect(),
            parent: None,
            branch_length: None,
        });
        Ok(parent)
    }

    /// Marks the given parentless node as the root of the tree.
    pub fn set_root(&mut self, index: NodeIndex) -> Result<()> {
        let node = self
            .nodes
            .get(index.0)
            .with_context(|| format!("No node exists with index {}", index.0))?;
        ensure!(node.parent.is_none(), "The root node may not have a parent");
        self.root = Some(index);
        Ok(())
    }

    /// The leaves of the tree, in the order they were added.
    pub fn leaves(&self) -> Vec<NodeIndex> {
        (0..self.nodes.len())
            .filter(|i| self.nodes[*i].is_leaf())
            .map(NodeIndex)
            .collect()
    }

    /// The nodes reachable from the root, children before their parents, with the children of
    /// each node visited in order.
    pub fn post_order(&self) -> Result<Vec<NodeIndex>> {
        let Some(root) = self.root else {
            bail!("The guide tree has no root");
        };
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(root, false)];
        while let Some((index, expanded)) = stack.pop() {
            if expanded {
                order.push(index);
            } else {
                stack.push((index, true));
                for child in self.node(index).children.iter().rev() {
                    stack.push((*child, false));
                }
            }
        }
        Ok(order)
    }

    /// The sum of branch lengths from the node to the root.
    pub fn distance_to_root(&self, index: NodeIndex) -> f64 {
        let mut distance = 0.0;
        let mut current = index;
        while let Some(parent) = self.node(current).parent {
            distance += self.node(current).branch_length.unwrap_or(0.0);
            current = parent;
        }
        distance
    }

    /// The sum of branch lengths on the path between two nodes.
    pub fn path_length(&self, a: NodeIndex, b: NodeIndex) -> Result<f64> {
        let ancestors = self.ancestors(a);
        let common = self
            .ancestors(b)
            .into_iter()
            .find(|n| ancestors.contains(n))
            .with_context(|| format!("Nodes {} and {} are not in the same tree", a.0, b.0))?;
        Ok(self.distance_to_root(a) + self.distance_to_root(b)
            - 2.0 * self.distance_to_root(common))
    }

    /// The node itself followed by each of its ancestors, ending at the top of its tree.
    fn ancestors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut ancestors = vec![index];
        let mut current = index;
        while let Some(parent) = self.node(current).parent {
            ancestors.push(parent);
            current = parent;
        }
        ancestors
    }
}
