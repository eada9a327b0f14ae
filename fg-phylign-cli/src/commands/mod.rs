pub mod command;
pub mod common;
pub mod msa;
pub mod pairwise;
pub mod scores;
pub mod tree;
