pub mod aligners;
pub mod alignment;
pub mod matrix;
pub mod scoring;
pub mod sequence;
