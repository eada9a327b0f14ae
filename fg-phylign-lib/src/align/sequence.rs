use std::fmt;

use derive_getters::Getters;

use crate::align::aligners::constants::DEFAULT_GAP_CHARACTER;

/// A named sequence of symbols representing a nucleotide or protein sequence.  The `gapped` flag
/// is set when the sequence contains gap symbols, e.g. after it has been aligned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Getters)]
pub struct Sequence {
    name: String,
    bases: Vec<u8>,
    gapped: bool,
}

impl Sequence {
    /// Creates a new sequence, marking it as gapped if it contains the default gap character.
    pub fn new(name: &str, bases: &[u8]) -> Self {
        Self::with_gap_character(name, bases, DEFAULT_GAP_CHARACTER)
    }

    /// Creates a new sequence, marking it as gapped if it contains the given gap character.
    pub fn with_gap_character(name: &str, bases: &[u8], gap: u8) -> Self {
        Self {
            name: name.to_string(),
            bases: bases.to_vec(),
            gapped: bases.contains(&gap),
        }
    }

    /// Creates a new sequence with no name.
    pub fn unnamed(bases: &[u8]) -> Self {
        Self::new("", bases)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn is_gapped(&self) -> bool {
        self.gapped
    }

    /// Appends a symbol to the end of this sequence.
    pub fn append(&mut self, symbol: u8) {
        self.bases.push(symbol);
    }

    /// Appends a gap symbol to the end of this sequence.
    pub fn append_gap(&mut self, gap: u8) {
        self.bases.push(gap);
        self.gapped = true;
    }

    /// Prepends a symbol to the start of this sequence.
    pub fn prepend(&mut self, symbol: u8) {
        self.bases.insert(0, symbol);
    }

    /// Prepends a gap symbol to the start of this sequence.
    pub fn prepend_gap(&mut self, gap: u8) {
        self.bases.insert(0, gap);
        self.gapped = true;
    }

    /// The symbols of this sequence with gaps removed.
    pub fn ungapped(&self, gap: u8) -> Vec<u8> {
        self.bases.iter().copied().filter(|b| *b != gap).collect()
    }

    /// The symbols as a (lossy) UTF-8 string.
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.bases).to_string()
    }
}

impl std::ops::Index<usize> for Sequence {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bases[index]
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
