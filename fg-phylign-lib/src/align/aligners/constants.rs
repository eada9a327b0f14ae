use anyhow::{anyhow, Error};
use std::{fmt::Display, str::FromStr};

/// Value to use as a 'negative infinity' score. Should be close to `i32::MIN`,
/// but avoid underflow when used with reasonable scoring parameters or even
/// adding two negative infinities. Use ~ `0.4 * i32::MIN`
pub const MIN_SCORE: i32 = -858_993_459;

/// The symbol used to denote a gap when the substitution matrix does not specify one.
pub const DEFAULT_GAP_CHARACTER: u8 = b'-';

/// The gap penalty used by the linear aligner when none is given.
pub const DEFAULT_GAP_PENALTY: i32 = -1;

/// The gap open penalty used by the affine aligner when none is given.
pub const DEFAULT_OPEN_GAP_PENALTY: i32 = -4;

/// The gap extend penalty used by the affine aligner when none is given.
pub const DEFAULT_EXTEND_GAP_PENALTY: i32 = -1;

/// Alignment operations supported are match, substitution, insertion and deletion, relative to
/// the first sequence (`x`) being aligned to the second sequence (`y`).
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash)]
pub enum AlignmentOperation {
    Match, // Consumes one x and one y symbol, which are identical
    Subst, // Consumes one x and one y symbol, which differ
    Del,   // Consumes a single x symbol, a gap is placed in y
    Ins,   // Consumes a single y symbol, a gap is placed in x
}

impl AlignmentOperation {
    /// The CIGAR-style code for this operation.
    pub fn as_char(&self) -> char {
        match *self {
            AlignmentOperation::Match => '=',
            AlignmentOperation::Subst => 'X',
            AlignmentOperation::Del => 'D',
            AlignmentOperation::Ins => 'I',
        }
    }

    pub fn length_on_x(&self) -> usize {
        match *self {
            AlignmentOperation::Match | AlignmentOperation::Subst | AlignmentOperation::Del => 1,
            AlignmentOperation::Ins => 0,
        }
    }

    pub fn length_on_y(&self) -> usize {
        match *self {
            AlignmentOperation::Match | AlignmentOperation::Subst | AlignmentOperation::Ins => 1,
            AlignmentOperation::Del => 0,
        }
    }
}

/// The modes of alignment supported by the linear aligner.  Global alignment (Needleman-Wunsch)
/// forces the alignment to span both sequences end to end, while local alignment
/// (Smith-Waterman) finds the highest scoring pair of sub-sequences.
///
/// The default alignment mode is Global.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub enum AlignmentMode {
    /// Aligns the full first sequence versus the full second sequence.
    #[default]
    Global,
    /// Aligns a sub-sequence of the first sequence versus a sub-sequence of the second sequence.
    Local,
}

impl AlignmentMode {
    pub fn is_global(&self) -> bool {
        matches!(self, AlignmentMode::Global)
    }
}

impl Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl FromStr for AlignmentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" | "needleman-wunsch" | "nw" => Ok(AlignmentMode::Global),
            "local" | "smith-waterman" | "sw" => Ok(AlignmentMode::Local),
            _ => Err(anyhow!("Invalid alignment mode: {}", s)),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::AlignmentMode;
    use rstest::rstest;

    #[rstest]
    #[case("global", AlignmentMode::Global)]
    #[case("GLOBAL", AlignmentMode::Global)]
    #[case("nw", AlignmentMode::Global)]
    #[case("local", AlignmentMode::Local)]
    #[case("Smith-Waterman", AlignmentMode::Local)]
    fn test_mode_from_str(#[case] value: &str, #[case] expected: AlignmentMode) {
        assert_eq!(value.parse::<AlignmentMode>().unwrap(), expected);
    }

    #[rstest]
    fn test_mode_round_trips_through_display() {
        for mode in [AlignmentMode::Global, AlignmentMode::Local] {
            assert_eq!(mode.to_string().parse::<AlignmentMode>().unwrap(), mode);
        }
        assert!("semi-global".parse::<AlignmentMode>().is_err());
    }
}
