use anyhow::Result;
use clap::builder::PossibleValue;
use enum_dispatch::enum_dispatch;
use phylign::align::aligners::AlignmentMode;
use std::{fmt::Display, str::FromStr};

#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self) -> Result<()>;
}

/// An enum whose variants may be given on the command line by their display names.
pub trait ValueEnum: Display + FromStr {
    fn variants<'a>() -> &'a [Self];

    fn possible_values() -> Vec<PossibleValue> {
        Self::variants()
            .iter()
            .map(|variant| PossibleValue::new(variant.to_string()))
            .collect()
    }
}

impl ValueEnum for AlignmentMode {
    fn variants<'a>() -> &'a [Self] {
        &[Self::Global, Self::Local]
    }
}
