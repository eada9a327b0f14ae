pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{command::Command, msa::Msa, pairwise::Pairwise, scores::Scores, tree::Tree};
use enum_dispatch::enum_dispatch;
use env_logger::Env;
use phylign::util::version::built_info;

#[derive(Parser, Debug)]
#[command(version = built_info::VERSION.as_str())]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
#[command(version = built_info::VERSION.as_str())]
enum Subcommand {
    Pairwise(Pairwise),
    Scores(Scores),
    Tree(Tree),
    Msa(Msa),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args: Args = Args::parse();
    args.subcommand.execute()
}
