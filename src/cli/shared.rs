use std::io::{BufRead, Write};

use clap::{Args, ValueEnum};
use console::style;

use crate::platforms::BuilderSelection;
use crate::prelude::*;

const REGENERATION_WARNING: &str = "\
This will regenerate the sharding maps for perf benchmarks. Note that this
will shuffle all the benchmarks on the shards, which can cause false
regressions. In general this operation should only be done when the shards
are too unbalanced or when benchmarks are added/removed. In addition, this
is a tricky operation and should always be reviewed by the benchmarking
team. Upon landing the change updating the shard maps, notify the perf
sheriffs and put a warning about expected false regressions in the change
description.";

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum WaterfallArg {
    /// Official builders
    Perf,
    /// Builders of the FYI waterfall
    PerfFyi,
    /// Every builder
    All,
}

/// Builder selection shared by the commands working on a subset of builders
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct BuilderSelectionArgs {
    /// The builder names to use, can be repeated
    #[arg(long, short)]
    pub builders: Vec<String>,

    /// The waterfall whose builders should be used.
    /// If neither this nor --builders is provided, every builder is used.
    #[arg(long, short, value_enum)]
    pub waterfall: Option<WaterfallArg>,
}

impl BuilderSelectionArgs {
    pub fn selection(&self) -> BuilderSelection {
        if !self.builders.is_empty() {
            return BuilderSelection::Builders(self.builders.clone());
        }
        match self.waterfall {
            Some(WaterfallArg::Perf) => BuilderSelection::Perf,
            Some(WaterfallArg::PerfFyi) => BuilderSelection::PerfFyi,
            Some(WaterfallArg::All) | None => BuilderSelection::All,
        }
    }
}

/// Ask for confirmation before reshuffling the shards. Only `y` confirms.
pub(crate) fn confirm_regeneration(input: &mut impl BufRead) -> Result<bool> {
    println!("{}\n", style(REGENERATION_WARNING).yellow());
    print!("Enter 'y' to continue: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']) == "y")
}
