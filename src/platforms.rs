use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shard_map::{BenchmarkConfig, ExecutableConfig, RepeatConfig, ShardTarget};

use crate::prelude::*;
use crate::validator::ShardingError;

/// Waterfall a builder reports to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Waterfall {
    #[default]
    Perf,
    Fyi,
    Calibration,
}

/// A performance builder of the catalog.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub num_shards: usize,
    #[serde(default)]
    pub waterfall: Waterfall,
    /// Only used for on-demand bisection, never sharded on the waterfall.
    #[serde(default)]
    pub pinpoint_only: bool,
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkConfig>,
    #[serde(default)]
    pub executables: Vec<ExecutableConfig>,
    #[serde(default)]
    pub repeat_config: RepeatConfig,
}

impl PlatformConfig {
    pub fn is_official(&self) -> bool {
        self.waterfall == Waterfall::Perf
    }

    /// Base of the builder's file names: `Linux Perf` becomes `linux_perf`.
    pub fn file_stem(&self) -> String {
        self.name.replace(' ', "_").to_lowercase()
    }

    pub fn timing_file_path(&self, shard_maps_dir: &Path) -> PathBuf {
        shard_maps_dir
            .join("timing_data")
            .join(format!("{}_timing.json", self.file_stem()))
    }

    pub fn shard_map_path(&self, shard_maps_dir: &Path) -> PathBuf {
        shard_maps_dir.join(format!("{}_map.json", self.file_stem()))
    }

    /// Everything the builder shards, benchmarks first.
    pub fn targets(&self) -> Vec<ShardTarget> {
        self.benchmarks
            .iter()
            .cloned()
            .map(ShardTarget::from)
            .chain(self.executables.iter().cloned().map(ShardTarget::from))
            .collect()
    }

    /// Names of the benchmarks and executables the builder schedules.
    pub fn scheduled_names(&self) -> HashSet<String> {
        self.benchmarks
            .iter()
            .map(|b| b.name.clone())
            .chain(self.executables.iter().map(|e| e.name.clone()))
            .collect()
    }

    /// `benchmark/story` of every story the builder runs, executables included.
    pub fn story_names(&self) -> HashSet<String> {
        self.targets()
            .iter()
            .flat_map(ShardTarget::qualified_story_names)
            .collect()
    }
}

/// Which builders a command works on.
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderSelection {
    /// Official builders.
    Perf,
    /// Builders of the FYI waterfall.
    PerfFyi,
    /// Every builder.
    All,
    /// Builders picked by name.
    Builders(Vec<String>),
}

/// Builders matching `selection`, in catalog order.
///
/// Pinpoint-only builders are only returned when picked by name.
pub fn select_platforms<'a>(
    platforms: &'a [PlatformConfig],
    selection: &BuilderSelection,
) -> Result<Vec<&'a PlatformConfig>> {
    let selected = match selection {
        BuilderSelection::Builders(names) => {
            for name in names {
                if !platforms.iter().any(|p| &p.name == name) {
                    return Err(ShardingError::UnknownBuilder(name.clone()).into());
                }
            }
            platforms
                .iter()
                .filter(|p| names.contains(&p.name))
                .collect()
        }
        waterfall => platforms
            .iter()
            .filter(|p| !p.pinpoint_only)
            .filter(|p| match waterfall {
                BuilderSelection::Perf => p.is_official(),
                BuilderSelection::PerfFyi => p.waterfall == Waterfall::Fyi,
                _ => true,
            })
            .collect(),
    };
    Ok(selected)
}
