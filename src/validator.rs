use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use shard_map::ShardMap;

use crate::config::ShardingConfig;
use crate::platforms::{BuilderSelection, select_platforms};
use crate::prelude::*;
use crate::timing_data::filter_timing_file;

#[derive(Debug, thiserror::Error)]
pub enum ShardingError {
    #[error(
        "Benchmark {benchmark} is supposed to be scheduled on builder {builder} according to the \
         catalog, but it is not yet scheduled. If this is a new benchmark, rename it to \
         UNSCHEDULED_{benchmark} until it gets scheduled."
    )]
    CatalogDriftUnscheduled { benchmark: String, builder: String },

    #[error(
        "Benchmark {benchmark} is scheduled on shard map {}, but the catalog says that it should \
         not be on that shard map. If the benchmark was deleted, run `perf-sharding deschedule` \
         to remove it from the shard map.",
        .path.display()
    )]
    CatalogDriftStale { benchmark: String, path: PathBuf },

    #[error(
        "Benchmark {benchmark} is an official benchmark, but it is not scheduled to run \
         anywhere. Rename it to UNSCHEDULED_{benchmark}."
    )]
    CatalogDriftOfficialUnscheduled { benchmark: String },

    #[error(
        "{} is not up to date. Run `perf-sharding update-timing --filter-only` to regenerate it.",
        .path.display()
    )]
    TimingDrift { path: PathBuf },

    #[error("{} could not be checked: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Builder {builder} does not have a shard map at {}.", .path.display())]
    MissingPlatformShardMap { builder: String, path: PathBuf },

    #[error("Failed to retrieve story timing data for {builder}: {stderr}")]
    RuntimeFetchFailure { builder: String, stderr: String },

    #[error("Retrieving story timing data did not finish within {}s", .0.as_secs())]
    FetchTimeout(Duration),

    #[error("Unknown builder {0}")]
    UnknownBuilder(String),
}

/// Check that timing data, shard maps and the catalog agree with each other.
///
/// Returns every inconsistency found. Pinpoint-only builders are not checked.
pub fn validate_shard_maps(config: &ShardingConfig) -> Result<Vec<ShardingError>> {
    let mut errors = vec![];
    let shard_maps_dir = config.shard_maps_dir();
    let platforms = select_platforms(&config.platforms, &BuilderSelection::All)?;

    for platform in &platforms {
        let path = platform.timing_file_path(&shard_maps_dir);
        if !path.exists() {
            errors.push(ShardingError::TimingDrift { path });
            continue;
        }
        let checked = filter_timing_file(platform, &shard_maps_dir).and_then(|filtered| {
            let committed = std::fs::read(&path)
                .with_context(|| format!("Failed to read timing data at {}", path.display()))?;
            Ok(committed == filtered.as_bytes())
        });
        match checked {
            Ok(true) => {}
            Ok(false) => errors.push(ShardingError::TimingDrift { path }),
            Err(err) => errors.push(unreadable(path, err)),
        }
    }

    let mut scheduled_anywhere = BTreeSet::new();
    let mut every_map_read = true;
    for platform in &platforms {
        let path = platform.shard_map_path(&shard_maps_dir);
        if !path.exists() {
            errors.push(ShardingError::MissingPlatformShardMap {
                builder: platform.name.clone(),
                path,
            });
            continue;
        }
        let on_shard_map = match read_shard_map(&path) {
            Ok(shard_map) => shard_map.scheduled_names(),
            Err(err) => {
                errors.push(unreadable(path, err));
                every_map_read = false;
                continue;
            }
        };
        let in_catalog = platform.scheduled_names();

        let mut unscheduled: Vec<_> = in_catalog
            .iter()
            .filter(|name| !on_shard_map.contains(*name))
            .collect();
        unscheduled.sort();
        for benchmark in unscheduled {
            errors.push(ShardingError::CatalogDriftUnscheduled {
                benchmark: benchmark.clone(),
                builder: platform.name.clone(),
            });
        }
        for benchmark in on_shard_map.iter().filter(|name| !in_catalog.contains(*name)) {
            errors.push(ShardingError::CatalogDriftStale {
                benchmark: benchmark.clone(),
                path: path.clone(),
            });
        }

        scheduled_anywhere.extend(on_shard_map);
    }

    // An unreadable map may hold any official benchmark
    if !every_map_read {
        return Ok(errors);
    }
    for benchmark in config.scheduled_official_benchmarks() {
        if !scheduled_anywhere.contains(benchmark) {
            errors.push(ShardingError::CatalogDriftOfficialUnscheduled {
                benchmark: benchmark.to_string(),
            });
        }
    }

    Ok(errors)
}

fn read_shard_map(path: &Path) -> Result<ShardMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read shard map at {}", path.display()))?;
    ShardMap::from_json(&content)
        .with_context(|| format!("Failed to parse shard map at {}", path.display()))
}

fn unreadable(path: PathBuf, err: Error) -> ShardingError {
    ShardingError::Unreadable {
        path,
        reason: format!("{err:#}"),
    }
}
