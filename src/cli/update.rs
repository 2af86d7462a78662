use std::io::BufRead;
use std::path::Path;

use clap::Args;
use shard_map::{ShardingResult, TimingStore, generate_shard_map};

use super::{BuilderSelectionArgs, confirm_regeneration};
use crate::config::ShardingConfig;
use crate::helpers::{format_duration, write_atomically};
use crate::platforms::{PlatformConfig, select_platforms};
use crate::prelude::*;
use crate::timing_data::{FETCH_TIMEOUT, fetch_timing_data, read_timing_store};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub selection: BuilderSelectionArgs,

    /// Shard with the committed timing data instead of retrieving fresh data
    #[arg(long, short = 'o')]
    pub use_existing_timing_data: bool,

    /// Record the predicted time of every story in the `extra_infos` of the shard maps
    #[arg(long)]
    pub debug: bool,
}

pub async fn run(args: UpdateArgs, config: &ShardingConfig, input: &mut impl BufRead) -> Result<()> {
    if !confirm_regeneration(input)? {
        info!("Abort updating shard maps for benchmarks on perf waterfall");
        return Ok(());
    }

    let platforms = select_platforms(&config.platforms, &args.selection.selection())?;
    if !args.use_existing_timing_data {
        fetch_timing_data(config, &platforms, FETCH_TIMEOUT).await?;
    }

    let shard_maps_dir = config.shard_maps_dir();
    let mut generated = Vec::with_capacity(platforms.len());
    for platform in platforms {
        start_group!(format!(
            "Sharding {} on {} shards",
            platform.name, platform.num_shards
        ));
        let result = generate_shard_map_for(platform, &shard_maps_dir, args.debug);
        end_group!();
        generated.push((platform, result?));
    }

    for (platform, result) in &generated {
        write_shard_map(platform, &shard_maps_dir, result)?;
        info!("Updated sharding map for {}", platform.name);
    }
    Ok(())
}

/// Shard `platform` from its timing file without touching its shard map.
pub(crate) fn generate_shard_map_for(
    platform: &PlatformConfig,
    shard_maps_dir: &Path,
    debug: bool,
) -> Result<ShardingResult> {
    let timing_path = platform.timing_file_path(shard_maps_dir);
    let timing = if timing_path.exists() {
        read_timing_store(&timing_path)?
    } else {
        warn!(
            "No timing data for {}, every story is priced at the default duration",
            platform.name
        );
        TimingStore::default()
    };

    let result = generate_shard_map(
        platform.targets(),
        &timing,
        &platform.repeat_config,
        platform.num_shards,
        debug,
    )
    .with_context(|| format!("Failed to shard {}", platform.name))?;

    if let (Some((_, min_time)), Some((_, max_time))) =
        (result.stats.min_shard(), result.stats.max_shard())
    {
        debug!(
            "{}: {} stories on {} shards, from {} to {} per shard",
            platform.name,
            result.stats.num_stories,
            platform.num_shards,
            format_duration(min_time, None),
            format_duration(max_time, None)
        );
    }
    Ok(result)
}

pub(crate) fn write_shard_map(
    platform: &PlatformConfig,
    shard_maps_dir: &Path,
    result: &ShardingResult,
) -> Result<()> {
    write_atomically(
        &platform.shard_map_path(shard_maps_dir),
        &result.shard_map.to_json()?,
    )
}

/// Regenerate and write the shard map of `platform` from its timing file.
pub(crate) fn update_shard_map(
    platform: &PlatformConfig,
    shard_maps_dir: &Path,
    debug: bool,
) -> Result<ShardingResult> {
    let result = generate_shard_map_for(platform, shard_maps_dir, debug)?;
    write_shard_map(platform, shard_maps_dir, &result)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use shard_map::ShardMap;

    use super::*;
    use crate::test_utils::Workspace;

    fn args(builders: &[&str]) -> UpdateArgs {
        UpdateArgs {
            selection: BuilderSelectionArgs {
                builders: builders.iter().map(|b| b.to_string()).collect(),
                waterfall: None,
            },
            use_existing_timing_data: true,
            debug: false,
        }
    }

    #[tokio::test]
    async fn test_update_writes_shard_maps() {
        let workspace = Workspace::new();

        run(args(&[]), &workspace.config, &mut "y\n".as_bytes())
            .await
            .unwrap();

        let linux = ShardMap::from_json(&workspace.read("linux-perf_map.json")).unwrap();
        assert_eq!(linux.num_shards(), 2);
        let speedometer_shards = linux
            .shards
            .iter()
            .filter(|shard| shard.benchmarks.contains_key("speedometer2"))
            .count();
        assert_eq!(speedometer_shards, 2);

        let android = workspace.read("android_go_perf_map.json");
        insta::assert_snapshot!(android.trim_end(), @r###"
        {
          "0": {
            "benchmarks": {
              "blink_perf.css": {
                "abridged": true
              }
            }
          },
          "extra_infos": {
            "num_stories": 2,
            "predicted_min_shard_time": 50.0,
            "predicted_min_shard_index": 0,
            "predicted_max_shard_time": 50.0,
            "predicted_max_shard_index": 0,
            "shard #0": 50.0
          }
        }
        "###);
        assert!(!workspace.path("pinpoint-perf_map.json").exists());
    }

    #[tokio::test]
    async fn test_declined_prompt_changes_nothing() {
        let workspace = Workspace::new();

        run(args(&[]), &workspace.config, &mut "n\n".as_bytes())
            .await
            .unwrap();

        assert!(!workspace.path("linux-perf_map.json").exists());
        assert!(!workspace.path("android_go_perf_map.json").exists());
    }

    #[tokio::test]
    async fn test_update_twice_is_byte_identical() {
        let workspace = Workspace::new();

        run(args(&["linux-perf"]), &workspace.config, &mut "y\n".as_bytes())
            .await
            .unwrap();
        let first = workspace.read("linux-perf_map.json");
        run(args(&["linux-perf"]), &workspace.config, &mut "y\n".as_bytes())
            .await
            .unwrap();

        assert_eq!(workspace.read("linux-perf_map.json"), first);
        assert!(!workspace.path("android_go_perf_map.json").exists());
    }

    #[tokio::test]
    async fn test_generation_error_leaves_every_shard_map_untouched() {
        let workspace = Workspace::new();
        run(args(&[]), &workspace.config, &mut "y\n".as_bytes())
            .await
            .unwrap();
        let linux_before = workspace.read("linux-perf_map.json");
        let android_before = workspace.read("android_go_perf_map.json");

        // linux-perf is sharded first and would succeed on its own
        workspace.write(
            "timing_data/linux-perf_timing.json",
            &crate::test_utils::LINUX_TIMING_JSON.replace("\"20.0\"", "\"7.0\""),
        );
        workspace.write("timing_data/android_go_perf_timing.json", "not json");

        let result = run(args(&[]), &workspace.config, &mut "y\n".as_bytes()).await;

        assert!(result.is_err());
        assert_eq!(workspace.read("linux-perf_map.json"), linux_before);
        assert_eq!(workspace.read("android_go_perf_map.json"), android_before);
    }

    #[tokio::test]
    async fn test_generation_error_on_first_update_writes_nothing() {
        let workspace = Workspace::new();
        workspace.write("timing_data/android_go_perf_timing.json", "not json");

        let result = run(args(&[]), &workspace.config, &mut "y\n".as_bytes()).await;

        assert!(result.is_err());
        assert!(!workspace.path("linux-perf_map.json").exists());
    }

    #[test]
    fn test_missing_timing_file_uses_default_durations() {
        let workspace = Workspace::new();
        let platform = workspace.platform("pinpoint-perf");

        let result = update_shard_map(platform, &workspace.config.shard_maps_dir(), true).unwrap();

        assert_eq!(result.stats.total_time(), 10.0);
        let extra_infos = result.shard_map.extra_infos.unwrap();
        assert_eq!(
            extra_infos["shard #0"],
            serde_json::json!({"octane/Octane": 10.0, "predicted_total_time": 10.0})
        );
    }
}
