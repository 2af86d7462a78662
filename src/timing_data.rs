use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use futures::future::try_join_all;
use shard_map::{TimingStore, to_pretty_json};
use tokio::process::Command;

use crate::config::{ShardingConfig, TimingFetchConfig};
use crate::helpers::write_atomically;
use crate::platforms::PlatformConfig;
use crate::prelude::*;
use crate::validator::ShardingError;

/// Upper bound for fetching the timing data of all builders.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

pub fn read_timing_store(path: &Path) -> Result<TimingStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read timing data at {}", path.display()))?;
    TimingStore::from_json(&content)
        .with_context(|| format!("Failed to parse timing data at {}", path.display()))
}

/// The builder's timing file with the records of stories it no longer runs
/// removed, serialized the way it is committed.
pub fn filter_timing_file(platform: &PlatformConfig, shard_maps_dir: &Path) -> Result<String> {
    let mut timing = read_timing_store(&platform.timing_file_path(shard_maps_dir))?;
    let dropped = timing.retain_known(&platform.story_names());
    for record in &dropped {
        debug!("{}: dropping timing of {}", platform.name, record.name);
    }
    to_pretty_json(&timing)
}

/// Fetch fresh timing data of every builder in `platforms` and overwrite
/// their timing files. Fails on the first builder whose fetch fails.
pub async fn fetch_timing_data(
    config: &ShardingConfig,
    platforms: &[&PlatformConfig],
    timeout: Duration,
) -> Result<()> {
    start_group!("Updating shards timing data, this may take a while");
    let shard_maps_dir = config.shard_maps_dir();
    let fetches = platforms.iter().map(|platform| {
        fetch_builder_timing(
            &config.timing_fetch,
            &config.base_dir,
            platform,
            &shard_maps_dir,
        )
    });
    let result = tokio::time::timeout(timeout, try_join_all(fetches)).await;
    end_group!();

    result.map_err(|_| ShardingError::FetchTimeout(timeout))??;
    Ok(())
}

fn fetch_command(fetch: &TimingFetchConfig, builder: &str) -> Result<Vec<String>> {
    let days = fetch.num_last_days.to_string();
    let command = shell_words::split(&fetch.command)
        .with_context(|| format!("Failed to parse command: {}", fetch.command))?
        .into_iter()
        .map(|arg| arg.replace("{builder}", builder).replace("{days}", &days))
        .collect::<Vec<_>>();
    ensure!(!command.is_empty(), "The timing fetch command is empty");
    Ok(command)
}

async fn fetch_builder_timing(
    fetch: &TimingFetchConfig,
    working_dir: &Path,
    platform: &PlatformConfig,
    shard_maps_dir: &Path,
) -> Result<()> {
    let command = fetch_command(fetch, &platform.name)?;
    debug!("Running {}", shell_words::join(&command));

    let output = Command::new(&command[0])
        .args(&command[1..])
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to execute command: {}", command[0]))?;

    if !output.status.success() {
        return Err(ShardingError::RuntimeFetchFailure {
            builder: platform.name.clone(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut timing = TimingStore::from_json(&stdout)
        .with_context(|| format!("Invalid timing data fetched for {}", platform.name))?;
    timing.push_executable_estimates(&platform.executables);

    write_atomically(
        &platform.timing_file_path(shard_maps_dir),
        &to_pretty_json(&timing)?,
    )?;
    info!(
        "Finished retrieving story timing data for {}",
        platform.name
    );
    Ok(())
}
