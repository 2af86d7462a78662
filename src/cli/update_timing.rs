use clap::Args;

use super::BuilderSelectionArgs;
use crate::config::ShardingConfig;
use crate::helpers::write_atomically;
use crate::platforms::select_platforms;
use crate::prelude::*;
use crate::timing_data::{FETCH_TIMEOUT, fetch_timing_data, filter_timing_file};

#[derive(Args, Debug)]
pub struct UpdateTimingArgs {
    #[command(flatten)]
    pub selection: BuilderSelectionArgs,

    /// Only drop the timing of stories the builders no longer run, without retrieving fresh data
    #[arg(long)]
    pub filter_only: bool,
}

pub async fn run(args: UpdateTimingArgs, config: &ShardingConfig) -> Result<()> {
    let platforms = select_platforms(&config.platforms, &args.selection.selection())?;
    if !args.filter_only {
        fetch_timing_data(config, &platforms, FETCH_TIMEOUT).await?;
    }

    let shard_maps_dir = config.shard_maps_dir();
    let filtered = platforms
        .iter()
        .map(|platform| filter_timing_file(platform, &shard_maps_dir))
        .collect::<Result<Vec<_>>>()?;
    for (platform, filtered) in platforms.iter().zip(filtered) {
        write_atomically(&platform.timing_file_path(&shard_maps_dir), &filtered)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::WaterfallArg;
    use crate::test_utils::{LINUX_TIMING_JSON, Workspace};

    fn filter_only(waterfall: WaterfallArg) -> UpdateTimingArgs {
        UpdateTimingArgs {
            selection: BuilderSelectionArgs {
                builders: vec![],
                waterfall: Some(waterfall),
            },
            filter_only: true,
        }
    }

    #[tokio::test]
    async fn test_filter_only_drops_unknown_stories() {
        let workspace = Workspace::new();
        let stale = LINUX_TIMING_JSON.replacen(
            "[\n",
            "[\n  {\n    \"name\": \"deleted_benchmark/story\",\n    \"duration\": \"3.0\"\n  },\n",
            1,
        );
        workspace.write("timing_data/linux-perf_timing.json", &stale);

        run(filter_only(WaterfallArg::Perf), &workspace.config)
            .await
            .unwrap();

        assert_eq!(
            workspace.read("timing_data/linux-perf_timing.json"),
            LINUX_TIMING_JSON
        );
    }

    #[tokio::test]
    async fn test_filter_only_keeps_aligned_file_byte_identical() {
        let workspace = Workspace::new();

        run(filter_only(WaterfallArg::All), &workspace.config)
            .await
            .unwrap();

        assert_eq!(
            workspace.read("timing_data/linux-perf_timing.json"),
            LINUX_TIMING_JSON
        );
    }

    #[tokio::test]
    async fn test_unreadable_timing_file_leaves_other_files_untouched() {
        let workspace = Workspace::new();
        let stale = LINUX_TIMING_JSON.replacen(
            "[\n",
            "[\n  {\n    \"name\": \"deleted_benchmark/story\",\n    \"duration\": \"3.0\"\n  },\n",
            1,
        );
        workspace.write("timing_data/linux-perf_timing.json", &stale);
        workspace.write("timing_data/android_go_perf_timing.json", "not json");

        let result = run(filter_only(WaterfallArg::All), &workspace.config).await;

        assert!(result.is_err());
        assert_eq!(workspace.read("timing_data/linux-perf_timing.json"), stale);
    }

    #[tokio::test]
    async fn test_failing_fetch_aborts() {
        let workspace = Workspace::new();
        let args = UpdateTimingArgs {
            selection: BuilderSelectionArgs {
                builders: vec!["linux-perf".into()],
                waterfall: None,
            },
            filter_only: false,
        };

        // The catalog's fetch command is `false`
        assert!(run(args, &workspace.config).await.is_err());
        assert_eq!(
            workspace.read("timing_data/linux-perf_timing.json"),
            LINUX_TIMING_JSON
        );
    }
}
