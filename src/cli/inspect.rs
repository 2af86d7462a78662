use clap::Args;
use shard_map::{ShardMap, SimulatedShard, TimingStore, simulate_shard_map};
use tabled::settings::object::{Columns, Rows};
use tabled::settings::panel::Panel;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::BuilderSelectionArgs;
use crate::config::ShardingConfig;
use crate::helpers::format_duration;
use crate::platforms::select_platforms;
use crate::prelude::*;
use crate::timing_data::read_timing_store;

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub selection: BuilderSelectionArgs,
}

#[derive(Tabled)]
struct ShardRow {
    #[tabled(rename = "Shard")]
    shard: String,
    #[tabled(rename = "Stories")]
    stories: usize,
    #[tabled(rename = "Predicted time")]
    predicted_time: String,
}

fn build_shards_table(builder: &str, shards: &[SimulatedShard]) -> String {
    let mut rows: Vec<ShardRow> = shards
        .iter()
        .enumerate()
        .map(|(index, shard)| ShardRow {
            shard: format!("#{index}"),
            stories: shard.stories.len(),
            predicted_time: format_duration(shard.total_time, None),
        })
        .collect();
    rows.push(ShardRow {
        shard: "Total".to_string(),
        stories: shards.iter().map(|shard| shard.stories.len()).sum(),
        predicted_time: format_duration(shards.iter().map(|shard| shard.total_time).sum(), None),
    });

    let mut table = Table::new(rows);
    table
        .with(Panel::header(builder))
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()));
    table.to_string()
}

pub fn run(args: InspectArgs, config: &ShardingConfig) -> Result<()> {
    let shard_maps_dir = config.shard_maps_dir();
    for platform in select_platforms(&config.platforms, &args.selection.selection())? {
        let map_path = platform.shard_map_path(&shard_maps_dir);
        if !map_path.exists() {
            warn!("{} has no shard map", platform.name);
            continue;
        }
        let content = std::fs::read_to_string(&map_path)
            .with_context(|| format!("Failed to read shard map at {}", map_path.display()))?;
        let shard_map = ShardMap::from_json(&content)
            .with_context(|| format!("Failed to parse shard map at {}", map_path.display()))?;

        let timing_path = platform.timing_file_path(&shard_maps_dir);
        let timing = if timing_path.exists() {
            read_timing_store(&timing_path)?
        } else {
            TimingStore::default()
        };

        let shards = simulate_shard_map(&shard_map, &platform.targets(), &timing)
            .with_context(|| format!("Failed to replay the shard map of {}", platform.name))?;
        for (index, shard) in shards.iter().enumerate() {
            for (story, seconds) in &shard.stories {
                trace!("shard #{index}: {story} {}", format_duration(*seconds, None));
            }
        }
        info!("{}\n", build_shards_table(&platform.name, &shards));
    }
    Ok(())
}
