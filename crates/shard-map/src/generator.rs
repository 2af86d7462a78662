use anyhow::{Context, bail, ensure};
use itertools::Itertools;
use log::debug;

use crate::benchmark::ShardTarget;
use crate::packer::pack;
use crate::ranges::coalesce_shard;
use crate::repeat::{RepeatConfig, ResolvedRepeats};
use crate::shard_map::ShardMap;
use crate::stats::ShardStats;
use crate::timing::TimingStore;
use crate::timing_list::TimingLists;

/// A freshly generated shard map and the prediction it was built from.
#[derive(Debug, Clone)]
pub struct ShardingResult {
    pub shard_map: ShardMap,
    pub stats: ShardStats,
}

/// Build the shard map of a builder.
///
/// `targets` are the builder's benchmarks and executables in any order; they
/// are sorted by name first so that the result only depends on the inputs.
pub fn generate_shard_map(
    mut targets: Vec<ShardTarget>,
    timing: &TimingStore,
    repeat_config: &RepeatConfig,
    num_shards: usize,
    debug: bool,
) -> anyhow::Result<ShardingResult> {
    ensure!(num_shards > 0, "A builder needs at least one shard");

    targets.sort_by(|a, b| a.name().cmp(b.name()));
    if let Some(name) = targets.iter().map(ShardTarget::name).duplicates().next() {
        bail!("{name} is scheduled twice");
    }

    let repeats = ResolvedRepeats::resolve(repeat_config, &targets, num_shards);
    let lists = TimingLists::assemble(&targets, &timing.durations(), &repeats);
    let num_stories = lists.total_stories(&repeats);
    debug!(
        "Sharding {num_stories} story runs ({:.0}s) on {num_shards} shards",
        lists.total_time(&repeats)
    );

    let packed = pack(&lists, &repeats, num_shards);
    let shards = packed
        .iter()
        .enumerate()
        .map(|(index, shard)| {
            coalesce_shard(shard.all_stories(), &targets)
                .with_context(|| format!("Failed to build shard {index}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let stats = ShardStats::from_packed(num_stories, &packed);
    let shard_map = ShardMap {
        shards,
        extra_infos: Some(stats.to_extra_infos(debug)),
    };
    Ok(ShardingResult { shard_map, stats })
}
