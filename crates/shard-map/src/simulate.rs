use std::collections::HashMap;

use anyhow::Context;

use crate::benchmark::ShardTarget;
use crate::ranges::expand_shard;
use crate::shard_map::ShardMap;
use crate::timing::{DEFAULT_STORY_DURATION, TimingStore};
use crate::timing_list::gather_timing_list;

/// Predicted run of one shard of an existing map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedShard {
    /// `(benchmark/story, seconds)` in the order the shard runs them.
    pub stories: Vec<(String, f64)>,
    pub total_time: f64,
}

/// Replay `shard_map` against `timing`, pricing every story it schedules.
///
/// Stories are priced once each, without page-set repeats.
pub fn simulate_shard_map(
    shard_map: &ShardMap,
    targets: &[ShardTarget],
    timing: &TimingStore,
) -> anyhow::Result<Vec<SimulatedShard>> {
    let prices: HashMap<String, f64> =
        gather_timing_list(targets, &timing.durations(), false)
            .into_iter()
            .collect();

    shard_map
        .shards
        .iter()
        .enumerate()
        .map(|(index, assignment)| {
            let mut shard = SimulatedShard::default();
            for story in expand_shard(assignment, targets)
                .with_context(|| format!("Failed to expand shard {index}"))?
            {
                let seconds = prices
                    .get(&story)
                    .copied()
                    .unwrap_or(DEFAULT_STORY_DURATION);
                shard.total_time += seconds;
                shard.stories.push((story, seconds));
            }
            Ok(shard)
        })
        .collect()
}
