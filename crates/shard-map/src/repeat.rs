use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::benchmark::{ShardTarget, qualified_name};

/// How many distinct shards a benchmark, or some of its stories, must run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepeatSpec {
    /// Run the whole benchmark on K distinct shards.
    Whole(u32),
    /// Run each listed story on K distinct shards.
    Stories(IndexMap<String, u32>),
}

/// Per-builder repeat requirements, keyed by benchmark name.
pub type RepeatConfig = IndexMap<String, RepeatSpec>;

/// Repeat requirements restricted to the builder's catalog and clamped to its
/// shard count. Only counts greater than one are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRepeats {
    /// Benchmark name to number of shards.
    pub benchmarks: IndexMap<String, usize>,
    /// `benchmark/story` to number of shards.
    pub stories: IndexMap<String, usize>,
}

impl ResolvedRepeats {
    pub fn resolve(config: &RepeatConfig, targets: &[ShardTarget], num_shards: usize) -> Self {
        let mut resolved = ResolvedRepeats::default();

        for (benchmark, spec) in config {
            let Some(target) = targets.iter().find(|t| t.name() == benchmark) else {
                debug!("Ignoring repeat config of {benchmark}, not scheduled on this builder");
                continue;
            };

            match spec {
                RepeatSpec::Whole(count) => {
                    let repeats = clamp_repeats(benchmark, *count, num_shards);
                    if repeats > 1 {
                        resolved.benchmarks.insert(benchmark.clone(), repeats);
                    }
                }
                RepeatSpec::Stories(stories) => {
                    for (story, count) in stories {
                        let name = qualified_name(benchmark, story);
                        if target.story_index(story).is_none() {
                            warn!("Ignoring repeat config of {name}, no such story");
                            continue;
                        }
                        let repeats = clamp_repeats(&name, *count, num_shards);
                        if repeats > 1 {
                            resolved.stories.insert(name, repeats);
                        }
                    }
                }
            }
        }

        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty() && self.stories.is_empty()
    }

    /// Number of whole-benchmark rounds needed.
    pub fn max_benchmark_repeats(&self) -> usize {
        self.benchmarks.values().copied().max().unwrap_or(0)
    }

    /// Largest per-story repeat count, i.e. the number of leading shards that
    /// get at least one pre-allocated story.
    pub fn max_story_repeats(&self) -> usize {
        self.stories.values().copied().max().unwrap_or(0)
    }
}

fn clamp_repeats(name: &str, count: u32, num_shards: usize) -> usize {
    let count = count as usize;
    if count > num_shards {
        warn!("{name} asks for {count} repeats but only {num_shards} shards exist, clamping");
        return num_shards;
    }
    count
}
