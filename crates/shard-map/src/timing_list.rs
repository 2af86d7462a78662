use std::collections::HashMap;

use indexmap::IndexMap;

use crate::benchmark::ShardTarget;
use crate::repeat::ResolvedRepeats;
use crate::timing::DEFAULT_STORY_DURATION;

/// `(benchmark/story, seconds)` in benchmark order, then story order.
pub type TimingList = Vec<(String, f64)>;

/// Price every story of `targets`.
///
/// With `apply_repeats`, measured durations are multiplied by the benchmark's
/// page-set repeat. The default duration is never multiplied.
pub fn gather_timing_list<'a>(
    targets: impl IntoIterator<Item = &'a ShardTarget>,
    durations: &HashMap<String, f64>,
    apply_repeats: bool,
) -> TimingList {
    let mut timing_list = Vec::new();
    for target in targets {
        let run_count = if apply_repeats { target.repeat() } else { 1 };
        for name in target.qualified_story_names() {
            let duration = durations
                .get(&name)
                .map(|seconds| seconds * run_count as f64)
                .unwrap_or(DEFAULT_STORY_DURATION);
            timing_list.push((name, duration));
        }
    }
    timing_list
}

/// The stories of a builder split by the way they are repeated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingLists {
    /// Stories of benchmarks that are not repeated as a whole.
    pub one_time: TimingList,
    /// One list per whole-repeated benchmark, in benchmark name order.
    pub repeated_benchmarks: IndexMap<String, TimingList>,
    /// Single-run duration of every per-story repeated story. These stories
    /// also appear in `one_time`.
    pub repeated_stories: IndexMap<String, f64>,
}

impl TimingLists {
    /// `targets` must already be sorted by name.
    pub fn assemble(
        targets: &[ShardTarget],
        durations: &HashMap<String, f64>,
        repeats: &ResolvedRepeats,
    ) -> Self {
        let one_time = gather_timing_list(
            targets
                .iter()
                .filter(|t| !repeats.benchmarks.contains_key(t.name())),
            durations,
            true,
        );

        let repeated_benchmarks = targets
            .iter()
            .filter(|t| repeats.benchmarks.contains_key(t.name()))
            .map(|t| {
                (
                    t.name().to_string(),
                    gather_timing_list([t], durations, true),
                )
            })
            .collect();

        let repeated_stories = one_time
            .iter()
            .filter(|(name, _)| repeats.stories.contains_key(name))
            .map(|(name, duration)| (name.clone(), *duration))
            .collect();

        TimingLists {
            one_time,
            repeated_benchmarks,
            repeated_stories,
        }
    }

    /// Predicted time of all shards together, repeats included.
    pub fn total_time(&self, repeats: &ResolvedRepeats) -> f64 {
        let one_time: f64 = self.one_time.iter().map(|(_, t)| t).sum();
        let repeated_benchmarks: f64 = self
            .repeated_benchmarks
            .iter()
            .map(|(benchmark, list)| {
                list.iter().map(|(_, t)| t).sum::<f64>() * repeats.benchmarks[benchmark] as f64
            })
            .sum();
        let repeated_stories: f64 = self
            .repeated_stories
            .iter()
            .map(|(story, t)| t * (repeats.stories[story] - 1) as f64)
            .sum();
        one_time + repeated_benchmarks + repeated_stories
    }

    /// Number of story runs over all shards, repeats included.
    pub fn total_stories(&self, repeats: &ResolvedRepeats) -> usize {
        let repeated_benchmarks: usize = self
            .repeated_benchmarks
            .iter()
            .map(|(benchmark, list)| list.len() * repeats.benchmarks[benchmark])
            .sum();
        let repeated_stories: usize = self
            .repeated_stories
            .keys()
            .map(|story| repeats.stories[story] - 1)
            .sum();
        self.one_time.len() + repeated_benchmarks + repeated_stories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkConfig, ExecutableConfig};

    fn benchmark(name: &str, stories: &[&str], repeat: u32) -> ShardTarget {
        BenchmarkConfig {
            name: name.into(),
            stories: stories.iter().map(|s| s.to_string()).collect(),
            abridged: false,
            repeat,
        }
        .into()
    }

    #[test]
    fn test_default_duration_and_repeat_multiplier() {
        let targets = [benchmark("a", &["s1", "s2"], 3)];
        let durations = HashMap::from([("a/s1".to_string(), 2.0)]);

        assert_eq!(
            gather_timing_list(&targets, &durations, true),
            vec![("a/s1".to_string(), 6.0), ("a/s2".to_string(), 10.0)]
        );
        assert_eq!(
            gather_timing_list(&targets, &durations, false),
            vec![("a/s1".to_string(), 2.0), ("a/s2".to_string(), 10.0)]
        );
    }

    #[test]
    fn test_executables_use_their_synthetic_story() {
        let targets = [ShardTarget::from(ExecutableConfig::new("gpu_perftests"))];
        let durations = HashMap::from([("gpu_perftests/_gtest_".to_string(), 60.0)]);

        assert_eq!(
            gather_timing_list(&targets, &durations, true),
            vec![("gpu_perftests/_gtest_".to_string(), 60.0)]
        );
    }

    #[test]
    fn test_partition_and_totals() {
        let targets = [
            benchmark("a", &["s1", "s2", "s3"], 1),
            benchmark("b", &["s1", "s2"], 1),
            benchmark("c", &["s1"], 1),
        ];
        let repeats = ResolvedRepeats {
            benchmarks: IndexMap::from([("a".to_string(), 2)]),
            stories: IndexMap::from([("b/s2".to_string(), 3)]),
        };

        let lists = TimingLists::assemble(&targets, &HashMap::new(), &repeats);

        assert_eq!(
            lists.one_time.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            vec!["b/s1", "b/s2", "c/s1"]
        );
        assert_eq!(lists.repeated_benchmarks["a"].len(), 3);
        assert_eq!(
            lists.repeated_stories,
            IndexMap::from([("b/s2".to_string(), 10.0)])
        );
        // 3 one-time + 3 * 2 repeated + 2 extra runs of b/s2
        assert_eq!(lists.total_stories(&repeats), 11);
        assert_eq!(lists.total_time(&repeats), 110.0);
    }
}
