use std::collections::VecDeque;

use log::trace;

use crate::benchmark::split_qualified_name;
use crate::repeat::ResolvedRepeats;
use crate::timing_list::TimingLists;

/// Stories assigned to one shard by [`pack`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedShard {
    /// Stories taken from the timing lists, in the order they were taken.
    pub stories: Vec<String>,
    /// Per-story repeated stories placed on the shard before packing.
    pub pre_allocated: Vec<String>,
    /// Predicted time of the shard in seconds, pre-allocated stories included.
    pub time: f64,
    /// `(story, seconds)` of everything on the shard.
    pub breakdown: Vec<(String, f64)>,
}

impl PackedShard {
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty() && self.pre_allocated.is_empty()
    }

    /// Every story on the shard, pre-allocated ones first.
    pub fn all_stories(&self) -> impl Iterator<Item = &str> {
        self.pre_allocated
            .iter()
            .chain(self.stories.iter())
            .map(String::as_str)
    }
}

/// Distribute the timing lists over `num_shards` shards.
///
/// Shards are filled in order. Each shard first receives the per-story
/// repeated stories whose repeat count exceeds its index, then takes stories
/// (current whole-benchmark repeat round first, one-time stories after) for as
/// long as its predicted time gets closer to the mean of what is left. The last
/// shard takes everything that remains.
///
/// A copy of a whole-repeated benchmark is never split inside a round, and a
/// round always starts on a fresh shard, so a benchmark repeated R times runs
/// on exactly R shards.
pub fn pack(lists: &TimingLists, repeats: &ResolvedRepeats, num_shards: usize) -> Vec<PackedShard> {
    Packer::new(lists, repeats, num_shards).run()
}

struct Packer<'a> {
    lists: &'a TimingLists,
    repeats: &'a ResolvedRepeats,
    num_shards: usize,
    one_time: VecDeque<(String, f64)>,
    round: VecDeque<(String, f64)>,
    rounds_started: usize,
    remaining_time: f64,
}

impl<'a> Packer<'a> {
    fn new(lists: &'a TimingLists, repeats: &'a ResolvedRepeats, num_shards: usize) -> Self {
        // Per-story repeated stories only ever land through pre-allocation
        let one_time = lists
            .one_time
            .iter()
            .filter(|(name, _)| !repeats.stories.contains_key(name))
            .cloned()
            .collect();

        Self {
            lists,
            repeats,
            num_shards,
            one_time,
            round: VecDeque::new(),
            rounds_started: 0,
            remaining_time: lists.total_time(repeats),
        }
    }

    fn run(mut self) -> Vec<PackedShard> {
        (0..self.num_shards)
            .map(|index| {
                let shard = self.pack_shard(index);
                self.remaining_time -= shard.time;
                trace!(
                    "Shard #{index}: {} stories, {:.1}s",
                    shard.stories.len() + shard.pre_allocated.len(),
                    shard.time
                );
                shard
            })
            .collect()
    }

    fn pack_shard(&mut self, index: usize) -> PackedShard {
        let mut shard = PackedShard::default();
        let is_last = index + 1 == self.num_shards;
        let expected_time = self.remaining_time / (self.num_shards - index) as f64;

        for (story, &count) in &self.repeats.stories {
            if count > index {
                let duration = self.lists.repeated_stories[story];
                shard.pre_allocated.push(story.clone());
                shard.breakdown.push((story.clone(), duration));
                shard.time += duration;
            }
        }

        if self.round.is_empty() && self.rounds_started < self.repeats.max_benchmark_repeats() {
            self.start_round();
        }

        // When every remaining shard is needed to start a remaining round, the
        // current round has to end on this shard.
        let shards_after = self.num_shards - index - 1;
        let rounds_left = self.repeats.max_benchmark_repeats() - self.rounds_started;
        let drain_round = rounds_left >= shards_after;
        let needing_stories = self.shards_without_pre_allocation_after(index);

        loop {
            let from_round = !self.round.is_empty();
            let source = if from_round {
                &mut self.round
            } else {
                &mut self.one_time
            };
            // The first story is taken unconditionally to avoid empty shards
            let Some((story, duration)) = source.pop_front() else {
                break;
            };
            shard.time += duration;
            shard.breakdown.push((story.clone(), duration));
            shard.stories.push(story);

            if is_last {
                continue;
            }

            let Some((next_story, next_duration)) =
                self.round.front().or_else(|| self.one_time.front())
            else {
                break;
            };

            if from_round && !self.round.is_empty() {
                let taken = shard.stories.last().map(String::as_str).unwrap_or_default();
                if drain_round || same_benchmark(taken, next_story) {
                    continue;
                }
            }

            if self.pending_stories() <= needing_stories {
                break;
            }
            if (shard.time + next_duration - expected_time).abs()
                > (shard.time - expected_time).abs()
            {
                break;
            }
        }

        shard
    }

    fn start_round(&mut self) {
        for (benchmark, timing_list) in &self.lists.repeated_benchmarks {
            if self.repeats.benchmarks[benchmark] > self.rounds_started {
                self.round.extend(timing_list.iter().cloned());
            }
        }
        self.rounds_started += 1;
    }

    /// Stories not yet placed, rounds that have not started included.
    fn pending_stories(&self) -> usize {
        let future_rounds: usize = self
            .lists
            .repeated_benchmarks
            .iter()
            .map(|(benchmark, timing_list)| {
                let repeats = self.repeats.benchmarks[benchmark];
                timing_list.len() * repeats.saturating_sub(self.rounds_started)
            })
            .sum();
        self.round.len() + self.one_time.len() + future_rounds
    }

    /// Shards after `index` that would stay empty without a packed story.
    fn shards_without_pre_allocation_after(&self, index: usize) -> usize {
        let first_bare_shard = (index + 1).max(self.repeats.max_story_repeats());
        self.num_shards.saturating_sub(first_bare_shard)
    }
}

fn same_benchmark(a: &str, b: &str) -> bool {
    match (split_qualified_name(a), split_qualified_name(b)) {
        (Some((a, _)), Some((b, _))) => a == b,
        _ => false,
    }
}
