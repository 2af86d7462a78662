//! Shard-map generation for performance builders.
//!
//! Takes a builder's benchmarks, their measured story durations and repeat
//! requirements, and decides which stories each shard of the builder runs.

pub mod benchmark;
pub mod generator;
mod json;
pub mod packer;
pub mod ranges;
pub mod repeat;
pub mod shard_map;
pub mod simulate;
pub mod stats;
pub mod timing;
pub mod timing_list;

pub use benchmark::{BenchmarkConfig, ExecutableConfig, ShardTarget};
pub use generator::{ShardingResult, generate_shard_map};
pub use json::to_pretty_json;
pub use repeat::{RepeatConfig, RepeatSpec};
pub use shard_map::ShardMap;
pub use simulate::{SimulatedShard, simulate_shard_map};
pub use timing::{TimingRecord, TimingStore};
