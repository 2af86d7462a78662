use std::collections::{BTreeSet, HashSet};

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Key of the diagnostic side-car, always written after the shards.
pub const EXTRA_INFOS_KEY: &str = "extra_infos";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub begin: usize,
    pub end: usize,
}

/// Which stories of a benchmark a shard runs.
///
/// Either a single range, where bounds equal to the full story list are
/// omitted, or a list of disjoint `sections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkShard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(default)]
    pub abridged: bool,
}

impl BenchmarkShard {
    /// Build the descriptor of merged, sorted, non-empty ranges.
    pub fn from_ranges(ranges: &[(usize, usize)], story_count: usize, abridged: bool) -> Self {
        match ranges {
            [(begin, end)] => BenchmarkShard {
                sections: None,
                begin: (*begin != 0).then_some(*begin),
                end: (*end != story_count).then_some(*end),
                abridged,
            },
            _ => BenchmarkShard {
                sections: Some(
                    ranges
                        .iter()
                        .map(|&(begin, end)| Section { begin, end })
                        .collect(),
                ),
                begin: None,
                end: None,
                abridged,
            },
        }
    }

    /// Half-open story index ranges described by this entry.
    pub fn ranges(&self, story_count: usize) -> Vec<(usize, usize)> {
        match &self.sections {
            Some(sections) => sections.iter().map(|s| (s.begin, s.end)).collect(),
            None => vec![(self.begin.unwrap_or(0), self.end.unwrap_or(story_count))],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableShard {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    pub path: String,
}

/// Everything one shard runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardAssignment {
    #[serde(default)]
    pub benchmarks: IndexMap<String, BenchmarkShard>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub executables: IndexMap<String, ExecutableShard>,
}

impl ShardAssignment {
    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty() && self.executables.is_empty()
    }

    /// Benchmark and executable names, in map order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.benchmarks
            .keys()
            .chain(self.executables.keys())
            .map(String::as_str)
    }
}

/// The shard map of a builder: shards `"0"` to `"N-1"` then `extra_infos`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "IndexMap<String, Value>")]
pub struct ShardMap {
    pub shards: Vec<ShardAssignment>,
    /// Diagnostics only, never read back by any pass.
    pub extra_infos: Option<serde_json::Map<String, Value>>,
}

impl ShardMap {
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        crate::json::to_pretty_json(self)
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Every benchmark and executable scheduled on at least one shard.
    pub fn scheduled_names(&self) -> BTreeSet<String> {
        self.shards
            .iter()
            .flat_map(ShardAssignment::names)
            .map(str::to_string)
            .collect()
    }

    /// Drop every benchmark and executable whose name is not in `keep`,
    /// leaving the other entries untouched. Returns the removed names.
    pub fn deschedule(&mut self, keep: &HashSet<String>) -> BTreeSet<String> {
        let mut removed = BTreeSet::new();
        for shard in &mut self.shards {
            shard.benchmarks.retain(|name, _| {
                keep.contains(name) || {
                    removed.insert(name.clone());
                    false
                }
            });
            shard.executables.retain(|name, _| {
                keep.contains(name) || {
                    removed.insert(name.clone());
                    false
                }
            });
        }
        removed
    }
}

impl Serialize for ShardMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.extra_infos.is_some());
        let mut map = serializer.serialize_map(Some(self.shards.len() + extra))?;
        for (index, shard) in self.shards.iter().enumerate() {
            map.serialize_entry(&index.to_string(), shard)?;
        }
        if let Some(extra_infos) = &self.extra_infos {
            map.serialize_entry(EXTRA_INFOS_KEY, extra_infos)?;
        }
        map.end()
    }
}

impl TryFrom<IndexMap<String, Value>> for ShardMap {
    type Error = anyhow::Error;

    fn try_from(raw: IndexMap<String, Value>) -> anyhow::Result<Self> {
        let mut shard_map = ShardMap::default();
        for (key, value) in raw {
            if key == EXTRA_INFOS_KEY {
                let Value::Object(extra_infos) = value else {
                    bail!("{EXTRA_INFOS_KEY} must be an object");
                };
                shard_map.extra_infos = Some(extra_infos);
                continue;
            }
            let index: usize = key
                .parse()
                .with_context(|| format!("Unexpected shard key {key:?}"))?;
            if index != shard_map.shards.len() {
                bail!(
                    "Shard {index} found where shard {} was expected",
                    shard_map.shards.len()
                );
            }
            let shard = serde_json::from_value(value)
                .with_context(|| format!("Failed to parse shard {index}"))?;
            shard_map.shards.push(shard);
        }
        Ok(shard_map)
    }
}
