use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::benchmark::ExecutableConfig;

/// Duration given to every story without usable timing data.
///
/// Skipped stories still carry a non negligible overhead, and a zero default
/// would make the packer put every unknown story on the first shard.
pub const DEFAULT_STORY_DURATION: f64 = 10.0;

/// A measured duration, stored the way it was read so that rewriting a timing
/// file does not change its bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimingValue {
    /// Seconds as a decimal string, the format written by the fetcher.
    Text(String),
    Seconds(serde_json::Number),
}

impl TimingValue {
    pub fn from_seconds(seconds: f64) -> Self {
        TimingValue::Text(format!("{seconds:?}"))
    }

    /// `None` for empty, unparsable, negative or non-finite values.
    pub fn as_seconds(&self) -> Option<f64> {
        let seconds = match self {
            TimingValue::Text(text) => text.trim().parse::<f64>().ok(),
            TimingValue::Seconds(number) => number.as_f64(),
        }?;
        (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub name: String,
    #[serde(default)]
    pub duration: Option<TimingValue>,
}

impl TimingRecord {
    pub fn new(name: impl Into<String>, seconds: f64) -> Self {
        Self {
            name: name.into(),
            duration: Some(TimingValue::from_seconds(seconds)),
        }
    }
}

/// Content of a per-builder timing file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimingStore {
    pub records: Vec<TimingRecord>,
}

impl TimingStore {
    pub fn new(records: Vec<TimingRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        crate::json::to_pretty_json(self)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lookup table of usable durations. Later records win over earlier ones.
    pub fn durations(&self) -> HashMap<String, f64> {
        self.records
            .iter()
            .filter_map(|record| {
                let seconds = record.duration.as_ref()?.as_seconds()?;
                Some((record.name.clone(), seconds))
            })
            .collect()
    }

    /// Append one record per executable carrying its estimated runtime.
    pub fn push_executable_estimates<'a>(
        &mut self,
        executables: impl IntoIterator<Item = &'a ExecutableConfig>,
    ) {
        for executable in executables {
            self.records.push(TimingRecord::new(
                executable.story_name(),
                executable.estimated_runtime,
            ));
        }
    }

    /// Keep only records whose name is in `known`, returning the dropped ones.
    pub fn retain_known(&mut self, known: &HashSet<String>) -> Vec<TimingRecord> {
        let (kept, dropped) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|record| known.contains(&record.name));
        self.records = kept;
        dropped
    }
}
