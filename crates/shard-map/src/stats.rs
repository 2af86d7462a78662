use serde_json::{Map, Value, json};

use crate::packer::PackedShard;

/// Predicted timing of a generated shard map, written to `extra_infos`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardStats {
    /// Story runs over all shards, repeats included.
    pub num_stories: usize,
    /// Predicted time of each shard, in shard order.
    pub shard_times: Vec<f64>,
    /// `(story, seconds)` of each shard, in shard order.
    pub breakdowns: Vec<Vec<(String, f64)>>,
}

impl ShardStats {
    pub fn from_packed(num_stories: usize, shards: &[PackedShard]) -> Self {
        Self {
            num_stories,
            shard_times: shards.iter().map(|s| s.time).collect(),
            breakdowns: shards.iter().map(|s| s.breakdown.clone()).collect(),
        }
    }

    pub fn total_time(&self) -> f64 {
        self.shard_times.iter().sum()
    }

    /// `(index, time)` of the fastest shard, the first one on ties.
    pub fn min_shard(&self) -> Option<(usize, f64)> {
        let mut min: Option<(usize, f64)> = None;
        for (index, &time) in self.shard_times.iter().enumerate() {
            if min.is_none_or(|(_, min_time)| time < min_time) {
                min = Some((index, time));
            }
        }
        min
    }

    /// `(index, time)` of the slowest shard, the first one on ties.
    pub fn max_shard(&self) -> Option<(usize, f64)> {
        let mut max: Option<(usize, f64)> = None;
        for (index, &time) in self.shard_times.iter().enumerate() {
            if max.is_none_or(|(_, max_time)| time > max_time) {
                max = Some((index, time));
            }
        }
        max
    }

    /// Content of the `extra_infos` side-car.
    ///
    /// With `debug`, each shard lists the predicted time of every story it
    /// runs; otherwise only its total.
    pub fn to_extra_infos(&self, debug: bool) -> Map<String, Value> {
        let mut extra_infos = Map::new();
        let (min_index, min_time) = self.min_shard().unzip();
        let (max_index, max_time) = self.max_shard().unzip();
        extra_infos.insert("num_stories".into(), json!(self.num_stories));
        extra_infos.insert("predicted_min_shard_time".into(), json!(min_time));
        extra_infos.insert("predicted_min_shard_index".into(), json!(min_index));
        extra_infos.insert("predicted_max_shard_time".into(), json!(max_time));
        extra_infos.insert("predicted_max_shard_index".into(), json!(max_index));

        for (index, time) in self.shard_times.iter().enumerate() {
            let shard_name = format!("shard #{index}");
            if debug {
                let mut stories: Map<String, Value> = self.breakdowns[index]
                    .iter()
                    .map(|(story, duration)| (story.clone(), json!(duration)))
                    .collect();
                stories.insert("predicted_total_time".into(), json!(time));
                extra_infos.insert(shard_name, Value::Object(stories));
            } else {
                extra_infos.insert(shard_name, json!(time));
            }
        }
        extra_infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> ShardStats {
        ShardStats {
            num_stories: 4,
            shard_times: vec![20.0, 10.0, 20.0, 10.0],
            breakdowns: vec![
                vec![("a/s1".into(), 20.0)],
                vec![("a/s2".into(), 10.0)],
                vec![("b/s1".into(), 20.0)],
                vec![("b/s2".into(), 10.0)],
            ],
        }
    }

    #[test]
    fn test_extrema_use_first_shard_on_ties() {
        assert_eq!(stats().min_shard(), Some((1, 10.0)));
        assert_eq!(stats().max_shard(), Some((0, 20.0)));
        assert_eq!(stats().total_time(), 60.0);
    }

    #[test]
    fn test_summary_extra_infos() {
        let extra_infos = stats().to_extra_infos(false);
        insta::assert_snapshot!(serde_json::to_string_pretty(&extra_infos).unwrap(), @r###"
        {
          "num_stories": 4,
          "predicted_min_shard_time": 10.0,
          "predicted_min_shard_index": 1,
          "predicted_max_shard_time": 20.0,
          "predicted_max_shard_index": 0,
          "shard #0": 20.0,
          "shard #1": 10.0,
          "shard #2": 20.0,
          "shard #3": 10.0
        }
        "###);
    }

    #[test]
    fn test_debug_extra_infos_list_stories() {
        let extra_infos = stats().to_extra_infos(true);
        assert_eq!(
            extra_infos["shard #2"],
            json!({"b/s1": 20.0, "predicted_total_time": 20.0})
        );
        let keys: Vec<_> = extra_infos["shard #2"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b/s1", "predicted_total_time"]);
    }
}
