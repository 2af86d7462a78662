use anyhow::{Context, bail};
use indexmap::IndexMap;

use crate::benchmark::{ShardTarget, split_qualified_name};
use crate::shard_map::{BenchmarkShard, ExecutableShard, ShardAssignment};

/// Merge overlapping or adjacent half-open ranges. The result is sorted.
pub fn merge_index_ranges(ranges: impl IntoIterator<Item = (usize, usize)>) -> Vec<(usize, usize)> {
    let mut ranges: Vec<_> = ranges.into_iter().filter(|(b, e)| b < e).collect();
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (begin, end) in ranges {
        match merged.last_mut() {
            Some(last) if begin <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((begin, end)),
        }
    }
    merged
}

/// Turn the stories placed on a shard into range descriptors.
///
/// `targets` is the builder's catalog; entries come out in catalog order,
/// whatever the order of `stories`.
pub fn coalesce_shard<'a>(
    stories: impl IntoIterator<Item = &'a str>,
    targets: &[ShardTarget],
) -> anyhow::Result<ShardAssignment> {
    let mut by_benchmark: IndexMap<&str, Vec<(usize, usize)>> = IndexMap::new();
    for name in stories {
        let (benchmark, story) =
            split_qualified_name(name).with_context(|| format!("Invalid story name {name}"))?;
        let Some(target) = targets.iter().find(|t| t.name() == benchmark) else {
            bail!("Story {name} belongs to no benchmark of the catalog");
        };
        let index = target
            .story_index(story)
            .with_context(|| format!("Story {name} is not part of benchmark {benchmark}"))?;
        by_benchmark
            .entry(target.name())
            .or_default()
            .push((index, index + 1));
    }

    let mut assignment = ShardAssignment::default();
    for target in targets {
        let Some(ranges) = by_benchmark.swap_remove(target.name()) else {
            continue;
        };
        match target {
            ShardTarget::Telemetry(benchmark) => {
                let merged = merge_index_ranges(ranges);
                assignment.benchmarks.insert(
                    benchmark.name.clone(),
                    BenchmarkShard::from_ranges(&merged, benchmark.stories.len(), benchmark.abridged),
                );
            }
            ShardTarget::Executable(executable) => {
                assignment.executables.insert(
                    executable.name.clone(),
                    ExecutableShard {
                        arguments: executable.flags.clone(),
                        path: executable.path().to_string(),
                    },
                );
            }
        }
    }
    Ok(assignment)
}

/// Inverse of [`coalesce_shard`]: the `benchmark/story` names a shard runs,
/// in catalog order.
pub fn expand_shard(
    assignment: &ShardAssignment,
    targets: &[ShardTarget],
) -> anyhow::Result<Vec<String>> {
    let mut stories = Vec::new();
    for (name, benchmark) in &assignment.benchmarks {
        let target = find_target(name, targets)?;
        let names = target.qualified_story_names();
        for (begin, end) in benchmark.ranges(names.len()) {
            if begin > end || end > names.len() {
                bail!(
                    "Range [{begin}, {end}) of {name} is out of its {} stories",
                    names.len()
                );
            }
            stories.extend_from_slice(&names[begin..end]);
        }
    }
    for name in assignment.executables.keys() {
        let target = find_target(name, targets)?;
        stories.extend(target.qualified_story_names());
    }
    Ok(stories)
}

fn find_target<'t>(name: &str, targets: &'t [ShardTarget]) -> anyhow::Result<&'t ShardTarget> {
    targets
        .iter()
        .find(|t| t.name() == name)
        .with_context(|| format!("{name} is on the shard map but not in the catalog"))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::benchmark::{BenchmarkConfig, ExecutableConfig};
    use crate::shard_map::Section;

    fn catalog() -> Vec<ShardTarget> {
        let mut executable = ExecutableConfig::new("base_perftests");
        executable.flags = vec!["--test-launcher-jobs=1".into()];
        vec![
            BenchmarkConfig {
                name: "a".into(),
                stories: (1..=5).map(|i| format!("s{i}")).collect(),
                abridged: true,
                repeat: 1,
            }
            .into(),
            executable.into(),
            BenchmarkConfig {
                name: "c".into(),
                stories: vec!["s1".into(), "s2".into()],
                abridged: false,
                repeat: 1,
            }
            .into(),
        ]
    }

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![(0, 1), (1, 2)], vec![(0, 2)])]
    #[case(vec![(3, 4), (0, 1), (1, 2)], vec![(0, 2), (3, 4)])]
    #[case(vec![(0, 3), (1, 2)], vec![(0, 3)])]
    #[case(vec![(2, 2), (4, 5)], vec![(4, 5)])]
    fn test_merge_index_ranges(
        #[case] input: Vec<(usize, usize)>,
        #[case] expected: Vec<(usize, usize)>,
    ) {
        assert_eq!(merge_index_ranges(input), expected);
    }

    #[test]
    fn test_whole_benchmark_has_no_bounds() {
        let assignment = coalesce_shard(["c/s2", "c/s1"], &catalog()).unwrap();
        assert_eq!(
            assignment.benchmarks["c"],
            BenchmarkShard {
                sections: None,
                begin: None,
                end: None,
                abridged: false,
            }
        );
    }

    #[test]
    fn test_single_range_keeps_non_trivial_bounds() {
        let assignment = coalesce_shard(["a/s2", "a/s3"], &catalog()).unwrap();
        assert_eq!(
            assignment.benchmarks["a"],
            BenchmarkShard {
                sections: None,
                begin: Some(1),
                end: Some(3),
                abridged: true,
            }
        );
    }

    #[test]
    fn test_disjoint_ranges_become_sections() {
        let assignment = coalesce_shard(["a/s1", "a/s4", "a/s5"], &catalog()).unwrap();
        assert_eq!(
            assignment.benchmarks["a"].sections,
            Some(vec![Section { begin: 0, end: 1 }, Section { begin: 3, end: 5 }])
        );
    }

    #[test]
    fn test_output_is_in_catalog_order_for_any_input_order() {
        let forward = coalesce_shard(["a/s1", "base_perftests/_gtest_", "c/s1"], &catalog());
        let backward = coalesce_shard(["c/s1", "base_perftests/_gtest_", "a/s1"], &catalog());
        let forward = forward.unwrap();

        assert_eq!(forward, backward.unwrap());
        assert_eq!(forward.benchmarks.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(
            forward.executables["base_perftests"],
            ExecutableShard {
                arguments: vec!["--test-launcher-jobs=1".into()],
                path: "base_perftests".into(),
            }
        );
    }

    #[test]
    fn test_unknown_stories_are_rejected() {
        assert!(coalesce_shard(["x/s1"], &catalog()).is_err());
        assert!(coalesce_shard(["a/s9"], &catalog()).is_err());
        assert!(coalesce_shard(["a"], &catalog()).is_err());
    }

    #[test]
    fn test_expand_inverts_coalesce() {
        let stories = ["a/s1", "a/s2", "a/s4", "base_perftests/_gtest_", "c/s2"];
        let assignment = coalesce_shard(stories, &catalog()).unwrap();
        assert_eq!(expand_shard(&assignment, &catalog()).unwrap(), stories);
    }

    #[test]
    fn test_expand_rejects_out_of_range_descriptor() {
        let mut assignment = ShardAssignment::default();
        assignment.benchmarks.insert(
            "c".into(),
            BenchmarkShard {
                sections: None,
                begin: Some(1),
                end: Some(7),
                abridged: false,
            },
        );
        assert!(expand_shard(&assignment, &catalog()).is_err());
    }
}
