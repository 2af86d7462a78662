use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::config::ShardingConfig;
use crate::platforms::PlatformConfig;

pub(crate) const CATALOG_YAML: &str = r#"
timing-fetch:
  command: "false"
official-benchmarks: [blink_perf.css, speedometer2, UNSCHEDULED_octane]
platforms:
  - name: linux-perf
    num-shards: 2
    benchmarks:
      - name: blink_perf.css
        stories: [a.html, b.html, c.html]
      - name: speedometer2
        stories: [Speedometer2]
    executables:
      - name: base_perftests
        flags: [--test-launcher-jobs=1]
        estimated-runtime: 45
    repeat-config:
      speedometer2: 2
  - name: Android Go Perf
    num-shards: 1
    waterfall: fyi
    benchmarks:
      - name: blink_perf.css
        stories: [a.html, b.html]
        abridged: true
  - name: pinpoint-perf
    num-shards: 1
    pinpoint-only: true
    benchmarks:
      - name: octane
        stories: [Octane]
"#;

pub(crate) const LINUX_TIMING_JSON: &str = r#"[
  {
    "name": "blink_perf.css/a.html",
    "duration": "20.0"
  },
  {
    "name": "blink_perf.css/b.html",
    "duration": "5.5"
  },
  {
    "name": "speedometer2/Speedometer2",
    "duration": "30.0"
  },
  {
    "name": "base_perftests/_gtest_",
    "duration": "45.0"
  }
]
"#;

pub(crate) const ANDROID_TIMING_JSON: &str = r#"[
  {
    "name": "blink_perf.css/a.html",
    "duration": "40.0"
  }
]
"#;

/// A catalog and its shard maps directory in a temporary directory.
pub(crate) struct Workspace {
    pub temp_dir: TempDir,
    pub config: ShardingConfig,
}

impl Workspace {
    /// Catalog and aligned timing data, no shard map yet.
    pub fn new() -> Self {
        Self::with_catalog(CATALOG_YAML)
    }

    pub fn with_catalog(catalog: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("perf_sharding.yaml");
        fs::write(&config_path, catalog).unwrap();
        let config = ShardingConfig::discover_and_load(Some(&config_path), temp_dir.path())
            .unwrap();

        let workspace = Self { temp_dir, config };
        workspace.write("timing_data/linux-perf_timing.json", LINUX_TIMING_JSON);
        workspace.write("timing_data/android_go_perf_timing.json", ANDROID_TIMING_JSON);
        workspace
    }

    /// Path of a file of the shard maps directory.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.config.shard_maps_dir().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn platform(&self, name: &str) -> &PlatformConfig {
        self.config
            .platforms
            .iter()
            .find(|p| p.name == name)
            .unwrap()
    }
}
