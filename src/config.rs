use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use nestify::nest;
use serde::{Deserialize, Serialize};

use crate::platforms::PlatformConfig;
use crate::prelude::*;

/// Catalog file names in priority order
const CONFIG_FILENAMES: &[&str] = &["perf_sharding.yaml", "perf_sharding.yml"];

/// Benchmarks with this prefix are official but deliberately not scheduled yet.
pub const UNSCHEDULED_PREFIX: &str = "UNSCHEDULED_";

nest! {
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]*
    #[serde(rename_all = "kebab-case")]*
    /// The benchmark catalog: every performance builder with what it runs.
    ///
    /// Loaded from `perf_sharding.yaml` with [`ShardingConfig::discover_and_load`].
    pub struct ShardingConfig {
        /// Where shard maps and timing data live, relative to the catalog file
        #[serde(default = "default_shard_maps_dir")]
        pub shard_maps_dir: PathBuf,
        pub timing_fetch: pub struct TimingFetchConfig {
            /// Command printing the timing records of a builder as JSON.
            /// `{builder}` and `{days}` are substituted before running it.
            pub command: String,
            #[serde(default = "default_num_last_days")]
            pub num_last_days: u32,
        },
        /// Benchmarks that must run on at least one builder
        #[serde(default)]
        pub official_benchmarks: Vec<String>,
        pub platforms: Vec<PlatformConfig>,
        #[serde(skip)]
        pub base_dir: PathBuf,
    }
}

fn default_shard_maps_dir() -> PathBuf {
    PathBuf::from("shard_maps")
}

fn default_num_last_days() -> u32 {
    5
}

impl ShardingConfig {
    /// Load the catalog from `config_path_override`, or from the first catalog
    /// file found in `current_dir` or one of its ancestors.
    pub fn discover_and_load(
        config_path_override: Option<&Path>,
        current_dir: &Path,
    ) -> Result<Self> {
        if let Some(config_path) = config_path_override {
            return Self::load_from_path(config_path)
                .with_context(|| format!("Failed to load config from {}", config_path.display()));
        }

        for dir in current_dir.ancestors() {
            for filename in CONFIG_FILENAMES {
                let candidate_path = dir.join(filename);
                if candidate_path.exists() {
                    debug!("Found catalog at {}", candidate_path.display());
                    return Self::load_from_path(&candidate_path);
                }
            }
        }

        bail!(
            "No {} found in {} or its parents, use --config to point to the catalog",
            CONFIG_FILENAMES[0],
            current_dir.display()
        )
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let config_content = fs::read(path)
            .with_context(|| format!("Failed to read catalog at {}", path.display()))?;
        let mut config: Self = serde_yaml::from_slice(&config_content)
            .with_context(|| format!("Failed to parse catalog at {}", path.display()))?;

        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        config.base_dir = path
            .parent()
            .context("Catalog file has no parent directory")?
            .to_path_buf();
        let shard_maps_dir =
            shellexpand::tilde(&config.shard_maps_dir.to_string_lossy()).into_owned();
        config.shard_maps_dir = PathBuf::from(shard_maps_dir);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = self.platforms.iter().map(|p| &p.name).duplicates().next() {
            bail!("Builder {name} is defined twice");
        }
        for platform in &self.platforms {
            if platform.num_shards == 0 {
                bail!("Builder {} must have at least one shard", platform.name);
            }
            if let Some(name) = platform
                .benchmarks
                .iter()
                .map(|b| &b.name)
                .chain(platform.executables.iter().map(|e| &e.name))
                .duplicates()
                .next()
            {
                bail!("{name} appears twice on builder {}", platform.name);
            }
        }
        Ok(())
    }

    pub fn shard_maps_dir(&self) -> PathBuf {
        self.base_dir.join(&self.shard_maps_dir)
    }

    /// Official benchmarks expected on some shard map.
    pub fn scheduled_official_benchmarks(&self) -> impl Iterator<Item = &str> {
        self.official_benchmarks
            .iter()
            .map(String::as_str)
            .filter(|name| !name.starts_with(UNSCHEDULED_PREFIX))
    }
}
