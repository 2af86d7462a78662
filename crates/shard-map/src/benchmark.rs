use serde::{Deserialize, Serialize};

/// Story name given to the single opaque story of an executable.
pub const GTEST_STORY_NAME: &str = "_gtest_";

/// Default runtime in seconds of an executable with no estimate.
pub const DEFAULT_EXECUTABLE_RUNTIME: f64 = 60.0;

/// A Telemetry benchmark as it should be sharded on a builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BenchmarkConfig {
    pub name: String,
    /// Stories in the canonical order of the benchmark's story set. When the
    /// benchmark is abridged, this is already the abridged subset.
    pub stories: Vec<String>,
    #[serde(default)]
    pub abridged: bool,
    /// Number of times each story is run in a single benchmark run (`pageset_repeat`).
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}

/// A non-Telemetry test binary, sharded as a single indivisible story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutableConfig {
    pub name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default = "default_estimated_runtime")]
    pub estimated_runtime: f64,
}

fn default_estimated_runtime() -> f64 {
    DEFAULT_EXECUTABLE_RUNTIME
}

impl ExecutableConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            flags: Vec::new(),
            estimated_runtime: DEFAULT_EXECUTABLE_RUNTIME,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Binary to run, defaults to the executable name.
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    /// Qualified timing name of the executable's synthetic story.
    pub fn story_name(&self) -> String {
        format!("{}/{}", self.name, GTEST_STORY_NAME)
    }
}

/// Anything that can be placed on a shard.
#[derive(Debug, Clone, PartialEq)]
pub enum ShardTarget {
    Telemetry(BenchmarkConfig),
    Executable(ExecutableConfig),
}

impl ShardTarget {
    pub fn name(&self) -> &str {
        match self {
            ShardTarget::Telemetry(benchmark) => &benchmark.name,
            ShardTarget::Executable(executable) => &executable.name,
        }
    }

    pub fn is_telemetry(&self) -> bool {
        matches!(self, ShardTarget::Telemetry(_))
    }

    pub fn abridged(&self) -> bool {
        match self {
            ShardTarget::Telemetry(benchmark) => benchmark.abridged,
            ShardTarget::Executable(_) => false,
        }
    }

    pub fn repeat(&self) -> u32 {
        match self {
            ShardTarget::Telemetry(benchmark) => benchmark.repeat.max(1),
            ShardTarget::Executable(_) => 1,
        }
    }

    /// Ordered story names; executables expose their single synthetic story.
    pub fn stories(&self) -> Vec<&str> {
        match self {
            ShardTarget::Telemetry(benchmark) => {
                benchmark.stories.iter().map(String::as_str).collect()
            }
            ShardTarget::Executable(_) => vec![GTEST_STORY_NAME],
        }
    }

    pub fn story_count(&self) -> usize {
        match self {
            ShardTarget::Telemetry(benchmark) => benchmark.stories.len(),
            ShardTarget::Executable(_) => 1,
        }
    }

    /// Position of `story` in the canonical story order.
    pub fn story_index(&self, story: &str) -> Option<usize> {
        self.stories().iter().position(|s| *s == story)
    }

    /// `benchmark/story` names in canonical order.
    pub fn qualified_story_names(&self) -> Vec<String> {
        self.stories()
            .into_iter()
            .map(|story| qualified_name(self.name(), story))
            .collect()
    }
}

impl From<BenchmarkConfig> for ShardTarget {
    fn from(benchmark: BenchmarkConfig) -> Self {
        ShardTarget::Telemetry(benchmark)
    }
}

impl From<ExecutableConfig> for ShardTarget {
    fn from(executable: ExecutableConfig) -> Self {
        ShardTarget::Executable(executable)
    }
}

pub fn qualified_name(benchmark: &str, story: &str) -> String {
    format!("{benchmark}/{story}")
}

/// Split `benchmark/story` on the first slash; story names may contain slashes.
pub fn split_qualified_name(name: &str) -> Option<(&str, &str)> {
    name.split_once('/')
}
