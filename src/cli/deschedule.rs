use shard_map::ShardMap;

use crate::config::ShardingConfig;
use crate::helpers::write_atomically;
use crate::prelude::*;

/// Drop from every shard map the benchmarks and executables its builder no
/// longer schedules. Builders without a shard map are skipped.
pub fn run(config: &ShardingConfig) -> Result<()> {
    let shard_maps_dir = config.shard_maps_dir();
    for platform in &config.platforms {
        let path = platform.shard_map_path(&shard_maps_dir);
        if !path.exists() {
            debug!("{} has no shard map, skipping", platform.name);
            continue;
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read shard map at {}", path.display()))?;
        let mut shard_map = ShardMap::from_json(&content)
            .with_context(|| format!("Failed to parse shard map at {}", path.display()))?;

        for removed in shard_map.deschedule(&platform.scheduled_names()) {
            info!("Descheduled {removed} from {}", platform.name);
        }
        write_atomically(&path, &shard_map.to_json()?)?;
    }
    info!("done.");
    Ok(())
}
