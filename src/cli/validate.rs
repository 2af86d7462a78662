use crate::config::ShardingConfig;
use crate::prelude::*;
use crate::validator::validate_shard_maps;

pub fn run(config: &ShardingConfig) -> Result<()> {
    let errors = validate_shard_maps(config)?;
    for error in &errors {
        error!("* {error}\n");
    }
    if !errors.is_empty() {
        bail!("Found {} inconsistencies between the shard maps and the catalog", errors.len());
    }
    info!("Shard maps, timing data and catalog are consistent");
    Ok(())
}
