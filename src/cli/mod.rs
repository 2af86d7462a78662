mod deschedule;
mod inspect;
mod shared;
pub(crate) mod update;
mod update_timing;
mod validate;

pub(crate) use shared::*;

use std::path::PathBuf;

use crate::{
    config::ShardingConfig,
    local_logger::{ACCENT_U8_COLOR_CODE, init_local_logger},
    prelude::*,
};
use clap::{
    Parser, Subcommand,
    builder::{Styles, styling},
};

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(
            styling::Ansi256Color(ACCENT_U8_COLOR_CODE).on_default() | styling::Effects::BOLD,
        )
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Generate and maintain the shard maps of the performance builders",
    styles = create_styles()
)]
pub struct Cli {
    /// Path to the benchmark catalog (perf_sharding.yaml)
    /// If not provided, searches the current directory and its parents.
    #[arg(long, env = "PERF_SHARDING_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Regenerate the shard maps of the selected builders
    Update(update::UpdateArgs),
    /// Retrieve the story timing data of the selected builders
    UpdateTiming(update_timing::UpdateTimingArgs),
    /// Remove from the shard maps the benchmarks the catalog no longer schedules, without resharding
    Deschedule,
    /// Check that the shard maps, the timing data and the catalog are consistent
    Validate,
    /// Show the predicted time of every shard of the existing shard maps
    Inspect(inspect::InspectArgs),
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_local_logger()?;
    debug!("perf-sharding v{}", crate::VERSION);

    let config =
        ShardingConfig::discover_and_load(cli.config.as_deref(), &std::env::current_dir()?)?;
    debug!("Shard maps directory: {}", config.shard_maps_dir().display());

    match cli.command {
        Commands::Update(args) => {
            update::run(args, &config, &mut std::io::stdin().lock()).await?
        }
        Commands::UpdateTiming(args) => update_timing::run(args, &config).await?,
        Commands::Deschedule => deschedule::run(&config)?,
        Commands::Validate => validate::run(&config)?,
        Commands::Inspect(args) => inspect::run(args, &config)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_selection_flags_are_exclusive() {
        let result = Cli::try_parse_from([
            "perf-sharding",
            "update",
            "--waterfall",
            "perf",
            "--builders",
            "linux-perf",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_update() {
        let cli = Cli::try_parse_from([
            "perf-sharding",
            "update",
            "-b",
            "linux-perf",
            "-b",
            "Android Go Perf",
            "-o",
            "--debug",
            "--config",
            "catalog.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("catalog.yaml")));
        let Commands::Update(args) = cli.command else {
            panic!("expected the update command");
        };
        assert!(args.use_existing_timing_data);
        assert!(args.debug);
        assert_eq!(
            args.selection.selection(),
            crate::platforms::BuilderSelection::Builders(vec![
                "linux-perf".into(),
                "Android Go Perf".into()
            ])
        );
    }
}
