use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ecorestore::{scenario::ScenarioLoader, snapshot::SnapshotWriter};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless ecosystem restoration runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/three_biomes.yaml")]
    scenario: PathBuf,

    /// Override cycle count (uses scenario default when omitted)
    #[arg(long)]
    cycles: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override snapshot interval in cycles (0 disables)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecorestore=info")),
        )
        .init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut session = scenario.build_session(cli.seed)?;
    let cycles = scenario.cycles(cli.cycles);
    let snapshots = SnapshotWriter::new(
        cli.snapshot_dir
            .unwrap_or_else(|| PathBuf::from("snapshots")),
        cli.snapshot_interval.unwrap_or(scenario.snapshot_interval),
    );

    tracing::info!(scenario = %scenario.name, cycles, "starting run");
    let summary = scenario.run(&mut session, cycles, &snapshots)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Scenario '{}' ran {} cycles. Score {}, resources {}, {} of {} regions restored.",
            summary.scenario,
            summary.cycles_run,
            summary.score,
            summary.resources,
            summary.regions_restored,
            session.world().regions().len()
        );
        for region in session.world().regions() {
            println!(
                "  {:<16} {:?} health {:>5.1} biodiversity {:>5.1} water {:>5.1} pollution {:>5.1} entities {}",
                region.name,
                region.status(),
                region.health,
                region.biodiversity,
                region.water_quality,
                region.pollution_level,
                region.entity_count()
            );
        }
    }
    Ok(())
}
