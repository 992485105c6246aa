use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    catalog,
    command::Command,
    engine::{EngineBuilder, EngineSettings},
    session::Session,
    snapshot::SnapshotWriter,
    systems::{BookkeepingSystem, DisturbanceSystem, EnvironmentSystem},
    world::Region,
};

fn default_seed() -> u64 {
    42
}

fn default_cycles() -> u64 {
    20
}

fn default_starting_resources() -> i64 {
    100
}

fn default_base_income() -> i64 {
    15
}

fn default_random_events() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    #[serde(default)]
    pub snapshot_interval: u64,
    #[serde(default = "default_starting_resources")]
    pub starting_resources: i64,
    #[serde(default = "default_base_income")]
    pub base_income: i64,
    #[serde(default = "default_random_events")]
    pub random_events: bool,
    #[serde(default)]
    pub regions: Vec<RegionOverride>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

/// Replaces fields of one of the initial regions, matched by id.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionOverride {
    pub id: String,
    pub name: Option<String>,
    pub health: Option<f64>,
    pub biodiversity: Option<f64>,
    pub water_quality: Option<f64>,
    pub pollution_level: Option<f64>,
}

impl RegionOverride {
    fn apply(&self, region: &mut Region) {
        if let Some(name) = &self.name {
            region.name = name.clone();
        }
        if let Some(value) = self.health {
            region.health = value;
        }
        if let Some(value) = self.biodiversity {
            region.biodiversity = value;
        }
        if let Some(value) = self.water_quality {
            region.water_quality = value;
        }
        if let Some(value) = self.pollution_level {
            region.pollution_level = value;
        }
    }
}

/// A command issued once the world reaches `cycle`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub cycle: u64,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub cycles_run: u64,
    pub final_cycle: u64,
    pub resources: i64,
    pub score: i64,
    pub regions_restored: u32,
    pub commands_applied: usize,
    pub commands_rejected: usize,
    pub snapshots_written: usize,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            seed: self.seed,
            starting_resources: self.starting_resources,
            base_income: self.base_income,
        }
    }

    /// The initial regions with this scenario's overrides applied.
    pub fn build_regions(&self) -> Result<Vec<Region>> {
        let mut regions = catalog::initial_regions();
        for patch in &self.regions {
            let Some(region) = regions.iter_mut().find(|region| region.id == patch.id) else {
                bail!("scenario '{}' overrides unknown region '{}'", self.name, patch.id);
            };
            patch.apply(region);
        }
        Ok(regions)
    }

    pub fn build_session(&self, seed_override: Option<u64>) -> Result<Session> {
        let mut settings = self.settings();
        if let Some(seed) = seed_override {
            settings.seed = seed;
        }
        let mut builder = EngineBuilder::new(settings)
            .with_regions(self.build_regions()?)
            .with_system(EnvironmentSystem::new())
            .with_system(BookkeepingSystem::new());
        if self.random_events {
            builder.push_system(DisturbanceSystem::new());
        }
        Ok(Session::new(builder.build()))
    }

    pub fn cycles(&self, override_cycles: Option<u64>) -> u64 {
        override_cycles.unwrap_or(self.cycles)
    }

    /// Advances `cycles` cycles, issuing each script step as soon as the
    /// world reaches its cycle. Rejected commands are logged and counted,
    /// never fatal.
    pub fn run(
        &self,
        session: &mut Session,
        cycles: u64,
        snapshots: &SnapshotWriter,
    ) -> Result<RunSummary> {
        let mut script: Vec<&ScriptStep> = self.script.iter().collect();
        script.sort_by_key(|step| step.cycle);
        let mut pending = script.into_iter().peekable();

        let start = session.world().cycle();
        let end = start + cycles;
        let mut applied = 0;
        let mut rejected = 0;
        let mut written = 0;
        loop {
            let now = session.world().cycle();
            while let Some(step) = pending.next_if(|step| step.cycle <= now) {
                match session.apply(step.command.clone()) {
                    Ok(outcome) => {
                        tracing::debug!(cycle = now, ?outcome, "script step applied");
                        applied += 1;
                    }
                    Err(err) => {
                        tracing::warn!(cycle = now, %err, "script step rejected");
                        rejected += 1;
                    }
                }
            }
            if now >= end {
                break;
            }
            session.apply(Command::AdvanceCycle)?;
            if snapshots.maybe_write(&self.name, session.world())?.is_some() {
                written += 1;
            }
        }

        let world = session.world();
        Ok(RunSummary {
            scenario: self.name.clone(),
            cycles_run: world.cycle() - start,
            final_cycle: world.cycle(),
            resources: world.resources(),
            score: world.score(),
            regions_restored: world.stats().regions_restored,
            commands_applied: applied,
            commands_rejected: rejected,
            snapshots_written: written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let scenario: Scenario = serde_yaml::from_str("name: bare\n").unwrap();
        assert_eq!(scenario.seed, 42);
        assert_eq!(scenario.cycles, 20);
        assert_eq!(scenario.snapshot_interval, 0);
        assert_eq!(scenario.starting_resources, 100);
        assert_eq!(scenario.base_income, 15);
        assert!(scenario.random_events);
        assert!(scenario.script.is_empty());
    }

    #[test]
    fn overrides_patch_matching_region() {
        let scenario: Scenario = serde_yaml::from_str(
            "name: patched\nregions:\n  - id: region_desert\n    health: 55\n",
        )
        .unwrap();
        let regions = scenario.build_regions().unwrap();
        let desert = regions.iter().find(|r| r.id == "region_desert").unwrap();
        assert_eq!(desert.health, 55.0);
        assert_eq!(desert.biodiversity, 15.0);
    }

    #[test]
    fn unknown_override_is_an_error() {
        let scenario: Scenario =
            serde_yaml::from_str("name: bad\nregions:\n  - id: region_tundra\n").unwrap();
        assert!(scenario.build_regions().is_err());
    }
}
