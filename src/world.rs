use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const METRIC_MIN: f64 = 0.0;
pub const METRIC_MAX: f64 = 100.0;

pub fn clamp_metric(value: f64) -> f64 {
    value.clamp(METRIC_MIN, METRIC_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcosystemType {
    Rainforest,
    Desert,
    Wetland,
}

impl EcosystemType {
    pub const ALL: [EcosystemType; 3] = [
        EcosystemType::Rainforest,
        EcosystemType::Desert,
        EcosystemType::Wetland,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EcosystemType::Rainforest => "rainforest",
            EcosystemType::Desert => "desert",
            EcosystemType::Wetland => "wetland",
        }
    }
}

/// The four bounded region metrics. `PollutionLevel` is the only one where
/// lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Health,
    Biodiversity,
    WaterQuality,
    PollutionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Per-cycle influence of an entity on one metric. `radius` is carried for
/// presentation but aggregation applies the effect region-wide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub target: Metric,
    pub magnitude: f64,
    pub radius: f64,
}

impl Effect {
    pub const fn new(target: Metric, magnitude: f64, radius: f64) -> Self {
        Self {
            target,
            magnitude,
            radius,
        }
    }
}

/// Anything placed in a region that contributes effects scaled by its
/// condition (maturity, health, quality or efficiency).
pub trait EffectSource {
    fn effects(&self) -> &[Effect];
    fn condition(&self) -> f64;

    fn condition_ratio(&self) -> f64 {
        self.condition() / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub species: String,
    pub position: Position,
    pub maturity: f64,
    pub health: f64,
    pub is_native: bool,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: String,
    pub species: String,
    pub position: Position,
    pub population: u32,
    pub health: f64,
    pub is_native: bool,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterKind {
    River,
    Lake,
    Pond,
    Irrigation,
}

impl WaterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WaterKind::River => "river",
            WaterKind::Lake => "lake",
            WaterKind::Pond => "pond",
            WaterKind::Irrigation => "irrigation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterSource {
    pub id: String,
    pub kind: WaterKind,
    pub position: Position,
    pub size: f64,
    pub flow: f64,
    pub quality: f64,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub position: Position,
    pub efficiency: f64,
    pub tech_required: Option<String>,
    pub effects: Vec<Effect>,
}

impl EffectSource for Plant {
    fn effects(&self) -> &[Effect] {
        &self.effects
    }

    fn condition(&self) -> f64 {
        self.maturity
    }
}

impl EffectSource for Animal {
    fn effects(&self) -> &[Effect] {
        &self.effects
    }

    fn condition(&self) -> f64 {
        self.health
    }
}

impl EffectSource for WaterSource {
    fn effects(&self) -> &[Effect] {
        &self.effects
    }

    fn condition(&self) -> f64 {
        self.quality
    }
}

impl EffectSource for Structure {
    fn effects(&self) -> &[Effect] {
        &self.effects
    }

    fn condition(&self) -> f64 {
        self.efficiency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Critical,
    Poor,
    Recovering,
    Stable,
    Thriving,
}

impl HealthStatus {
    pub fn from_health(health: f64) -> Self {
        if health < 20.0 {
            HealthStatus::Critical
        } else if health < 40.0 {
            HealthStatus::Poor
        } else if health < 60.0 {
            HealthStatus::Recovering
        } else if health < 80.0 {
            HealthStatus::Stable
        } else {
            HealthStatus::Thriving
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub kind: EcosystemType,
    pub name: String,
    pub position: Position,
    pub size: Size,
    pub health: f64,
    pub biodiversity: f64,
    pub water_quality: f64,
    pub pollution_level: f64,
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub animals: Vec<Animal>,
    #[serde(default)]
    pub water_sources: Vec<WaterSource>,
    #[serde(default)]
    pub structures: Vec<Structure>,
    #[serde(default)]
    pub active_events: Vec<GameEvent>,
}

impl Region {
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Health => self.health,
            Metric::Biodiversity => self.biodiversity,
            Metric::WaterQuality => self.water_quality,
            Metric::PollutionLevel => self.pollution_level,
        }
    }

    /// Shifts one metric by `delta`, keeping it inside [0, 100].
    pub fn adjust(&mut self, metric: Metric, delta: f64) {
        let slot = match metric {
            Metric::Health => &mut self.health,
            Metric::Biodiversity => &mut self.biodiversity,
            Metric::WaterQuality => &mut self.water_quality,
            Metric::PollutionLevel => &mut self.pollution_level,
        };
        *slot = clamp_metric(*slot + delta);
    }

    pub fn clamp_metrics(&mut self) {
        self.health = clamp_metric(self.health);
        self.biodiversity = clamp_metric(self.biodiversity);
        self.water_quality = clamp_metric(self.water_quality);
        self.pollution_level = clamp_metric(self.pollution_level);
    }

    pub fn is_restored(&self) -> bool {
        self.health >= 80.0
            && self.biodiversity >= 70.0
            && self.water_quality >= 75.0
            && self.pollution_level <= 20.0
    }

    /// Mean of the three positive metrics and inverted pollution.
    pub fn ecological_index(&self) -> f64 {
        (self.health + self.biodiversity + self.water_quality + (100.0 - self.pollution_level))
            / 4.0
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_health(self.health)
    }

    pub fn hosts_event(&self, event_id: &str) -> bool {
        self.active_events.iter().any(|event| event.id == event_id)
    }

    pub fn entity_count(&self) -> usize {
        self.plants.len() + self.animals.len() + self.water_sources.len() + self.structures.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub regions_restored: u32,
    pub plants_planted: u32,
    pub animals_introduced: u32,
    pub pollution_cleaned: u32,
    pub technologies_researched: u32,
    pub events_resolved: u32,
    pub total_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub id: String,
    pub name: String,
    pub kind: EcosystemType,
    pub status: HealthStatus,
    pub restored: bool,
    pub health: f64,
    pub biodiversity: f64,
    pub water_quality: f64,
    pub pollution_level: f64,
    pub plants: usize,
    pub animals: usize,
    pub water_sources: usize,
    pub structures: usize,
    pub active_events: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub cycle: u64,
    pub resources: i64,
    pub score: i64,
    pub stats: GameStats,
    pub regions: Vec<RegionSnapshot>,
}

/// Mutable simulation state owned by the engine. Regions are fixed at
/// construction; only their contents and metrics change.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) cycle: u64,
    pub(crate) resources: i64,
    pub(crate) score: i64,
    pub(crate) regions: Vec<Region>,
    pub(crate) stats: GameStats,
    pub(crate) selected_region_id: Option<String>,
    pub(crate) selected_position: Option<Position>,
}

impl World {
    pub fn new(regions: Vec<Region>, starting_resources: i64) -> Self {
        let mut regions = regions;
        for region in &mut regions {
            region.clamp_metrics();
        }
        Self {
            cycle: 1,
            resources: starting_resources,
            score: 0,
            regions,
            stats: GameStats::default(),
            selected_region_id: None,
            selected_position: None,
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn resources(&self) -> i64 {
        self.resources
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }

    pub fn region_mut(&mut self, id: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|region| region.id == id)
    }

    pub fn selected_region_id(&self) -> Option<&str> {
        self.selected_region_id.as_deref()
    }

    pub fn selected_position(&self) -> Option<Position> {
        self.selected_position
    }

    pub fn restored_regions(&self) -> usize {
        self.regions.iter().filter(|region| region.is_restored()).count()
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let regions = self
            .regions
            .iter()
            .map(|region| RegionSnapshot {
                id: region.id.clone(),
                name: region.name.clone(),
                kind: region.kind,
                status: region.status(),
                restored: region.is_restored(),
                health: region.health,
                biodiversity: region.biodiversity,
                water_quality: region.water_quality,
                pollution_level: region.pollution_level,
                plants: region.plants.len(),
                animals: region.animals.len(),
                water_sources: region.water_sources.len(),
                structures: region.structures.len(),
                active_events: region
                    .active_events
                    .iter()
                    .map(|event| event.id.clone())
                    .collect(),
            })
            .collect();
        WorldSnapshot {
            scenario: scenario.to_string(),
            cycle: self.cycle,
            resources: self.resources,
            score: self.score,
            stats: self.stats.clone(),
            regions,
        }
    }
}
