use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::{
    catalog::{
        self, ActionDefinition, ActionType, AnimalTemplate, PlantTemplate, StructureTemplate,
        WaterTemplate,
    },
    events::EventRegistry,
    rng::{entity_id, RngManager, SystemRng},
    systems::{self, BookkeepingSystem, DisturbanceSystem, EnvironmentSystem},
    world::{EcosystemType, GameStats, Metric, Position, Region, World},
};

const ACTION_STREAM: &str = "actions";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub seed: u64,
    pub starting_resources: i64,
    /// Resources granted at the start of every cycle.
    pub base_income: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            starting_resources: 100,
            base_income: 15,
        }
    }
}

/// Where an event instance was attached or from where it expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPlacement {
    pub region_id: String,
    pub event_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub triggered: Vec<EventPlacement>,
    pub expired: Vec<EventPlacement>,
    pub regions_restored: u32,
    pub score: i64,
}

pub struct SystemContext<'a> {
    pub cycle: u64,
    pub events: &'a EventRegistry,
    pub report: &'a mut CycleReport,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &mut SystemContext<'_>,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionRejected {
    #[error("no definition for action `{0}`")]
    UnknownAction(ActionType),
    #[error("`{action}` costs {cost} but only {available} resources are available")]
    InsufficientResources {
        action: ActionType,
        cost: u32,
        available: i64,
    },
    #[error("unknown region `{0}`")]
    UnknownRegion(String),
    #[error("`{action}` cannot be used in a {kind:?} region")]
    NotApplicable {
        action: ActionType,
        kind: EcosystemType,
    },
    #[error("`{name}` is not a valid subtype for `{action}` here")]
    UnknownEntityType { action: ActionType, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReceipt {
    pub action: ActionType,
    pub cost: u32,
    pub region_id: String,
    /// Id of the created entity; `None` for actions that only shift metrics.
    pub entity_id: Option<String>,
}

/// A validated action target, resolved before any state changes.
#[derive(Debug, Clone, Copy)]
enum Placement {
    Plant(&'static PlantTemplate),
    Animal(&'static AnimalTemplate),
    Water(&'static WaterTemplate),
    Structure(&'static StructureTemplate),
    RemoveInvasive,
    CleanPollution,
}

/// The engine's region-mutation interface, handed to collaborators that
/// need to read or change regions without owning the engine.
pub trait RegionHost {
    fn regions(&self) -> &[Region];
    fn regions_mut(&mut self) -> &mut [Region];
    fn event_registry(&self) -> &EventRegistry;
    fn event_registry_mut(&mut self) -> &mut EventRegistry;

    fn region(&self, id: &str) -> Option<&Region> {
        self.regions().iter().find(|region| region.id == id)
    }

    fn region_mut(&mut self, id: &str) -> Option<&mut Region> {
        self.regions_mut().iter_mut().find(|region| region.id == id)
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
    regions: Option<Vec<Region>>,
    events: Option<EventRegistry>,
    actions: Option<Vec<ActionDefinition>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
            regions: None,
            events: None,
            actions: None,
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    /// Region update, scoring, then random event rolls.
    pub fn with_default_systems(self) -> Self {
        self.with_system(EnvironmentSystem::new())
            .with_system(BookkeepingSystem::new())
            .with_system(DisturbanceSystem::new())
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = Some(regions);
        self
    }

    pub fn with_events(mut self, events: EventRegistry) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_actions(mut self, actions: Vec<ActionDefinition>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn build(self) -> Engine {
        let regions = self.regions.unwrap_or_else(catalog::initial_regions);
        Engine {
            world: World::new(regions, self.settings.starting_resources),
            events: self.events.unwrap_or_else(EventRegistry::with_defaults),
            actions: self
                .actions
                .unwrap_or_else(|| catalog::default_actions().to_vec()),
            systems: self.systems,
            rng: RngManager::new(self.settings.seed),
            settings: self.settings,
        }
    }
}

pub struct Engine {
    world: World,
    events: EventRegistry,
    actions: Vec<ActionDefinition>,
    systems: Vec<Box<dyn System>>,
    rng: RngManager,
    settings: EngineSettings,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        EngineBuilder::new(settings).with_default_systems().build()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn cycle(&self) -> u64 {
        self.world.cycle
    }

    pub fn resources(&self) -> i64 {
        self.world.resources
    }

    pub fn score(&self) -> i64 {
        self.world.score
    }

    pub fn stats(&self) -> &GameStats {
        &self.world.stats
    }

    pub fn action(&self, action: ActionType) -> Option<&ActionDefinition> {
        self.actions.iter().find(|def| def.action == action)
    }

    pub fn actions(&self) -> &[ActionDefinition] {
        &self.actions
    }

    /// Advances one cycle: income, then every system in registration order.
    pub fn advance_cycle(&mut self) -> CycleReport {
        self.world.cycle += 1;
        self.world.resources += self.settings.base_income;
        let cycle = self.world.cycle;
        let mut report = CycleReport {
            cycle,
            ..CycleReport::default()
        };
        for system in &mut self.systems {
            let mut rng = self.rng.stream(system.name());
            let mut ctx = SystemContext {
                cycle,
                events: &self.events,
                report: &mut report,
            };
            if let Err(err) = system.run(&mut ctx, &mut self.world, &mut rng) {
                tracing::error!(system = system.name(), error = %err, "system failed");
            }
        }
        report.regions_restored = self.world.stats.regions_restored;
        report.score = self.world.score;
        tracing::debug!(
            cycle,
            score = report.score,
            restored = report.regions_restored,
            triggered = report.triggered.len(),
            expired = report.expired.len(),
            "cycle advanced"
        );
        report
    }

    /// The single cost-gated entry point for player actions. Returns `false`
    /// without touching state when any check fails.
    pub fn perform_action(
        &mut self,
        action: ActionType,
        region_id: &str,
        position: Position,
        entity_type: Option<&str>,
    ) -> bool {
        match self.try_perform_action(action, region_id, position, entity_type) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(%err, "action rejected");
                false
            }
        }
    }

    pub fn try_perform_action(
        &mut self,
        action: ActionType,
        region_id: &str,
        position: Position,
        entity_type: Option<&str>,
    ) -> Result<ActionReceipt, ActionRejected> {
        let definition = *self
            .action(action)
            .ok_or(ActionRejected::UnknownAction(action))?;
        let cost = i64::from(definition.cost);
        if self.world.resources < cost {
            return Err(ActionRejected::InsufficientResources {
                action,
                cost: definition.cost,
                available: self.world.resources,
            });
        }
        let kind = self
            .world
            .region(region_id)
            .map(|region| region.kind)
            .ok_or_else(|| ActionRejected::UnknownRegion(region_id.to_string()))?;
        if !definition.applies_to(kind) {
            return Err(ActionRejected::NotApplicable { action, kind });
        }
        let placement = self.resolve_placement(action, kind, entity_type)?;

        self.world.resources -= cost;
        let entity_id = self.place(region_id, position, placement);
        self.world.score += cost / 2;
        tracing::debug!(
            action = %action,
            region = region_id,
            cost,
            entity = ?entity_id,
            "action performed"
        );
        Ok(ActionReceipt {
            action,
            cost: definition.cost,
            region_id: region_id.to_string(),
            entity_id,
        })
    }

    fn resolve_placement(
        &mut self,
        action: ActionType,
        kind: EcosystemType,
        entity_type: Option<&str>,
    ) -> Result<Placement, ActionRejected> {
        let unknown = |name: &str| ActionRejected::UnknownEntityType {
            action,
            name: name.to_string(),
        };
        let mut rng = self.rng.stream(ACTION_STREAM);
        let placement = match action {
            ActionType::PlantTree => Placement::Plant(match entity_type {
                Some(name) => catalog::find_plant(kind, name).ok_or_else(|| unknown(name))?,
                None => pick(catalog::plant_templates(kind), &mut rng)
                    .ok_or_else(|| unknown("<none>"))?,
            }),
            ActionType::IntroduceAnimal => Placement::Animal(match entity_type {
                Some(name) => catalog::find_animal(kind, name).ok_or_else(|| unknown(name))?,
                None => pick(catalog::animal_templates(kind), &mut rng)
                    .ok_or_else(|| unknown("<none>"))?,
            }),
            ActionType::CreateWaterSource => Placement::Water(match entity_type {
                Some(name) => catalog::find_water(kind, name).ok_or_else(|| unknown(name))?,
                None => pick(catalog::water_templates(kind), &mut rng)
                    .ok_or_else(|| unknown("<none>"))?,
            }),
            ActionType::BuildStructure => {
                let name = entity_type.unwrap_or(catalog::DEFAULT_STRUCTURE_KIND);
                Placement::Structure(catalog::find_structure(name).ok_or_else(|| unknown(name))?)
            }
            ActionType::RemoveInvasive => Placement::RemoveInvasive,
            ActionType::CleanPollution => Placement::CleanPollution,
        };
        Ok(placement)
    }

    fn place(&mut self, region_id: &str, position: Position, placement: Placement) -> Option<String> {
        match placement {
            Placement::Plant(template) => self.spawn_plant(region_id, position, template),
            Placement::Animal(template) => self.spawn_animal(region_id, position, template),
            Placement::Water(template) => self.spawn_water(region_id, position, template),
            Placement::Structure(template) => self.spawn_structure(region_id, position, template),
            Placement::RemoveInvasive => {
                self.remove_invasive(region_id, position);
                None
            }
            Placement::CleanPollution => {
                self.clean_pollution(region_id, position);
                None
            }
        }
    }

    /// Plants a seedling of `species` (name or template key). Skips cost and
    /// applicability checks; use `perform_action` for player input.
    pub fn plant_tree(&mut self, region_id: &str, position: Position, species: &str) -> Option<String> {
        let kind = self.region_kind(region_id)?;
        let Some(template) = catalog::find_plant(kind, species) else {
            tracing::warn!(region = region_id, species, "no plant template");
            return None;
        };
        self.spawn_plant(region_id, position, template)
    }

    pub fn introduce_animal(
        &mut self,
        region_id: &str,
        position: Position,
        species: &str,
    ) -> Option<String> {
        let kind = self.region_kind(region_id)?;
        let Some(template) = catalog::find_animal(kind, species) else {
            tracing::warn!(region = region_id, species, "no animal template");
            return None;
        };
        self.spawn_animal(region_id, position, template)
    }

    pub fn create_water_source(
        &mut self,
        region_id: &str,
        position: Position,
        water_type: &str,
    ) -> Option<String> {
        let kind = self.region_kind(region_id)?;
        let Some(template) = catalog::find_water(kind, water_type) else {
            tracing::warn!(region = region_id, water_type, "no water template");
            return None;
        };
        self.spawn_water(region_id, position, template)
    }

    pub fn build_structure(
        &mut self,
        region_id: &str,
        position: Position,
        structure_type: &str,
    ) -> Option<String> {
        self.region_kind(region_id)?;
        let Some(template) = catalog::find_structure(structure_type) else {
            tracing::warn!(region = region_id, structure_type, "no structure template");
            return None;
        };
        self.spawn_structure(region_id, position, template)
    }

    /// Biodiversity +5, health +3.
    pub fn remove_invasive(&mut self, region_id: &str, _position: Position) -> bool {
        let Some(region) = self.lookup_mut(region_id) else {
            return false;
        };
        region.adjust(Metric::Biodiversity, 5.0);
        region.adjust(Metric::Health, 3.0);
        true
    }

    /// Pollution −8, water quality +5.
    pub fn clean_pollution(&mut self, region_id: &str, _position: Position) -> bool {
        let Some(region) = self.lookup_mut(region_id) else {
            return false;
        };
        region.adjust(Metric::PollutionLevel, -8.0);
        region.adjust(Metric::WaterQuality, 5.0);
        self.world.stats.pollution_cleaned += 1;
        true
    }

    /// Attaches a random applicable event to the region, returning its id.
    pub fn trigger_random_event(&mut self, region_id: &str) -> Option<String> {
        let Some(region) = self.world.region_mut(region_id) else {
            tracing::warn!(region = region_id, "cannot roll an event for unknown region");
            return None;
        };
        let mut rng = self.rng.stream(DisturbanceSystem::NAME);
        systems::attach_random_event(region, &self.events, &mut rng)
    }

    /// Changes the selected region and clears the selected position.
    pub fn select_region(&mut self, region_id: Option<&str>) {
        if let Some(id) = region_id {
            if self.world.region(id).is_none() {
                tracing::warn!(region = id, "cannot select unknown region");
                return;
            }
        }
        self.world.selected_region_id = region_id.map(str::to_string);
        self.world.selected_position = None;
    }

    pub fn select_position(&mut self, position: Option<Position>) {
        self.world.selected_position = position;
    }

    /// Adds (or with a negative amount, withdraws) resources.
    pub fn add_resources(&mut self, amount: i64) {
        self.world.resources += amount;
    }

    pub fn note_research_completed(&mut self) {
        self.world.stats.technologies_researched += 1;
    }

    pub fn note_event_resolved(&mut self) {
        self.world.stats.events_resolved += 1;
    }

    fn region_kind(&self, region_id: &str) -> Option<EcosystemType> {
        let kind = self.world.region(region_id).map(|region| region.kind);
        if kind.is_none() {
            tracing::warn!(region = region_id, "unknown region");
        }
        kind
    }

    fn lookup_mut(&mut self, region_id: &str) -> Option<&mut Region> {
        let region = self.world.region_mut(region_id);
        if region.is_none() {
            tracing::warn!(region = region_id, "unknown region");
        }
        region
    }

    fn spawn_plant(
        &mut self,
        region_id: &str,
        position: Position,
        template: &PlantTemplate,
    ) -> Option<String> {
        let id = entity_id("plant", &mut self.rng.stream(ACTION_STREAM));
        let region = self.world.region_mut(region_id)?;
        region.plants.push(template.instantiate(id.clone(), position));
        self.world.stats.plants_planted += 1;
        Some(id)
    }

    fn spawn_animal(
        &mut self,
        region_id: &str,
        position: Position,
        template: &AnimalTemplate,
    ) -> Option<String> {
        let id = entity_id("animal", &mut self.rng.stream(ACTION_STREAM));
        let region = self.world.region_mut(region_id)?;
        region.animals.push(template.instantiate(id.clone(), position));
        self.world.stats.animals_introduced += 1;
        Some(id)
    }

    fn spawn_water(
        &mut self,
        region_id: &str,
        position: Position,
        template: &WaterTemplate,
    ) -> Option<String> {
        let id = entity_id("water", &mut self.rng.stream(ACTION_STREAM));
        let region = self.world.region_mut(region_id)?;
        region
            .water_sources
            .push(template.instantiate(id.clone(), position));
        Some(id)
    }

    fn spawn_structure(
        &mut self,
        region_id: &str,
        position: Position,
        template: &StructureTemplate,
    ) -> Option<String> {
        let id = entity_id("structure", &mut self.rng.stream(ACTION_STREAM));
        let region = self.world.region_mut(region_id)?;
        region
            .structures
            .push(template.instantiate(id.clone(), position));
        Some(id)
    }
}

impl RegionHost for Engine {
    fn regions(&self) -> &[Region] {
        &self.world.regions
    }

    fn regions_mut(&mut self) -> &mut [Region] {
        &mut self.world.regions
    }

    fn event_registry(&self) -> &EventRegistry {
        &self.events
    }

    fn event_registry_mut(&mut self) -> &mut EventRegistry {
        &mut self.events
    }
}

fn pick<'t, T, R: Rng + ?Sized>(templates: &'t [T], rng: &mut R) -> Option<&'t T> {
    if templates.is_empty() {
        return None;
    }
    Some(&templates[rng.gen_range(0..templates.len())])
}
