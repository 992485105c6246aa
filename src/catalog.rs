//! Static reference data: species, water and structure templates keyed by
//! ecosystem type, the player action table and the starting regions.
//!
//! Templates are `&'static` definitions. Every placed entity is produced by
//! an explicit `instantiate` call, so no two entities ever share state with
//! each other or with the catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::{
    Animal, EcosystemType, Effect, Metric, Plant, Position, Region, Size, Structure, WaterKind,
    WaterSource,
};

const ALL_TYPES: &[EcosystemType] = &[
    EcosystemType::Rainforest,
    EcosystemType::Wetland,
    EcosystemType::Desert,
];

#[derive(Debug, Clone, Copy)]
pub struct PlantTemplate {
    pub key: &'static str,
    pub species: &'static str,
    pub maturity: f64,
    pub health: f64,
    pub is_native: bool,
    pub effects: &'static [Effect],
}

impl PlantTemplate {
    /// Seedlings always start at maturity 0, whatever the template says.
    pub fn instantiate(&self, id: String, position: Position) -> Plant {
        Plant {
            id,
            species: self.species.to_string(),
            position,
            maturity: 0.0,
            health: self.health,
            is_native: self.is_native,
            effects: self.effects.to_vec(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.key == name || self.species.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnimalTemplate {
    pub key: &'static str,
    pub species: &'static str,
    pub population: u32,
    pub health: f64,
    pub is_native: bool,
    pub effects: &'static [Effect],
}

impl AnimalTemplate {
    pub fn instantiate(&self, id: String, position: Position) -> Animal {
        Animal {
            id,
            species: self.species.to_string(),
            position,
            population: self.population,
            health: self.health,
            is_native: self.is_native,
            effects: self.effects.to_vec(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.key == name || self.species.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaterTemplate {
    pub key: &'static str,
    pub kind: WaterKind,
    pub size: f64,
    pub flow: f64,
    pub quality: f64,
    pub effects: &'static [Effect],
}

impl WaterTemplate {
    pub fn instantiate(&self, id: String, position: Position) -> WaterSource {
        WaterSource {
            id,
            kind: self.kind,
            position,
            size: self.size,
            flow: self.flow,
            quality: self.quality,
            effects: self.effects.to_vec(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.key == name || self.kind.as_str().eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StructureTemplate {
    pub kind: &'static str,
    pub name: &'static str,
    pub efficiency: f64,
    pub tech_required: Option<&'static str>,
    pub effects: &'static [Effect],
}

impl StructureTemplate {
    pub fn instantiate(&self, id: String, position: Position) -> Structure {
        Structure {
            id,
            kind: self.kind.to_string(),
            name: self.name.to_string(),
            position,
            efficiency: self.efficiency,
            tech_required: self.tech_required.map(str::to_string),
            effects: self.effects.to_vec(),
        }
    }
}

const RAINFOREST_PLANTS: &[PlantTemplate] = &[
    PlantTemplate {
        key: "rainforest_tree_1",
        species: "Emergent Tree",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Health, 2.0, 3.0),
            Effect::new(Metric::Biodiversity, 3.0, 5.0),
        ],
    },
    PlantTemplate {
        key: "rainforest_tree_2",
        species: "Canopy Tree",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Health, 1.5, 2.0),
            Effect::new(Metric::Biodiversity, 2.0, 4.0),
        ],
    },
    PlantTemplate {
        key: "rainforest_understory",
        species: "Understory Plant",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Health, 1.0, 1.0),
            Effect::new(Metric::WaterQuality, 0.5, 2.0),
        ],
    },
];

const DESERT_PLANTS: &[PlantTemplate] = &[
    PlantTemplate {
        key: "desert_cactus",
        species: "Saguaro Cactus",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Health, 1.0, 2.0),
            Effect::new(Metric::WaterQuality, 0.5, 1.0),
        ],
    },
    PlantTemplate {
        key: "desert_shrub",
        species: "Desert Shrub",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Health, 0.8, 1.0),
            Effect::new(Metric::PollutionLevel, -0.5, 2.0),
        ],
    },
    PlantTemplate {
        key: "desert_succulent",
        species: "Desert Succulent",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Health, 0.5, 1.0),
            Effect::new(Metric::Biodiversity, 1.0, 1.0),
        ],
    },
];

const WETLAND_PLANTS: &[PlantTemplate] = &[
    PlantTemplate {
        key: "wetland_reeds",
        species: "Cattail Reeds",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::WaterQuality, 2.0, 3.0),
            Effect::new(Metric::Health, 1.0, 2.0),
        ],
    },
    PlantTemplate {
        key: "wetland_mangrove",
        species: "Mangrove Tree",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::PollutionLevel, -2.0, 4.0),
            Effect::new(Metric::Biodiversity, 3.0, 3.0),
        ],
    },
    PlantTemplate {
        key: "wetland_lilies",
        species: "Water Lilies",
        maturity: 0.0,
        health: 100.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::WaterQuality, 1.5, 2.0),
            Effect::new(Metric::Biodiversity, 1.0, 2.0),
        ],
    },
];

const RAINFOREST_ANIMALS: &[AnimalTemplate] = &[
    AnimalTemplate {
        key: "rainforest_monkey",
        species: "Capuchin Monkey",
        population: 10,
        health: 80.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Biodiversity, 3.0, 5.0),
            Effect::new(Metric::Health, 1.0, 4.0),
        ],
    },
    AnimalTemplate {
        key: "rainforest_bird",
        species: "Toucan",
        population: 15,
        health: 90.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Biodiversity, 2.0, 7.0),
            Effect::new(Metric::Health, 0.5, 6.0),
        ],
    },
    AnimalTemplate {
        key: "rainforest_insect",
        species: "Leaf-cutter Ant",
        population: 1000,
        health: 100.0,
        is_native: true,
        effects: &[Effect::new(Metric::Health, 0.8, 2.0)],
    },
];

const DESERT_ANIMALS: &[AnimalTemplate] = &[
    AnimalTemplate {
        key: "desert_lizard",
        species: "Desert Lizard",
        population: 30,
        health: 95.0,
        is_native: true,
        effects: &[Effect::new(Metric::Biodiversity, 1.5, 3.0)],
    },
    AnimalTemplate {
        key: "desert_fox",
        species: "Desert Fox",
        population: 8,
        health: 85.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Biodiversity, 2.0, 4.0),
            Effect::new(Metric::Health, 0.5, 3.0),
        ],
    },
    AnimalTemplate {
        key: "desert_scorpion",
        species: "Desert Scorpion",
        population: 50,
        health: 100.0,
        is_native: true,
        effects: &[Effect::new(Metric::Biodiversity, 1.0, 2.0)],
    },
];

const WETLAND_ANIMALS: &[AnimalTemplate] = &[
    AnimalTemplate {
        key: "wetland_frog",
        species: "Marsh Frog",
        population: 100,
        health: 90.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::Biodiversity, 2.0, 3.0),
            Effect::new(Metric::WaterQuality, 1.0, 2.0),
        ],
    },
    AnimalTemplate {
        key: "wetland_bird",
        species: "Heron",
        population: 12,
        health: 95.0,
        is_native: true,
        effects: &[Effect::new(Metric::Biodiversity, 3.0, 5.0)],
    },
    AnimalTemplate {
        key: "wetland_fish",
        species: "Marsh Fish",
        population: 200,
        health: 85.0,
        is_native: true,
        effects: &[
            Effect::new(Metric::WaterQuality, 2.0, 4.0),
            Effect::new(Metric::Biodiversity, 1.5, 3.0),
        ],
    },
];

const RAINFOREST_WATER: &[WaterTemplate] = &[WaterTemplate {
    key: "rainforest_river",
    kind: WaterKind::River,
    size: 2.0,
    flow: 90.0,
    quality: 85.0,
    effects: &[
        Effect::new(Metric::WaterQuality, 3.0, 5.0),
        Effect::new(Metric::Health, 2.0, 4.0),
    ],
}];

const DESERT_WATER: &[WaterTemplate] = &[WaterTemplate {
    key: "desert_oasis",
    kind: WaterKind::Pond,
    size: 1.0,
    flow: 30.0,
    quality: 75.0,
    effects: &[
        Effect::new(Metric::WaterQuality, 2.0, 3.0),
        Effect::new(Metric::Health, 3.0, 4.0),
    ],
}];

const WETLAND_WATER: &[WaterTemplate] = &[WaterTemplate {
    key: "wetland_marsh",
    kind: WaterKind::Lake,
    size: 3.0,
    flow: 20.0,
    quality: 80.0,
    effects: &[
        Effect::new(Metric::WaterQuality, 4.0, 6.0),
        Effect::new(Metric::Biodiversity, 3.0, 5.0),
    ],
}];

const STRUCTURE_EFFECTS: &[Effect] = &[
    Effect::new(Metric::Health, 1.0, 5.0),
    Effect::new(Metric::PollutionLevel, -2.0, 4.0),
];

pub const DEFAULT_STRUCTURE_KIND: &str = "monitoring";

const STRUCTURES: &[StructureTemplate] = &[
    StructureTemplate {
        kind: "monitoring",
        name: "Monitoring Station",
        efficiency: 100.0,
        tech_required: Some("basic_monitoring"),
        effects: STRUCTURE_EFFECTS,
    },
    StructureTemplate {
        kind: "research_outpost",
        name: "Research Outpost",
        efficiency: 100.0,
        tech_required: Some("basic_monitoring"),
        effects: STRUCTURE_EFFECTS,
    },
];

pub fn plant_templates(kind: EcosystemType) -> &'static [PlantTemplate] {
    match kind {
        EcosystemType::Rainforest => RAINFOREST_PLANTS,
        EcosystemType::Desert => DESERT_PLANTS,
        EcosystemType::Wetland => WETLAND_PLANTS,
    }
}

pub fn animal_templates(kind: EcosystemType) -> &'static [AnimalTemplate] {
    match kind {
        EcosystemType::Rainforest => RAINFOREST_ANIMALS,
        EcosystemType::Desert => DESERT_ANIMALS,
        EcosystemType::Wetland => WETLAND_ANIMALS,
    }
}

pub fn water_templates(kind: EcosystemType) -> &'static [WaterTemplate] {
    match kind {
        EcosystemType::Rainforest => RAINFOREST_WATER,
        EcosystemType::Desert => DESERT_WATER,
        EcosystemType::Wetland => WETLAND_WATER,
    }
}

pub fn find_plant(kind: EcosystemType, name: &str) -> Option<&'static PlantTemplate> {
    plant_templates(kind).iter().find(|t| t.matches(name))
}

pub fn find_animal(kind: EcosystemType, name: &str) -> Option<&'static AnimalTemplate> {
    animal_templates(kind).iter().find(|t| t.matches(name))
}

pub fn find_water(kind: EcosystemType, name: &str) -> Option<&'static WaterTemplate> {
    water_templates(kind).iter().find(|t| t.matches(name))
}

pub fn find_structure(kind: &str) -> Option<&'static StructureTemplate> {
    STRUCTURES.iter().find(|t| t.kind == kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    PlantTree,
    IntroduceAnimal,
    CreateWaterSource,
    RemoveInvasive,
    CleanPollution,
    BuildStructure,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        ActionType::PlantTree,
        ActionType::IntroduceAnimal,
        ActionType::CreateWaterSource,
        ActionType::RemoveInvasive,
        ActionType::CleanPollution,
        ActionType::BuildStructure,
    ];

    /// Name used by action definitions and technology effect targets.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::PlantTree => "plantTree",
            ActionType::IntroduceAnimal => "introduceAnimal",
            ActionType::CreateWaterSource => "createWaterSource",
            ActionType::RemoveInvasive => "removeInvasive",
            ActionType::CleanPollution => "cleanPollution",
            ActionType::BuildStructure => "buildStructure",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action type `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for ActionType {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActionDefinition {
    pub action: ActionType,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u32,
    pub tech_required: Option<&'static str>,
    pub effects: &'static [Effect],
    pub applicable_regions: &'static [EcosystemType],
}

impl ActionDefinition {
    pub fn applies_to(&self, kind: EcosystemType) -> bool {
        self.applicable_regions.contains(&kind)
    }
}

const ACTIONS: &[ActionDefinition] = &[
    ActionDefinition {
        action: ActionType::PlantTree,
        name: "Plant Native Trees",
        description: "Introduce native tree species to improve ecosystem health and biodiversity.",
        cost: 10,
        tech_required: None,
        effects: &[
            Effect::new(Metric::Health, 2.0, 3.0),
            Effect::new(Metric::Biodiversity, 1.5, 2.0),
        ],
        applicable_regions: ALL_TYPES,
    },
    ActionDefinition {
        action: ActionType::IntroduceAnimal,
        name: "Reintroduce Native Species",
        description: "Reintroduce native animal species to restore ecological balance.",
        cost: 20,
        tech_required: None,
        effects: &[Effect::new(Metric::Biodiversity, 3.0, 4.0)],
        applicable_regions: ALL_TYPES,
    },
    ActionDefinition {
        action: ActionType::CreateWaterSource,
        name: "Create Water Source",
        description: "Develop a water source to support the local ecosystem.",
        cost: 30,
        tech_required: None,
        effects: &[
            Effect::new(Metric::WaterQuality, 4.0, 5.0),
            Effect::new(Metric::Health, 2.0, 3.0),
        ],
        applicable_regions: ALL_TYPES,
    },
    ActionDefinition {
        action: ActionType::RemoveInvasive,
        name: "Remove Invasive Species",
        description: "Clear invasive species that harm the native ecosystem.",
        cost: 15,
        tech_required: None,
        effects: &[
            Effect::new(Metric::Health, 1.0, 2.0),
            Effect::new(Metric::Biodiversity, 2.0, 3.0),
        ],
        applicable_regions: ALL_TYPES,
    },
    ActionDefinition {
        action: ActionType::CleanPollution,
        name: "Clean Pollution",
        description: "Remove pollutants to improve environmental health.",
        cost: 25,
        tech_required: None,
        effects: &[
            Effect::new(Metric::PollutionLevel, -5.0, 4.0),
            Effect::new(Metric::WaterQuality, 3.0, 3.0),
        ],
        applicable_regions: ALL_TYPES,
    },
    ActionDefinition {
        action: ActionType::BuildStructure,
        name: "Build Monitoring Station",
        description: "Construct a station to monitor ecosystem health.",
        cost: 40,
        tech_required: Some("basic_monitoring"),
        effects: &[
            Effect::new(Metric::Health, 0.5, 6.0),
            Effect::new(Metric::PollutionLevel, -1.0, 5.0),
        ],
        applicable_regions: ALL_TYPES,
    },
];

pub fn default_actions() -> &'static [ActionDefinition] {
    ACTIONS
}

pub fn action_definition(action: ActionType) -> Option<&'static ActionDefinition> {
    ACTIONS.iter().find(|def| def.action == action)
}

fn empty_region(
    id: &str,
    kind: EcosystemType,
    name: &str,
    x: f64,
    metrics: [f64; 4],
) -> Region {
    let [health, biodiversity, water_quality, pollution_level] = metrics;
    Region {
        id: id.to_string(),
        kind,
        name: name.to_string(),
        position: Position::new(x, 0.0, 0.0),
        size: Size {
            width: 10.0,
            height: 10.0,
        },
        health,
        biodiversity,
        water_quality,
        pollution_level,
        plants: Vec::new(),
        animals: Vec::new(),
        water_sources: Vec::new(),
        structures: Vec::new(),
        active_events: Vec::new(),
    }
}

/// The three degraded regions every new game starts with.
pub fn initial_regions() -> Vec<Region> {
    vec![
        empty_region(
            "region_rainforest",
            EcosystemType::Rainforest,
            "Amazon Basin",
            -15.0,
            [30.0, 25.0, 40.0, 60.0],
        ),
        empty_region(
            "region_desert",
            EcosystemType::Desert,
            "Sonoran Desert",
            0.0,
            [20.0, 15.0, 10.0, 40.0],
        ),
        empty_region(
            "region_wetland",
            EcosystemType::Wetland,
            "Coastal Marshes",
            15.0,
            [25.0, 30.0, 35.0, 70.0],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_region_type_has_templates() {
        for kind in EcosystemType::ALL {
            assert_eq!(plant_templates(kind).len(), 3, "{kind:?} plants");
            assert_eq!(animal_templates(kind).len(), 3, "{kind:?} animals");
            assert_eq!(water_templates(kind).len(), 1, "{kind:?} water");
        }
    }

    #[test]
    fn lookups_accept_species_and_key() {
        let by_species = find_plant(EcosystemType::Wetland, "Mangrove Tree").unwrap();
        let by_key = find_plant(EcosystemType::Wetland, "wetland_mangrove").unwrap();
        assert_eq!(by_species.key, by_key.key);
        assert!(find_plant(EcosystemType::Desert, "Mangrove Tree").is_none());
        assert_eq!(
            find_water(EcosystemType::Desert, "pond").unwrap().key,
            "desert_oasis"
        );
        assert!(find_water(EcosystemType::Rainforest, "pond").is_none());
    }

    #[test]
    fn action_names_parse_back() {
        for action in ActionType::ALL {
            assert_eq!(action.as_str().parse::<ActionType>().unwrap(), action);
            assert!(action_definition(action).is_some());
        }
        assert!("plantFlowers".parse::<ActionType>().is_err());
    }

    #[test]
    fn instantiated_plant_owns_its_effects() {
        let template = &plant_templates(EcosystemType::Rainforest)[0];
        let mut plant = template.instantiate("plant_a".into(), Position::new(1.0, 0.0, 2.0));
        plant.effects[0].magnitude = 99.0;
        assert_eq!(template.effects[0].magnitude, 2.0);
        assert_eq!(plant.position, Position::new(1.0, 0.0, 2.0));
    }
}
