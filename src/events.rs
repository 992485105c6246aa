//! Environmental events: the static catalog, random selection per region
//! type, and the health-driven trigger probability.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::world::{EcosystemType, Metric};

/// What an event or choice effect acts on. The last three are population
/// categories with no direct metric effect yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTarget {
    Health,
    Biodiversity,
    WaterQuality,
    PollutionLevel,
    Plants,
    Animals,
    Water,
}

impl EventTarget {
    pub fn metric(self) -> Option<Metric> {
        match self {
            EventTarget::Health => Some(Metric::Health),
            EventTarget::Biodiversity => Some(Metric::Biodiversity),
            EventTarget::WaterQuality => Some(Metric::WaterQuality),
            EventTarget::PollutionLevel => Some(Metric::PollutionLevel),
            EventTarget::Plants | EventTarget::Animals | EventTarget::Water => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventEffect {
    pub target: EventTarget,
    pub magnitude: f64,
    pub duration: u32,
}

impl EventEffect {
    pub const fn new(target: EventTarget, magnitude: f64, duration: u32) -> Self {
        Self {
            target,
            magnitude,
            duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChoice {
    pub id: String,
    pub text: String,
    pub effects: Vec<EventEffect>,
    #[serde(default)]
    pub tech_required: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration: u32,
    pub target_region_types: Vec<EcosystemType>,
    pub effects: Vec<EventEffect>,
    #[serde(default)]
    pub choices: Vec<EventChoice>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub time_remaining: Option<i64>,
}

impl GameEvent {
    /// Produces a live copy of a catalog entry with its countdown armed.
    pub fn activate(&self) -> GameEvent {
        let mut instance = self.clone();
        instance.is_active = true;
        instance.time_remaining = Some(i64::from(self.duration));
        instance
    }

    pub fn applies_to(&self, kind: EcosystemType) -> bool {
        self.target_region_types.contains(&kind)
    }

    pub fn choice(&self, choice_id: &str) -> Option<&EventChoice> {
        self.choices.iter().find(|choice| choice.id == choice_id)
    }
}

#[derive(Debug, Clone, Copy)]
struct ChoiceDefinition {
    id: &'static str,
    text: &'static str,
    effects: &'static [EventEffect],
    tech_required: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
struct EventDefinition {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    duration: u32,
    target_region_types: &'static [EcosystemType],
    effects: &'static [EventEffect],
    choices: &'static [ChoiceDefinition],
}

impl EventDefinition {
    fn to_event(self) -> GameEvent {
        GameEvent {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            duration: self.duration,
            target_region_types: self.target_region_types.to_vec(),
            effects: self.effects.to_vec(),
            choices: self
                .choices
                .iter()
                .map(|choice| EventChoice {
                    id: choice.id.to_string(),
                    text: choice.text.to_string(),
                    effects: choice.effects.to_vec(),
                    tech_required: choice.tech_required.map(str::to_string),
                })
                .collect(),
            is_active: false,
            time_remaining: None,
        }
    }
}

use crate::world::EcosystemType::{Desert, Rainforest, Wetland};
use self::EventTarget::{Animals, Biodiversity, Health, Plants, PollutionLevel, WaterQuality};

const EVENT_CATALOG: &[EventDefinition] = &[
    EventDefinition {
        id: "drought",
        name: "Severe Drought",
        description: "A severe drought is affecting the region, threatening plant life and water sources.",
        duration: 5,
        target_region_types: &[Rainforest, Desert, Wetland],
        effects: &[
            EventEffect::new(Health, -10.0, 5),
            EventEffect::new(WaterQuality, -15.0, 5),
            EventEffect::new(Plants, -20.0, 5),
        ],
        choices: &[
            ChoiceDefinition {
                id: "water_conservation",
                text: "Implement emergency water conservation measures",
                effects: &[
                    EventEffect::new(WaterQuality, 5.0, 5),
                    EventEffect::new(Health, -5.0, 2),
                ],
                tech_required: None,
            },
            ChoiceDefinition {
                id: "drought_resistant",
                text: "Plant drought-resistant species",
                effects: &[
                    EventEffect::new(Health, 10.0, 10),
                    EventEffect::new(Biodiversity, -5.0, 3),
                ],
                tech_required: Some("advanced_planting"),
            },
        ],
    },
    EventDefinition {
        id: "wildfire",
        name: "Wildfire",
        description: "A wildfire has broken out, threatening to destroy vegetation and wildlife.",
        duration: 3,
        target_region_types: &[Rainforest, Desert],
        effects: &[
            EventEffect::new(Health, -20.0, 3),
            EventEffect::new(Biodiversity, -15.0, 3),
            EventEffect::new(Plants, -30.0, 3),
        ],
        choices: &[
            ChoiceDefinition {
                id: "fire_containment",
                text: "Deploy containment measures",
                effects: &[EventEffect::new(Health, 10.0, 2)],
                tech_required: None,
            },
            ChoiceDefinition {
                id: "controlled_burn",
                text: "Implement controlled burn strategy",
                effects: &[
                    EventEffect::new(Health, 15.0, 5),
                    EventEffect::new(Biodiversity, 10.0, 7),
                ],
                tech_required: Some("ecosystem_engineering"),
            },
        ],
    },
    EventDefinition {
        id: "pollution_spill",
        name: "Industrial Pollution Spill",
        description: "An industrial accident has released pollutants into the ecosystem.",
        duration: 7,
        target_region_types: &[Rainforest, Wetland],
        effects: &[
            EventEffect::new(PollutionLevel, 25.0, 7),
            EventEffect::new(WaterQuality, -20.0, 7),
            EventEffect::new(Animals, -15.0, 5),
        ],
        choices: &[
            ChoiceDefinition {
                id: "cleanup_operation",
                text: "Launch immediate cleanup operation",
                effects: &[
                    EventEffect::new(PollutionLevel, -15.0, 3),
                    EventEffect::new(WaterQuality, 10.0, 4),
                ],
                tech_required: None,
            },
            ChoiceDefinition {
                id: "bioremediation",
                text: "Deploy bioremediation techniques",
                effects: &[
                    EventEffect::new(PollutionLevel, -25.0, 5),
                    EventEffect::new(WaterQuality, 20.0, 6),
                    EventEffect::new(Health, 10.0, 4),
                ],
                tech_required: Some("microbial_remediation"),
            },
        ],
    },
    EventDefinition {
        id: "invasive_species",
        name: "Invasive Species Outbreak",
        description: "An invasive species is spreading rapidly, threatening native flora and fauna.",
        duration: 6,
        target_region_types: &[Rainforest, Wetland, Desert],
        effects: &[
            EventEffect::new(Biodiversity, -20.0, 6),
            EventEffect::new(Health, -10.0, 4),
            EventEffect::new(Plants, -15.0, 5),
        ],
        choices: &[
            ChoiceDefinition {
                id: "manual_removal",
                text: "Organize manual removal campaign",
                effects: &[
                    EventEffect::new(Biodiversity, 10.0, 3),
                    EventEffect::new(Health, 5.0, 2),
                ],
                tech_required: None,
            },
            ChoiceDefinition {
                id: "targeted_management",
                text: "Implement targeted ecosystem management",
                effects: &[
                    EventEffect::new(Biodiversity, 20.0, 6),
                    EventEffect::new(Health, 15.0, 5),
                    EventEffect::new(Plants, 10.0, 4),
                ],
                tech_required: Some("biodiversity_management"),
            },
        ],
    },
    EventDefinition {
        id: "flood",
        name: "Severe Flooding",
        description: "Extreme rainfall has caused flooding, impacting the ecosystem.",
        duration: 4,
        target_region_types: &[Rainforest, Wetland],
        effects: &[
            EventEffect::new(WaterQuality, -15.0, 4),
            EventEffect::new(Health, -10.0, 3),
            EventEffect::new(Animals, -10.0, 2),
        ],
        choices: &[
            ChoiceDefinition {
                id: "flood_barriers",
                text: "Deploy temporary flood barriers",
                effects: &[
                    EventEffect::new(WaterQuality, 5.0, 2),
                    EventEffect::new(Health, 8.0, 3),
                ],
                tech_required: None,
            },
            ChoiceDefinition {
                id: "natural_buffers",
                text: "Enhance natural flood buffers",
                effects: &[
                    EventEffect::new(WaterQuality, 15.0, 5),
                    EventEffect::new(Health, 12.0, 4),
                    EventEffect::new(Biodiversity, 10.0, 6),
                ],
                tech_required: Some("water_purification"),
            },
        ],
    },
];

pub fn default_events() -> Vec<GameEvent> {
    EVENT_CATALOG.iter().map(|def| def.to_event()).collect()
}

/// Probability that a region with the given health triggers an event this
/// cycle: 0.5 at health 0 down to 0.1 at health 100.
pub fn calculate_event_chance(health: f64) -> f64 {
    0.5 - health / 250.0
}

#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    catalog: Vec<GameEvent>,
}

impl EventRegistry {
    pub fn new(catalog: Vec<GameEvent>) -> Self {
        Self { catalog }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_events())
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.catalog
    }

    pub fn find(&self, event_id: &str) -> Option<&GameEvent> {
        self.catalog.iter().find(|event| event.id == event_id)
    }

    pub fn add_custom_event(&mut self, event: GameEvent) {
        tracing::debug!(event = %event.id, "custom event registered");
        self.catalog.push(event);
    }

    /// Uniform pick among inactive catalog entries that target `kind`,
    /// returned as an independent copy.
    pub fn get_random_event<R: Rng + ?Sized>(
        &self,
        kind: EcosystemType,
        rng: &mut R,
    ) -> Option<GameEvent> {
        let candidates: Vec<&GameEvent> = self
            .catalog
            .iter()
            .filter(|event| !event.is_active && event.applies_to(kind))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..candidates.len());
        Some(candidates[index].clone())
    }
}
