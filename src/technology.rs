use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Effect target matching every action in bonus queries.
pub const ALL_ACTIONS: &str = "all_actions";

pub const RESEARCH_COMPLETE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechEffectKind {
    Efficiency,
    CostReduction,
    NewAbility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechEffect {
    pub kind: TechEffectKind,
    pub target: String,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: u32,
    pub effects: Vec<TechEffect>,
    pub prerequisite: Option<String>,
    pub unlocked: bool,
    pub researched: bool,
}

impl Technology {
    fn effect_total(&self, kind: TechEffectKind, action: &str) -> f64 {
        self.effects
            .iter()
            .filter(|effect| {
                effect.kind == kind && (effect.target == action || effect.target == ALL_ACTIONS)
            })
            .map(|effect| effect.magnitude)
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct TechDefinition {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    cost: u32,
    effects: &'static [(TechEffectKind, &'static str, f64)],
    prerequisite: Option<&'static str>,
}

use self::TechEffectKind::{CostReduction, Efficiency, NewAbility};

const TECH_TREE: &[TechDefinition] = &[
    TechDefinition {
        id: "basic_monitoring",
        name: "Basic Ecosystem Monitoring",
        description: "Simple tools to monitor ecosystem health and track changes.",
        cost: 50,
        effects: &[(Efficiency, ALL_ACTIONS, 10.0)],
        prerequisite: None,
    },
    TechDefinition {
        id: "advanced_planting",
        name: "Advanced Planting Techniques",
        description: "Improved methods for planting and nurturing native vegetation.",
        cost: 75,
        effects: &[
            (Efficiency, "plantTree", 25.0),
            (CostReduction, "plantTree", 20.0),
        ],
        prerequisite: Some("basic_monitoring"),
    },
    TechDefinition {
        id: "wildlife_tracking",
        name: "Wildlife Tracking Systems",
        description: "Technology to monitor and protect reintroduced animal species.",
        cost: 100,
        effects: &[
            (Efficiency, "introduceAnimal", 30.0),
            (NewAbility, "animal_monitoring", 1.0),
        ],
        prerequisite: Some("basic_monitoring"),
    },
    TechDefinition {
        id: "water_purification",
        name: "Water Purification Methods",
        description: "Advanced techniques for cleaning and maintaining water sources.",
        cost: 125,
        effects: &[
            (Efficiency, "createWaterSource", 35.0),
            (Efficiency, "cleanPollution", 20.0),
        ],
        prerequisite: Some("basic_monitoring"),
    },
    TechDefinition {
        id: "biodiversity_management",
        name: "Biodiversity Management",
        description: "Comprehensive approach to maintaining diverse ecosystem balance.",
        cost: 150,
        effects: &[
            (Efficiency, "biodiversity", 30.0),
            (Efficiency, "removeInvasive", 40.0),
        ],
        prerequisite: Some("advanced_planting"),
    },
    TechDefinition {
        id: "drone_monitoring",
        name: "Drone Monitoring Systems",
        description: "Automated drones for widespread ecosystem monitoring and data collection.",
        cost: 200,
        effects: &[
            (Efficiency, "all_monitoring", 50.0),
            (NewAbility, "automated_data", 1.0),
        ],
        prerequisite: Some("wildlife_tracking"),
    },
    TechDefinition {
        id: "sustainable_agriculture",
        name: "Sustainable Agriculture",
        description: "Farming methods that work with natural ecosystems rather than against them.",
        cost: 175,
        effects: &[
            (Efficiency, "health", 25.0),
            (CostReduction, ALL_ACTIONS, 15.0),
        ],
        prerequisite: Some("biodiversity_management"),
    },
    TechDefinition {
        id: "microbial_remediation",
        name: "Microbial Remediation",
        description: "Using microorganisms to clean polluted soil and water.",
        cost: 225,
        effects: &[
            (Efficiency, "cleanPollution", 60.0),
            (Efficiency, "waterQuality", 40.0),
        ],
        prerequisite: Some("water_purification"),
    },
    TechDefinition {
        id: "ecosystem_engineering",
        name: "Ecosystem Engineering",
        description: "Advanced techniques for large-scale ecosystem restoration and design.",
        cost: 300,
        effects: &[
            (Efficiency, ALL_ACTIONS, 40.0),
            (NewAbility, "create_biome", 1.0),
        ],
        prerequisite: Some("drone_monitoring"),
    },
];

/// The built-in technology tree. Only prerequisite-free entries start unlocked.
pub fn default_technologies() -> Vec<Technology> {
    TECH_TREE
        .iter()
        .map(|def| Technology {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            cost: def.cost,
            effects: def
                .effects
                .iter()
                .map(|(kind, target, magnitude)| TechEffect {
                    kind: *kind,
                    target: target.to_string(),
                    magnitude: *magnitude,
                })
                .collect(),
            prerequisite: def.prerequisite.map(str::to_string),
            unlocked: def.prerequisite.is_none(),
            researched: false,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchState {
    Locked,
    Unlocked,
    Researching,
    Researched,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResearchError {
    #[error("unknown technology `{0}`")]
    UnknownTechnology(String),
    #[error("technology `{0}` is still locked")]
    Locked(String),
    #[error("technology `{0}` is already researched")]
    AlreadyResearched(String),
    #[error("research on `{0}` has not been started")]
    NotStarted(String),
}

/// Result of feeding progress into a technology.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchStep {
    Rejected(ResearchError),
    Progressed(f64),
    Completed { newly_unlocked: Vec<String> },
}

/// Owns unlock/research flags and per-technology progress. Resource costs
/// are charged by the caller before research starts.
#[derive(Debug, Clone)]
pub struct TechLedger {
    technologies: Vec<Technology>,
    research_progress: BTreeMap<String, f64>,
    selected_tech_id: Option<String>,
}

impl Default for TechLedger {
    fn default() -> Self {
        Self::new(default_technologies())
    }
}

impl TechLedger {
    pub fn new(technologies: Vec<Technology>) -> Self {
        Self {
            technologies,
            research_progress: BTreeMap::new(),
            selected_tech_id: None,
        }
    }

    pub fn technologies(&self) -> &[Technology] {
        &self.technologies
    }

    pub fn technology(&self, id: &str) -> Option<&Technology> {
        self.technologies.iter().find(|tech| tech.id == id)
    }

    pub fn research_progress(&self, id: &str) -> Option<f64> {
        self.research_progress.get(id).copied()
    }

    pub fn research_state(&self, id: &str) -> Option<ResearchState> {
        let tech = self.technology(id)?;
        let state = if tech.researched {
            ResearchState::Researched
        } else if self.research_progress.contains_key(id) {
            ResearchState::Researching
        } else if tech.unlocked {
            ResearchState::Unlocked
        } else {
            ResearchState::Locked
        };
        Some(state)
    }

    pub fn selected_tech_id(&self) -> Option<&str> {
        self.selected_tech_id.as_deref()
    }

    pub fn select_technology(&mut self, id: Option<&str>) {
        self.selected_tech_id = id.map(str::to_string);
    }

    /// Checks the `unlocked && !researched` precondition without touching state.
    pub fn can_start_research(&self, id: &str) -> Result<&Technology, ResearchError> {
        let tech = self
            .technology(id)
            .ok_or_else(|| ResearchError::UnknownTechnology(id.to_string()))?;
        if tech.researched {
            return Err(ResearchError::AlreadyResearched(id.to_string()));
        }
        if !tech.unlocked {
            return Err(ResearchError::Locked(id.to_string()));
        }
        Ok(tech)
    }

    pub fn try_start_research(&mut self, id: &str) -> Result<(), ResearchError> {
        self.can_start_research(id)?;
        self.research_progress.entry(id.to_string()).or_insert(0.0);
        Ok(())
    }

    pub fn start_research(&mut self, id: &str) -> bool {
        match self.try_start_research(id) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "research not started");
                false
            }
        }
    }

    /// Adds `amount` percentage points (negative amounts count as zero) and
    /// completes the technology once progress reaches 100.
    pub fn continue_research(&mut self, id: &str, amount: f64) -> ResearchStep {
        let progress = match self.research_progress.get_mut(id) {
            Some(progress) => progress,
            None => {
                let err = if self.technology(id).is_none() {
                    ResearchError::UnknownTechnology(id.to_string())
                } else {
                    ResearchError::NotStarted(id.to_string())
                };
                tracing::warn!(%err, "research progress ignored");
                return ResearchStep::Rejected(err);
            }
        };
        if self
            .technologies
            .iter()
            .any(|tech| tech.id == id && tech.researched)
        {
            return ResearchStep::Rejected(ResearchError::AlreadyResearched(id.to_string()));
        }
        *progress = (*progress + amount.max(0.0)).min(RESEARCH_COMPLETE);
        let current = *progress;
        if current >= RESEARCH_COMPLETE {
            ResearchStep::Completed {
                newly_unlocked: self.complete_research(id),
            }
        } else {
            ResearchStep::Progressed(current)
        }
    }

    /// Marks `id` researched (progress pinned at 100) and unlocks every locked
    /// technology whose prerequisite it is. Returns the ids unlocked by this call.
    pub fn complete_research(&mut self, id: &str) -> Vec<String> {
        match self.technologies.iter_mut().find(|tech| tech.id == id) {
            None => {
                tracing::warn!(tech = id, "cannot complete unknown technology");
                return Vec::new();
            }
            Some(tech) if !tech.unlocked => {
                tracing::warn!(tech = id, "cannot complete a locked technology");
                return Vec::new();
            }
            Some(tech) => tech.researched = true,
        }
        self.research_progress
            .insert(id.to_string(), RESEARCH_COMPLETE);

        let mut newly_unlocked = Vec::new();
        for tech in &mut self.technologies {
            if !tech.unlocked && tech.prerequisite.as_deref() == Some(id) {
                tech.unlocked = true;
                newly_unlocked.push(tech.id.clone());
            }
        }
        tracing::debug!(tech = id, unlocked = ?newly_unlocked, "research complete");
        newly_unlocked
    }

    pub fn is_tech_researched(&self, id: &str) -> bool {
        self.technology(id).map(|tech| tech.researched).unwrap_or(false)
    }

    pub fn get_researched_techs(&self) -> Vec<&Technology> {
        self.technologies.iter().filter(|tech| tech.researched).collect()
    }

    pub fn get_available_techs(&self) -> Vec<&Technology> {
        self.technologies
            .iter()
            .filter(|tech| tech.unlocked && !tech.researched)
            .collect()
    }

    pub fn get_tech_efficiency_bonus(&self, action: &str) -> f64 {
        self.technologies
            .iter()
            .filter(|tech| tech.researched)
            .map(|tech| tech.effect_total(TechEffectKind::Efficiency, action))
            .sum()
    }

    pub fn get_tech_cost_reduction(&self, action: &str) -> f64 {
        self.technologies
            .iter()
            .filter(|tech| tech.researched)
            .map(|tech| tech.effect_total(TechEffectKind::CostReduction, action))
            .sum()
    }

    pub fn has_tech_with_ability(&self, ability: &str) -> bool {
        self.technologies
            .iter()
            .filter(|tech| tech.researched)
            .flat_map(|tech| tech.effects.iter())
            .any(|effect| effect.kind == TechEffectKind::NewAbility && effect.target == ability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_root_starts_unlocked() {
        let ledger = TechLedger::default();
        let available: Vec<&str> = ledger
            .get_available_techs()
            .iter()
            .map(|tech| tech.id.as_str())
            .collect();
        assert_eq!(available, vec!["basic_monitoring"]);
        assert_eq!(
            ledger.research_state("advanced_planting"),
            Some(ResearchState::Locked)
        );
    }

    #[test]
    fn state_machine_walks_forward() {
        let mut ledger = TechLedger::default();
        let id = "basic_monitoring";
        assert_eq!(ledger.research_state(id), Some(ResearchState::Unlocked));
        assert!(ledger.start_research(id));
        assert_eq!(ledger.research_state(id), Some(ResearchState::Researching));
        assert_eq!(
            ledger.continue_research(id, 60.0),
            ResearchStep::Progressed(60.0)
        );
        let newly_unlocked = match ledger.continue_research(id, 60.0) {
            ResearchStep::Completed { newly_unlocked } => newly_unlocked,
            other => panic!("expected completion, got {other:?}"),
        };
        assert_eq!(
            newly_unlocked,
            vec!["advanced_planting", "wildlife_tracking", "water_purification"]
        );
        assert_eq!(ledger.research_state(id), Some(ResearchState::Researched));
        assert_eq!(ledger.research_progress(id), Some(100.0));
    }

    #[test]
    fn continue_without_start_is_rejected() {
        let mut ledger = TechLedger::default();
        let step = ledger.continue_research("basic_monitoring", 150.0);
        assert_eq!(
            step,
            ResearchStep::Rejected(ResearchError::NotStarted("basic_monitoring".into()))
        );
        assert!(!ledger.is_tech_researched("basic_monitoring"));
        assert!(matches!(
            ledger.continue_research("cold_fusion", 10.0),
            ResearchStep::Rejected(ResearchError::UnknownTechnology(_))
        ));
    }

    #[test]
    fn negative_progress_is_ignored() {
        let mut ledger = TechLedger::default();
        ledger.start_research("basic_monitoring");
        ledger.continue_research("basic_monitoring", 30.0);
        ledger.continue_research("basic_monitoring", -20.0);
        assert_eq!(ledger.research_progress("basic_monitoring"), Some(30.0));
    }

    #[test]
    fn bonuses_sum_specific_and_global_targets() {
        let mut ledger = TechLedger::default();
        ledger.complete_research("basic_monitoring");
        ledger.complete_research("advanced_planting");
        assert_eq!(ledger.get_tech_efficiency_bonus("plantTree"), 35.0);
        assert_eq!(ledger.get_tech_efficiency_bonus("cleanPollution"), 10.0);
        assert_eq!(ledger.get_tech_cost_reduction("plantTree"), 20.0);
        assert_eq!(ledger.get_tech_cost_reduction("cleanPollution"), 0.0);
        assert!(!ledger.has_tech_with_ability("animal_monitoring"));
        ledger.complete_research("wildlife_tracking");
        assert!(ledger.has_tech_with_ability("animal_monitoring"));
    }

    #[test]
    fn locked_technology_cannot_be_completed() {
        let mut ledger = TechLedger::default();
        assert!(ledger.complete_research("drone_monitoring").is_empty());
        assert!(!ledger.is_tech_researched("drone_monitoring"));
        assert_eq!(ledger.research_progress("drone_monitoring"), None);
    }
}
