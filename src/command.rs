use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::ActionType,
    engine::{ActionReceipt, ActionRejected, CycleReport},
    events::GameEvent,
    technology::ResearchError,
    world::Position,
};

/// Every state-changing request an outer surface can make. Scenario scripts
/// deserialize straight into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AdvanceCycle,
    PerformAction {
        action: ActionType,
        region: String,
        #[serde(default)]
        position: Position,
        #[serde(default)]
        entity_type: Option<String>,
    },
    SelectRegion {
        #[serde(default)]
        region: Option<String>,
    },
    SelectPosition {
        #[serde(default)]
        position: Option<Position>,
    },
    AddResources {
        amount: i64,
    },
    TriggerRandomEvent {
        region: String,
    },
    TriggerEvent {
        region: String,
        event: String,
    },
    AddCustomEvent {
        event: GameEvent,
    },
    /// Restores the default event catalog and clears every live event record.
    InitializeEvents,
    SelectTechnology {
        #[serde(default)]
        tech: Option<String>,
    },
    StartResearch {
        tech: String,
    },
    ContinueResearch {
        tech: String,
        amount: f64,
    },
    CompleteResearch {
        tech: String,
    },
    ChooseEventOption {
        event: String,
        choice: String,
    },
    ResolveEvent {
        event: String,
    },
    DismissEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Advanced(CycleReport),
    ActionPerformed(ActionReceipt),
    RegionSelected(Option<String>),
    PositionSelected(Option<Position>),
    ResourcesAdded { balance: i64 },
    EventTriggered { region_id: String, event_id: String },
    EventAdded { event_id: String },
    EventsInitialized,
    TechnologySelected(Option<String>),
    ResearchStarted { tech_id: String, charged: u32 },
    ResearchProgressed { tech_id: String, progress: f64 },
    ResearchCompleted { tech_id: String, newly_unlocked: Vec<String> },
    EventResolved { event_id: String },
    EventDismissed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Action(#[from] ActionRejected),
    #[error(transparent)]
    Research(#[from] ResearchError),
    #[error("`{action}` requires technology `{tech}`")]
    ActionLocked { action: ActionType, tech: String },
    #[error("choice `{choice}` of `{event}` requires technology `{tech}`")]
    ChoiceLocked {
        event: String,
        choice: String,
        tech: String,
    },
    #[error("no active event `{event}` with choice `{choice}`")]
    ChoiceUnavailable { event: String, choice: String },
    #[error("researching `{tech}` costs {cost} but only {available} resources are available")]
    CannotAffordResearch {
        tech: String,
        cost: u32,
        available: i64,
    },
    #[error("unknown region `{0}`")]
    UnknownRegion(String),
    #[error("no event applies to region `{0}` right now")]
    NoEventAvailable(String),
    #[error("event `{event}` could not be triggered in `{region}`")]
    TriggerFailed { region: String, event: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_read_from_yaml() {
        let yaml = r#"
- type: perform_action
  action: cleanPollution
  region: region_wetland
- type: continue_research
  tech: basic_monitoring
  amount: 40
- type: select_region
- type: advance_cycle
"#;
        let commands: Vec<Command> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            commands[0],
            Command::PerformAction {
                action: ActionType::CleanPollution,
                region: "region_wetland".into(),
                position: Position::default(),
                entity_type: None,
            }
        );
        assert_eq!(
            commands[1],
            Command::ContinueResearch {
                tech: "basic_monitoring".into(),
                amount: 40.0,
            }
        );
        assert_eq!(commands[2], Command::SelectRegion { region: None });
        assert_eq!(commands[3], Command::AdvanceCycle);
    }

    #[test]
    fn unknown_action_names_fail_to_parse() {
        let yaml = "type: perform_action\naction: plantFlowers\nregion: region_desert\n";
        assert!(serde_yaml::from_str::<Command>(yaml).is_err());
    }
}
