use ecorestore::{
    scenario::{Scenario, ScenarioLoader},
    snapshot::{read_snapshot, SnapshotWriter},
    technology::ResearchError,
    Command, CommandError, Outcome, Session,
};

fn three_biomes() -> Scenario {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/three_biomes.yaml")
        .unwrap()
}

#[test]
fn scripted_run_applies_every_step_and_writes_snapshots() {
    let scenario = three_biomes();
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path(), scenario.snapshot_interval);
    let mut session = scenario.build_session(None).unwrap();

    let summary = scenario.run(&mut session, scenario.cycles, &writer).unwrap();

    assert_eq!(summary.cycles_run, 30);
    assert_eq!(summary.commands_applied, 7);
    assert_eq!(summary.commands_rejected, 0);
    assert_eq!(summary.snapshots_written, 3);
    assert!(session.ledger().is_tech_researched("basic_monitoring"));
    let stats = session.world().stats();
    assert_eq!(stats.plants_planted, 1);
    assert_eq!(stats.animals_introduced, 1);
    assert_eq!(stats.pollution_cleaned, 1);
    assert_eq!(stats.technologies_researched, 1);

    let last = read_snapshot(dir.path().join("three_biomes/cycle_000030.json")).unwrap();
    assert_eq!(last.state.cycle, 30);
    assert_eq!(last.state.scenario, "three_biomes");
    let wetland = last
        .state
        .regions
        .iter()
        .find(|region| region.id == "region_wetland")
        .unwrap();
    assert_eq!(wetland.structures, 1);
}

#[test]
fn same_seed_replays_identically() {
    let scenario = three_biomes();
    let writer = SnapshotWriter::new("unused", 0);
    let run = |seed| {
        let mut session = scenario.build_session(Some(seed)).unwrap();
        scenario.run(&mut session, 25, &writer).unwrap();
        (
            session.world().regions().to_vec(),
            session.world().score(),
            session.flow().active_events().to_vec(),
        )
    };
    assert_eq!(run(99), run(99));
}

#[test]
fn rejected_script_steps_are_counted_not_fatal() {
    let scenario: Scenario = serde_yaml::from_str(
        r#"
name: overspend
random_events: false
starting_resources: 30
script:
  - command: { type: perform_action, action: createWaterSource, region: region_desert }
  - command: { type: perform_action, action: plantTree, region: region_desert }
  - command: { type: start_research, tech: ecosystem_engineering }
"#,
    )
    .unwrap();
    let mut session = scenario.build_session(None).unwrap();
    let summary = scenario
        .run(&mut session, 1, &SnapshotWriter::new("unused", 0))
        .unwrap();
    assert_eq!(summary.commands_applied, 1);
    assert_eq!(summary.commands_rejected, 2);
    assert_eq!(summary.resources, 15);
}

#[test]
fn selection_tracks_region_and_position() {
    let mut session = three_biomes().build_session(None).unwrap();
    session
        .apply(Command::SelectPosition {
            position: Some(ecorestore::world::Position::new(1.0, 0.0, 1.0)),
        })
        .unwrap();
    session
        .apply(Command::SelectRegion {
            region: Some("region_wetland".into()),
        })
        .unwrap();
    assert_eq!(session.world().selected_region_id(), Some("region_wetland"));
    assert_eq!(session.world().selected_position(), None);
    assert_eq!(
        session.apply(Command::SelectRegion {
            region: Some("region_tundra".into())
        }),
        Err(CommandError::UnknownRegion("region_tundra".into()))
    );
    assert_eq!(session.world().selected_region_id(), Some("region_wetland"));
}

#[test]
fn research_listeners_fire_on_unlock() {
    let mut session: Session = three_biomes().build_session(None).unwrap();
    let unlocked = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&unlocked);
    session.watch_research(
        |ledger| ledger.get_available_techs().len(),
        move |count| sink.borrow_mut().push(*count),
    );
    session
        .apply(Command::CompleteResearch {
            tech: "basic_monitoring".into(),
        })
        .unwrap();
    session
        .apply(Command::CompleteResearch {
            tech: "basic_monitoring".into(),
        })
        .unwrap();
    assert_eq!(*unlocked.borrow(), vec![3]);
    assert_eq!(session.world().stats().technologies_researched, 1);
}

#[test]
fn custom_events_come_and_go_through_commands() {
    let mut session: Session = three_biomes().build_session(None).unwrap();
    let add: Command = serde_yaml::from_str(
        r#"
type: add_custom_event
event:
  id: king_tide
  name: King Tide
  duration: 2
  target_region_types: [wetland]
  effects:
    - target: water_quality
      magnitude: -4
      duration: 2
"#,
    )
    .unwrap();
    assert_eq!(
        session.apply(add).unwrap(),
        Outcome::EventAdded {
            event_id: "king_tide".into()
        }
    );
    let tide = || Command::TriggerEvent {
        region: "region_wetland".into(),
        event: "king_tide".into(),
    };
    session.apply(tide()).unwrap();
    assert!(session.flow().has_active_event());

    assert_eq!(
        session.apply(Command::InitializeEvents).unwrap(),
        Outcome::EventsInitialized
    );
    assert!(session.flow().active_events().is_empty());
    assert!(!session.flow().has_active_event());
    assert!(matches!(
        session.apply(tide()),
        Err(CommandError::TriggerFailed { .. })
    ));
}

#[test]
fn technology_selection_goes_through_commands() {
    let mut session: Session = three_biomes().build_session(None).unwrap();
    session
        .apply(Command::SelectTechnology {
            tech: Some("basic_monitoring".into()),
        })
        .unwrap();
    assert_eq!(session.ledger().selected_tech_id(), Some("basic_monitoring"));

    assert_eq!(
        session.apply(Command::SelectTechnology {
            tech: Some("cold_fusion".into()),
        }),
        Err(CommandError::Research(ResearchError::UnknownTechnology(
            "cold_fusion".into()
        )))
    );
    assert_eq!(session.ledger().selected_tech_id(), Some("basic_monitoring"));

    session
        .apply(Command::SelectTechnology { tech: None })
        .unwrap();
    assert_eq!(session.ledger().selected_tech_id(), None);
}
