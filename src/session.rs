use crate::{
    catalog::ActionType,
    command::{Command, CommandError, Outcome},
    engine::{ActionReceipt, CycleReport, Engine},
    observer::{ChangeNotifier, Subscription},
    resolution::EventFlow,
    technology::{ResearchError, ResearchState, ResearchStep, TechLedger},
    world::{Position, World},
};

/// Owns the engine, the technology ledger and the event flow, and is the one
/// place commands enter. Technology gates on actions and event choices are
/// enforced here; the engine itself only checks cost and applicability.
pub struct Session {
    engine: Engine,
    ledger: TechLedger,
    flow: EventFlow,
    world_watch: ChangeNotifier<World>,
    research_watch: ChangeNotifier<TechLedger>,
    event_watch: ChangeNotifier<EventFlow>,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        Self::with_ledger(engine, TechLedger::default())
    }

    pub fn with_ledger(engine: Engine, ledger: TechLedger) -> Self {
        Self {
            engine,
            ledger,
            flow: EventFlow::new(),
            world_watch: ChangeNotifier::new(),
            research_watch: ChangeNotifier::new(),
            event_watch: ChangeNotifier::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn world(&self) -> &World {
        self.engine.world()
    }

    pub fn ledger(&self) -> &TechLedger {
        &self.ledger
    }

    pub fn flow(&self) -> &EventFlow {
        &self.flow
    }

    pub fn watch_world<T, F, L>(&mut self, selector: F, listener: L) -> Subscription
    where
        T: PartialEq + 'static,
        F: Fn(&World) -> T + 'static,
        L: FnMut(&T) + 'static,
    {
        self.world_watch.subscribe(self.engine.world(), selector, listener)
    }

    pub fn watch_research<T, F, L>(&mut self, selector: F, listener: L) -> Subscription
    where
        T: PartialEq + 'static,
        F: Fn(&TechLedger) -> T + 'static,
        L: FnMut(&T) + 'static,
    {
        self.research_watch.subscribe(&self.ledger, selector, listener)
    }

    pub fn watch_events<T, F, L>(&mut self, selector: F, listener: L) -> Subscription
    where
        T: PartialEq + 'static,
        F: Fn(&EventFlow) -> T + 'static,
        L: FnMut(&T) + 'static,
    {
        self.event_watch.subscribe(&self.flow, selector, listener)
    }

    /// Cancels a subscription made through any of the `watch_*` methods.
    pub fn unwatch(&mut self, subscription: Subscription) -> bool {
        self.world_watch.unsubscribe(subscription)
            | self.research_watch.unsubscribe(subscription)
            | self.event_watch.unsubscribe(subscription)
    }

    /// Applies one command, then notifies subscribers. A rejected command
    /// leaves every component untouched.
    pub fn apply(&mut self, command: Command) -> Result<Outcome, CommandError> {
        let result = self.dispatch(command);
        if let Err(err) = &result {
            tracing::debug!(%err, "command rejected");
        }
        self.notify_all();
        result
    }

    /// Runs one cycle, folds its triggered and expired events into the flow
    /// and notifies subscribers.
    pub fn advance_cycle(&mut self) -> CycleReport {
        let report = self.run_cycle();
        self.notify_all();
        report
    }

    fn run_cycle(&mut self) -> CycleReport {
        let report = self.engine.advance_cycle();
        self.flow.absorb_cycle(&self.engine, &report);
        report
    }

    fn notify_all(&mut self) {
        self.world_watch.notify(self.engine.world());
        self.research_watch.notify(&self.ledger);
        self.event_watch.notify(&self.flow);
    }

    fn dispatch(&mut self, command: Command) -> Result<Outcome, CommandError> {
        match command {
            Command::AdvanceCycle => Ok(Outcome::Advanced(self.run_cycle())),
            Command::PerformAction {
                action,
                region,
                position,
                entity_type,
            } => self
                .perform_action(action, &region, position, entity_type.as_deref())
                .map(Outcome::ActionPerformed),
            Command::SelectRegion { region } => {
                if let Some(id) = region.as_deref() {
                    self.require_region(id)?;
                }
                self.engine.select_region(region.as_deref());
                Ok(Outcome::RegionSelected(region))
            }
            Command::SelectPosition { position } => {
                self.engine.select_position(position);
                Ok(Outcome::PositionSelected(position))
            }
            Command::AddResources { amount } => {
                self.engine.add_resources(amount);
                Ok(Outcome::ResourcesAdded {
                    balance: self.engine.resources(),
                })
            }
            Command::TriggerRandomEvent { region } => {
                self.require_region(&region)?;
                let event_id = self
                    .engine
                    .trigger_random_event(&region)
                    .ok_or_else(|| CommandError::NoEventAvailable(region.clone()))?;
                self.flow.adopt_event(&self.engine, &region, &event_id);
                Ok(Outcome::EventTriggered {
                    region_id: region,
                    event_id,
                })
            }
            Command::TriggerEvent { region, event } => {
                if !self.flow.trigger_event(&mut self.engine, &region, &event) {
                    return Err(CommandError::TriggerFailed { region, event });
                }
                Ok(Outcome::EventTriggered {
                    region_id: region,
                    event_id: event,
                })
            }
            Command::AddCustomEvent { event } => {
                let event_id = event.id.clone();
                self.flow.add_custom_event(&mut self.engine, event);
                Ok(Outcome::EventAdded { event_id })
            }
            Command::InitializeEvents => {
                self.flow.initialize_events(&mut self.engine);
                Ok(Outcome::EventsInitialized)
            }
            Command::SelectTechnology { tech } => {
                if let Some(id) = tech.as_deref() {
                    if self.ledger.technology(id).is_none() {
                        return Err(ResearchError::UnknownTechnology(id.to_string()).into());
                    }
                }
                self.ledger.select_technology(tech.as_deref());
                Ok(Outcome::TechnologySelected(tech))
            }
            Command::StartResearch { tech } => self.start_research(tech),
            Command::ContinueResearch { tech, amount } => {
                match self.ledger.continue_research(&tech, amount) {
                    ResearchStep::Rejected(err) => Err(err.into()),
                    ResearchStep::Progressed(progress) => Ok(Outcome::ResearchProgressed {
                        tech_id: tech,
                        progress,
                    }),
                    ResearchStep::Completed { newly_unlocked } => {
                        self.engine.note_research_completed();
                        Ok(Outcome::ResearchCompleted {
                            tech_id: tech,
                            newly_unlocked,
                        })
                    }
                }
            }
            Command::CompleteResearch { tech } => {
                let state = self.ledger.research_state(&tech);
                match state {
                    None => Err(ResearchError::UnknownTechnology(tech).into()),
                    Some(ResearchState::Locked) => Err(ResearchError::Locked(tech).into()),
                    Some(ResearchState::Researched) => Ok(Outcome::ResearchCompleted {
                        tech_id: tech,
                        newly_unlocked: Vec::new(),
                    }),
                    Some(_) => {
                        let newly_unlocked = self.ledger.complete_research(&tech);
                        self.engine.note_research_completed();
                        Ok(Outcome::ResearchCompleted {
                            tech_id: tech,
                            newly_unlocked,
                        })
                    }
                }
            }
            Command::ChooseEventOption { event, choice } => {
                self.choose_event_option(event, choice)
            }
            Command::ResolveEvent { event } => {
                self.flow.resolve_event(&mut self.engine, &event);
                Ok(Outcome::EventResolved { event_id: event })
            }
            Command::DismissEvent => {
                self.flow.dismiss_event();
                Ok(Outcome::EventDismissed)
            }
        }
    }

    fn require_region(&self, region_id: &str) -> Result<(), CommandError> {
        match self.engine.world().region(region_id) {
            Some(_) => Ok(()),
            None => Err(CommandError::UnknownRegion(region_id.to_string())),
        }
    }

    fn perform_action(
        &mut self,
        action: ActionType,
        region_id: &str,
        position: Position,
        entity_type: Option<&str>,
    ) -> Result<ActionReceipt, CommandError> {
        let required = self
            .engine
            .action(action)
            .and_then(|definition| definition.tech_required);
        if let Some(tech) = required {
            if !self.ledger.is_tech_researched(tech) {
                return Err(CommandError::ActionLocked {
                    action,
                    tech: tech.to_string(),
                });
            }
        }
        Ok(self
            .engine
            .try_perform_action(action, region_id, position, entity_type)?)
    }

    /// Charges the technology's cost once, when research first starts.
    fn start_research(&mut self, tech_id: String) -> Result<Outcome, CommandError> {
        if self.ledger.research_state(&tech_id) == Some(ResearchState::Researching) {
            return Ok(Outcome::ResearchStarted {
                tech_id,
                charged: 0,
            });
        }
        let cost = self.ledger.can_start_research(&tech_id)?.cost;
        let available = self.engine.resources();
        if available < i64::from(cost) {
            return Err(CommandError::CannotAffordResearch {
                tech: tech_id,
                cost,
                available,
            });
        }
        self.ledger.try_start_research(&tech_id)?;
        self.engine.add_resources(-i64::from(cost));
        tracing::debug!(tech = %tech_id, cost, "research started");
        Ok(Outcome::ResearchStarted {
            tech_id,
            charged: cost,
        })
    }

    fn choose_event_option(
        &mut self,
        event_id: String,
        choice_id: String,
    ) -> Result<Outcome, CommandError> {
        let unavailable = || CommandError::ChoiceUnavailable {
            event: event_id.clone(),
            choice: choice_id.clone(),
        };
        let choice = self
            .flow
            .active_events()
            .iter()
            .find(|event| event.id == event_id)
            .and_then(|event| event.choice(&choice_id))
            .ok_or_else(unavailable)?;
        if let Some(tech) = &choice.tech_required {
            if !self.ledger.is_tech_researched(tech) {
                return Err(CommandError::ChoiceLocked {
                    event: event_id.clone(),
                    choice: choice_id.clone(),
                    tech: tech.clone(),
                });
            }
        }
        if !self
            .flow
            .handle_event_choice(&mut self.engine, &event_id, &choice_id)
        {
            return Err(unavailable());
        }
        self.engine.note_event_resolved();
        Ok(Outcome::EventResolved { event_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineBuilder, EngineSettings};
    use crate::systems::{BookkeepingSystem, EnvironmentSystem};
    use std::{cell::RefCell, rc::Rc};

    fn calm_session() -> Session {
        let engine = EngineBuilder::new(EngineSettings::default())
            .with_system(EnvironmentSystem::new())
            .with_system(BookkeepingSystem::new())
            .build();
        Session::new(engine)
    }

    #[test]
    fn structures_wait_for_basic_monitoring() {
        let mut session = calm_session();
        let build = || Command::PerformAction {
            action: ActionType::BuildStructure,
            region: "region_desert".into(),
            position: Position::default(),
            entity_type: None,
        };
        assert!(matches!(
            session.apply(build()),
            Err(CommandError::ActionLocked { .. })
        ));
        assert_eq!(session.world().resources(), 100);

        session
            .apply(Command::CompleteResearch {
                tech: "basic_monitoring".into(),
            })
            .unwrap();
        assert!(matches!(session.apply(build()), Ok(Outcome::ActionPerformed(_))));
        assert_eq!(session.world().resources(), 60);
    }

    #[test]
    fn research_is_charged_once() {
        let mut session = calm_session();
        let start = || Command::StartResearch {
            tech: "basic_monitoring".into(),
        };
        assert_eq!(
            session.apply(start()).unwrap(),
            Outcome::ResearchStarted {
                tech_id: "basic_monitoring".into(),
                charged: 50,
            }
        );
        session.apply(start()).unwrap();
        assert_eq!(session.world().resources(), 50);
        assert_eq!(session.world().stats().technologies_researched, 0);
    }

    #[test]
    fn unaffordable_research_leaves_no_progress() {
        let mut session = calm_session();
        session.apply(Command::AddResources { amount: -90 }).unwrap();
        let err = session
            .apply(Command::StartResearch {
                tech: "basic_monitoring".into(),
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::CannotAffordResearch { cost: 50, .. }));
        assert_eq!(session.ledger().research_progress("basic_monitoring"), None);
    }

    #[test]
    fn listeners_hear_resource_changes() {
        let mut session = calm_session();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = session.watch_world(
            |world| world.resources(),
            move |resources| sink.borrow_mut().push(*resources),
        );
        session.apply(Command::AddResources { amount: 5 }).unwrap();
        session.apply(Command::DismissEvent).unwrap();
        assert!(session.unwatch(sub));
        session.apply(Command::AddResources { amount: 5 }).unwrap();
        assert_eq!(*seen.borrow(), vec![105]);
    }

    #[test]
    fn direct_cycle_advance_reaches_listeners() {
        let mut session = calm_session();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        session.watch_world(|world| world.cycle(), move |cycle| sink.borrow_mut().push(*cycle));
        session.advance_cycle();
        assert_eq!(*seen.borrow(), vec![2]);
        session.apply(Command::AdvanceCycle).unwrap();
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }
}
