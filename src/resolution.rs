use crate::{
    engine::{CycleReport, RegionHost},
    events::{EventChoice, EventRegistry, GameEvent},
    technology::TechLedger,
};

/// Tracks which event instances are live across the map, which were
/// resolved, and which one the player is currently looking at.
///
/// The flow never owns regions. Every operation that touches them takes the
/// engine (or any other [`RegionHost`]) explicitly.
#[derive(Debug, Clone, Default)]
pub struct EventFlow {
    active_events: Vec<GameEvent>,
    event_history: Vec<String>,
    current_event: Option<GameEvent>,
}

impl EventFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_events(&self) -> &[GameEvent] {
        &self.active_events
    }

    /// Ids of resolved events, oldest first.
    pub fn event_history(&self) -> &[String] {
        &self.event_history
    }

    pub fn current_event(&self) -> Option<&GameEvent> {
        self.current_event.as_ref()
    }

    /// Restores the default event catalog and forgets all live and past events.
    pub fn initialize_events<H: RegionHost + ?Sized>(&mut self, host: &mut H) {
        *host.event_registry_mut() = EventRegistry::with_defaults();
        self.active_events.clear();
        self.event_history.clear();
        self.current_event = None;
    }

    /// Starts `event_id` in `region_id` and makes it the current event.
    pub fn trigger_event<H: RegionHost + ?Sized>(
        &mut self,
        host: &mut H,
        region_id: &str,
        event_id: &str,
    ) -> bool {
        let Some(template) = host.event_registry().find(event_id) else {
            tracing::warn!(event = event_id, "cannot trigger unknown event");
            return false;
        };
        let instance = template.activate();
        let Some(region) = host.region_mut(region_id) else {
            tracing::warn!(
                region = region_id,
                event = event_id,
                "cannot trigger event in unknown region"
            );
            return false;
        };
        region.active_events.push(instance.clone());
        self.active_events.push(instance.clone());
        self.current_event = Some(instance);
        tracing::debug!(region = region_id, event = event_id, "event triggered");
        true
    }

    /// Applies the chosen option to every region hosting the event, then
    /// resolves it. Unknown events or choices change nothing.
    pub fn handle_event_choice<H: RegionHost + ?Sized>(
        &mut self,
        host: &mut H,
        event_id: &str,
        choice_id: &str,
    ) -> bool {
        let Some(event) = self.find_active(event_id) else {
            tracing::warn!(event = event_id, "no active event to choose for");
            return false;
        };
        let Some(choice) = event.choice(choice_id) else {
            tracing::warn!(event = event_id, choice = choice_id, "unknown event choice");
            return false;
        };
        let effects = choice.effects.clone();
        for region in host.regions_mut() {
            if !region.hosts_event(event_id) {
                continue;
            }
            for effect in &effects {
                if let Some(metric) = effect.target.metric() {
                    region.adjust(metric, effect.magnitude);
                }
            }
        }
        tracing::debug!(event = event_id, choice = choice_id, "event choice applied");
        self.resolve_event(host, event_id);
        true
    }

    /// Removes every instance of `event_id` from the regions and the active
    /// list, records it in the history and clears the current event.
    pub fn resolve_event<H: RegionHost + ?Sized>(&mut self, host: &mut H, event_id: &str) {
        self.active_events.retain(|event| event.id != event_id);
        for region in host.regions_mut() {
            region.active_events.retain(|event| event.id != event_id);
        }
        self.event_history.push(event_id.to_string());
        self.current_event = None;
    }

    pub fn dismiss_event(&mut self) {
        self.current_event = None;
    }

    /// True while an event is waiting for the player.
    pub fn has_active_event(&self) -> bool {
        self.current_event.is_some()
    }

    pub fn get_active_region_events<'h, H: RegionHost + ?Sized>(
        &self,
        host: &'h H,
        region_id: &str,
    ) -> &'h [GameEvent] {
        host.region(region_id)
            .map(|region| region.active_events.as_slice())
            .unwrap_or(&[])
    }

    pub fn add_custom_event<H: RegionHost + ?Sized>(&mut self, host: &mut H, event: GameEvent) {
        host.event_registry_mut().add_custom_event(event);
    }

    /// Folds a cycle's outcome into the active list: expired instances are
    /// dropped, randomly triggered ones are registered so they can be
    /// resolved by choice.
    pub fn absorb_cycle<H: RegionHost + ?Sized>(&mut self, host: &H, report: &CycleReport) {
        for expired in &report.expired {
            if let Some(index) = self
                .active_events
                .iter()
                .position(|event| event.id == expired.event_id)
            {
                self.active_events.remove(index);
            }
        }
        for placement in &report.triggered {
            self.adopt_event(host, &placement.region_id, &placement.event_id);
        }
        let hosted = |id: &str| host.regions().iter().any(|region| region.hosts_event(id));
        self.active_events.retain(|event| hosted(&event.id));
        if self
            .current_event
            .as_ref()
            .is_some_and(|current| !hosted(&current.id))
        {
            self.current_event = None;
        }
    }

    /// Registers an instance already attached to a region (by a random roll)
    /// so that it can be resolved through a choice.
    pub fn adopt_event<H: RegionHost + ?Sized>(
        &mut self,
        host: &H,
        region_id: &str,
        event_id: &str,
    ) -> bool {
        let instance = host.region(region_id).and_then(|region| {
            region
                .active_events
                .iter()
                .rev()
                .find(|event| event.id == event_id)
        });
        match instance {
            Some(instance) => {
                self.active_events.push(instance.clone());
                true
            }
            None => false,
        }
    }

    /// Choices of an active event whose technology requirement is met.
    pub fn available_choices<'a>(
        &'a self,
        event_id: &str,
        ledger: &TechLedger,
    ) -> Vec<&'a EventChoice> {
        self.find_active(event_id)
            .map(|event| {
                event
                    .choices
                    .iter()
                    .filter(|choice| {
                        choice
                            .tech_required
                            .as_deref()
                            .map_or(true, |tech| ledger.is_tech_researched(tech))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn find_active(&self, event_id: &str) -> Option<&GameEvent> {
        self.active_events.iter().find(|event| event.id == event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog, engine::EventPlacement, world::Region};

    /// Regions and a registry without an engine around them.
    struct Board {
        regions: Vec<Region>,
        registry: EventRegistry,
    }

    impl Board {
        fn new() -> Self {
            Self {
                regions: catalog::initial_regions(),
                registry: EventRegistry::with_defaults(),
            }
        }
    }

    impl RegionHost for Board {
        fn regions(&self) -> &[Region] {
            &self.regions
        }

        fn regions_mut(&mut self) -> &mut [Region] {
            &mut self.regions
        }

        fn event_registry(&self) -> &EventRegistry {
            &self.registry
        }

        fn event_registry_mut(&mut self) -> &mut EventRegistry {
            &mut self.registry
        }
    }

    #[test]
    fn trigger_attaches_and_focuses_event() {
        let mut board = Board::new();
        let mut flow = EventFlow::new();
        assert!(flow.trigger_event(&mut board, "region_wetland", "flood"));
        assert!(flow.has_active_event());
        assert_eq!(flow.active_events().len(), 1);
        let hosted = flow.get_active_region_events(&board, "region_wetland");
        assert_eq!(hosted.len(), 1);
        assert_eq!(hosted[0].time_remaining, Some(4));
        assert!(!board.registry.find("flood").unwrap().is_active);
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let mut board = Board::new();
        let mut flow = EventFlow::new();
        assert!(!flow.trigger_event(&mut board, "region_tundra", "flood"));
        assert!(!flow.trigger_event(&mut board, "region_wetland", "meteor"));
        assert!(flow.active_events().is_empty());
        assert!(!flow.has_active_event());
        assert!(flow.get_active_region_events(&board, "region_tundra").is_empty());
    }

    #[test]
    fn choice_applies_to_hosting_regions_then_resolves() {
        let mut board = Board::new();
        let mut flow = EventFlow::new();
        flow.trigger_event(&mut board, "region_wetland", "pollution_spill");
        assert!(flow.handle_event_choice(&mut board, "pollution_spill", "cleanup_operation"));
        let wetland = board.regions.iter().find(|r| r.id == "region_wetland").unwrap();
        assert_eq!(wetland.pollution_level, 55.0);
        assert_eq!(wetland.water_quality, 45.0);
        assert!(wetland.active_events.is_empty());
        let rainforest = board.regions.iter().find(|r| r.id == "region_rainforest").unwrap();
        assert_eq!(rainforest.pollution_level, 60.0);
        assert!(flow.active_events().is_empty());
        assert_eq!(flow.event_history(), ["pollution_spill".to_string()]);
        assert!(!flow.has_active_event());
    }

    #[test]
    fn unknown_choice_keeps_event_live() {
        let mut board = Board::new();
        let mut flow = EventFlow::new();
        flow.trigger_event(&mut board, "region_desert", "drought");
        assert!(!flow.handle_event_choice(&mut board, "drought", "rain_dance"));
        assert!(!flow.handle_event_choice(&mut board, "wildfire", "fire_containment"));
        assert_eq!(flow.active_events().len(), 1);
        assert!(flow.event_history().is_empty());
    }

    #[test]
    fn absorb_registers_triggered_and_prunes_expired() {
        let mut board = Board::new();
        let mut flow = EventFlow::new();
        flow.trigger_event(&mut board, "region_desert", "drought");
        // the desert drought ran out; a wildfire was rolled in the rainforest
        board.regions[1].active_events.clear();
        let wildfire = board.registry.find("wildfire").unwrap().activate();
        board.regions[0].active_events.push(wildfire);
        let report = CycleReport {
            cycle: 2,
            triggered: vec![EventPlacement {
                region_id: "region_rainforest".into(),
                event_id: "wildfire".into(),
            }],
            expired: vec![EventPlacement {
                region_id: "region_desert".into(),
                event_id: "drought".into(),
            }],
            ..CycleReport::default()
        };
        flow.absorb_cycle(&board, &report);
        let ids: Vec<_> = flow.active_events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["wildfire"]);
        assert!(!flow.has_active_event());
    }

    #[test]
    fn choices_are_filtered_by_research() {
        let mut board = Board::new();
        let mut flow = EventFlow::new();
        flow.trigger_event(&mut board, "region_desert", "drought");
        let mut ledger = TechLedger::default();
        let ids = |flow: &EventFlow, ledger: &TechLedger| -> Vec<String> {
            flow.available_choices("drought", ledger)
                .into_iter()
                .map(|choice| choice.id.clone())
                .collect()
        };
        assert_eq!(ids(&flow, &ledger), ["water_conservation"]);
        let tech = flow.active_events()[0].choices[1]
            .tech_required
            .clone()
            .unwrap();
        let mut chain = Vec::new();
        let mut next = Some(tech);
        while let Some(id) = next {
            next = ledger.technology(&id).and_then(|t| t.prerequisite.clone());
            chain.push(id);
        }
        for id in chain.iter().rev() {
            ledger.complete_research(id);
        }
        assert_eq!(ids(&flow, &ledger), ["water_conservation", "drought_resistant"]);
    }

    #[test]
    fn initialize_drops_custom_events_and_history() {
        let mut board = Board::new();
        let mut flow = EventFlow::new();
        let mut custom = board.registry.find("flood").unwrap().clone();
        custom.id = "king_tide".into();
        flow.add_custom_event(&mut board, custom);
        assert!(flow.trigger_event(&mut board, "region_wetland", "king_tide"));
        flow.resolve_event(&mut board, "king_tide");
        flow.initialize_events(&mut board);
        assert!(board.registry.find("king_tide").is_none());
        assert!(flow.event_history().is_empty());
    }
}
