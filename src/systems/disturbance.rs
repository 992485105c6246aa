use anyhow::Result;
use rand::Rng;

use crate::{
    engine::{EventPlacement, System, SystemContext},
    events::{calculate_event_chance, EventRegistry},
    rng::SystemRng,
    world::{Region, World},
};

/// Draws a random applicable event from the registry and attaches an
/// activated copy to the region. Returns the attached event's id.
pub fn attach_random_event<R: Rng + ?Sized>(
    region: &mut Region,
    events: &EventRegistry,
    rng: &mut R,
) -> Option<String> {
    let event = events.get_random_event(region.kind, rng)?.activate();
    let id = event.id.clone();
    tracing::debug!(region = %region.id, event = %id, "event attached");
    region.active_events.push(event);
    Some(id)
}

/// Rolls each region for a random event, more often the sicker it is.
pub struct DisturbanceSystem;

impl DisturbanceSystem {
    pub const NAME: &'static str = "disturbance";

    pub fn new() -> Self {
        Self
    }
}

impl Default for DisturbanceSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DisturbanceSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(
        &mut self,
        ctx: &mut SystemContext<'_>,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for region in &mut world.regions {
            let chance = calculate_event_chance(region.health);
            if rng.gen::<f64>() >= chance {
                continue;
            }
            if let Some(event_id) = attach_random_event(region, ctx.events, rng) {
                ctx.report.triggered.push(EventPlacement {
                    region_id: region.id.clone(),
                    event_id,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog, world::EcosystemType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn attached_event_is_active_with_full_timer() {
        let mut region = catalog::initial_regions().remove(0);
        let registry = EventRegistry::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let id = attach_random_event(&mut region, &registry, &mut rng).unwrap();
        let event = &region.active_events[0];
        assert_eq!(event.id, id);
        assert!(event.is_active);
        assert_eq!(event.time_remaining, Some(i64::from(event.duration)));
        assert!(event.applies_to(EcosystemType::Rainforest));
        assert!(!registry.find(&id).unwrap().is_active);
    }

    #[test]
    fn empty_registry_attaches_nothing() {
        let mut region = catalog::initial_regions().remove(1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(
            attach_random_event(&mut region, &EventRegistry::default(), &mut rng),
            None
        );
        assert!(region.active_events.is_empty());
    }
}
