use anyhow::Result;

use crate::{
    engine::{EventPlacement, System, SystemContext},
    rng::SystemRng,
    world::{EffectSource, Metric, Region, World},
};

/// Maturity gained by every plant each cycle.
pub const PLANT_GROWTH_PER_CYCLE: f64 = 2.0;
/// Accumulated deltas are divided by this before being applied.
pub const DELTA_DAMPING: f64 = 10.0;

/// Per-metric sums gathered over one region pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricDeltas {
    pub health: f64,
    pub biodiversity: f64,
    pub water_quality: f64,
    pub pollution_level: f64,
}

impl MetricDeltas {
    pub fn add(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Health => self.health += value,
            Metric::Biodiversity => self.biodiversity += value,
            Metric::WaterQuality => self.water_quality += value,
            Metric::PollutionLevel => self.pollution_level += value,
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Health => self.health,
            Metric::Biodiversity => self.biodiversity,
            Metric::WaterQuality => self.water_quality,
            Metric::PollutionLevel => self.pollution_level,
        }
    }

    /// Adds every effect of every source, scaled by the source's condition.
    pub fn accumulate<S: EffectSource>(&mut self, sources: &[S]) {
        for source in sources {
            let ratio = source.condition_ratio();
            for effect in source.effects() {
                self.add(effect.target, effect.magnitude * ratio);
            }
        }
    }

    fn apply(&self, region: &mut Region) {
        for metric in [
            Metric::Health,
            Metric::Biodiversity,
            Metric::WaterQuality,
            Metric::PollutionLevel,
        ] {
            region.adjust(metric, self.get(metric) / DELTA_DAMPING);
        }
    }
}

/// Runs one cycle of entity contributions and event ticking for a region.
/// Returns the ids of events that expired during the pass.
///
/// Active events apply their metric effects before their timer is
/// decremented; events arriving with no time left are dropped unapplied.
/// Pollution-targeting event magnitudes always count as positive.
pub fn update_region(region: &mut Region) -> Vec<String> {
    let mut deltas = MetricDeltas::default();
    deltas.accumulate(&region.plants);
    deltas.accumulate(&region.animals);
    deltas.accumulate(&region.water_sources);
    deltas.accumulate(&region.structures);

    let mut expired = Vec::new();
    for mut event in std::mem::take(&mut region.active_events) {
        let remaining = event.time_remaining.unwrap_or(0);
        if remaining <= 0 {
            expired.push(event.id);
            continue;
        }
        for effect in &event.effects {
            match effect.target.metric() {
                Some(Metric::PollutionLevel) => {
                    deltas.add(Metric::PollutionLevel, effect.magnitude.abs())
                }
                Some(metric) => deltas.add(metric, effect.magnitude),
                // plant, animal and water targets have no region metric
                None => {}
            }
        }
        let left = remaining - 1;
        if left <= 0 {
            expired.push(event.id);
        } else {
            event.time_remaining = Some(left);
            region.active_events.push(event);
        }
    }

    for plant in &mut region.plants {
        plant.maturity = (plant.maturity + PLANT_GROWTH_PER_CYCLE).min(100.0);
    }

    deltas.apply(region);
    expired
}

pub struct EnvironmentSystem;

impl EnvironmentSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvironmentSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for EnvironmentSystem {
    fn name(&self) -> &str {
        "environment"
    }

    fn run(
        &mut self,
        ctx: &mut SystemContext<'_>,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for region in &mut world.regions {
            for event_id in update_region(region) {
                tracing::debug!(region = %region.id, event = %event_id, "event expired");
                ctx.report.expired.push(EventPlacement {
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
    use crate::{
        catalog,
        events::EventRegistry,
        world::{EcosystemType, Position},
    };

    fn desert() -> Region {
        catalog::initial_regions()
            .into_iter()
            .find(|region| region.kind == EcosystemType::Desert)
            .unwrap()
    }

    #[test]
    fn empty_region_is_unchanged() {
        let mut region = desert();
        let before = region.clone();
        assert!(update_region(&mut region).is_empty());
        assert_eq!(region, before);
    }

    #[test]
    fn seedling_contributes_nothing_but_grows() {
        let mut region = desert();
        let template = catalog::find_plant(EcosystemType::Desert, "Saguaro Cactus").unwrap();
        region
            .plants
            .push(template.instantiate("plant_a".into(), Position::default()));
        update_region(&mut region);
        assert_eq!(region.health, 20.0);
        assert_eq!(region.plants[0].maturity, 2.0);
    }

    #[test]
    fn event_applies_then_counts_down() {
        let mut region = desert();
        let drought = EventRegistry::with_defaults().find("drought").unwrap().activate();
        region.active_events.push(drought);
        let expired = update_region(&mut region);
        assert!(expired.is_empty());
        assert_eq!(region.active_events[0].time_remaining, Some(4));
        // drought: health -10, water quality -15
        assert_eq!(region.health, 19.0);
        assert_eq!(region.water_quality, 8.5);
    }

    #[test]
    fn stale_event_is_dropped_without_effect() {
        let mut region = desert();
        let mut drought = EventRegistry::with_defaults().find("drought").unwrap().activate();
        drought.time_remaining = Some(0);
        region.active_events.push(drought);
        assert_eq!(update_region(&mut region), vec!["drought".to_string()]);
        assert!(region.active_events.is_empty());
        assert_eq!(region.health, 20.0);
    }

    #[test]
    fn pollution_effects_always_raise_pollution() {
        let mut region = desert();
        let mut spill = EventRegistry::with_defaults()
            .find("pollution_spill")
            .unwrap()
            .activate();
        for effect in &mut spill.effects {
            effect.magnitude = -effect.magnitude.abs();
        }
        region.active_events.push(spill);
        update_region(&mut region);
        assert!(region.pollution_level > 40.0);
    }
}
