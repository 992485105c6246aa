use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{Region, World},
};

/// Floor of the mean ecological index; 0 with no regions.
pub fn mean_score(regions: &[Region]) -> i64 {
    if regions.is_empty() {
        return 0;
    }
    let total: f64 = regions.iter().map(Region::ecological_index).sum();
    (total / regions.len() as f64).floor() as i64
}

/// Recounts restored regions and replaces the score with the cycle-end
/// ecological score, discarding any action bonuses earned this cycle.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        _ctx: &mut SystemContext<'_>,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let restored = u32::try_from(world.restored_regions())?;
        let score = mean_score(&world.regions);
        world.stats.regions_restored = restored;
        world.stats.total_score = score;
        world.score = score;
        Ok(())
    }
}
