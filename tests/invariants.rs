use ecorestore::{
    catalog::ActionType,
    engine::{EngineBuilder, EngineSettings},
    world::{Position, METRIC_MAX, METRIC_MIN},
};
use proptest::prelude::*;

const REGIONS: [&str; 3] = ["region_rainforest", "region_desert", "region_wetland"];

#[derive(Debug, Clone)]
enum Op {
    Act(ActionType, usize),
    Trigger(usize),
    Advance,
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            (0..ActionType::ALL.len(), 0..REGIONS.len())
                .prop_map(|(a, r)| Op::Act(ActionType::ALL[a], r)),
            (0..REGIONS.len()).prop_map(Op::Trigger),
            Just(Op::Advance),
            Just(Op::Advance),
        ],
        1..=max_ops,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Region metrics stay inside [0, 100] whatever the player and the dice do.
    #[test]
    fn metrics_stay_in_bounds(seed in any::<u64>(), ops in arb_ops(80)) {
        let mut engine = EngineBuilder::new(EngineSettings { seed, ..EngineSettings::default() })
            .with_default_systems()
            .build();
        engine.add_resources(10_000);
        for op in ops {
            match op {
                Op::Act(action, region) => {
                    engine.perform_action(action, REGIONS[region], Position::default(), None);
                }
                Op::Trigger(region) => {
                    engine.trigger_random_event(REGIONS[region]);
                }
                Op::Advance => {
                    engine.advance_cycle();
                }
            }
            for region in engine.world().regions() {
                for value in [
                    region.health,
                    region.biodiversity,
                    region.water_quality,
                    region.pollution_level,
                ] {
                    prop_assert!((METRIC_MIN..=METRIC_MAX).contains(&value), "{} out of bounds: {value}", region.id);
                }
            }
        }
    }

    /// A rejected action leaves resources and regions exactly as they were.
    #[test]
    fn rejection_is_side_effect_free(balance in 0i64..40, action in 0..ActionType::ALL.len()) {
        let mut engine = EngineBuilder::new(EngineSettings { starting_resources: balance, ..EngineSettings::default() })
            .build();
        let action = ActionType::ALL[action];
        let regions = engine.world().regions().to_vec();
        let stats = engine.stats().clone();
        let accepted = engine.perform_action(action, "region_desert", Position::default(), None);
        let cost = i64::from(engine.action(action).unwrap().cost);
        prop_assert_eq!(accepted, balance >= cost);
        if !accepted {
            prop_assert_eq!(engine.resources(), balance);
            prop_assert_eq!(engine.world().regions(), regions.as_slice());
            prop_assert_eq!(engine.stats(), &stats);
        }
    }
}
