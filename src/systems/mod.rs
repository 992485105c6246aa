mod bookkeeping;
mod disturbance;
mod environment;

pub use bookkeeping::{mean_score, BookkeepingSystem};
pub use disturbance::{attach_random_event, DisturbanceSystem};
pub use environment::{update_region, EnvironmentSystem, MetricDeltas};
