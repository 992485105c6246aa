pub mod catalog;
pub mod command;
pub mod engine;
pub mod events;
pub mod observer;
pub mod resolution;
pub mod rng;
pub mod scenario;
pub mod session;
pub mod snapshot;
pub mod systems;
pub mod technology;
pub mod world;

pub use command::{Command, CommandError, Outcome};
pub use engine::{ActionRejected, CycleReport, Engine, EngineBuilder, EngineSettings, RegionHost};
pub use resolution::EventFlow;
pub use scenario::{Scenario, ScenarioLoader};
pub use session::Session;
pub use technology::TechLedger;
pub use world::World;
