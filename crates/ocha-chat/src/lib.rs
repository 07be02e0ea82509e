pub mod accumulator;
pub mod error;
pub mod orchestrator;

pub use accumulator::TurnAccumulator;
pub use error::ChatError;
pub use orchestrator::{Orchestrator, PersistenceMode, TurnOptions};
