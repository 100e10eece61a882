pub mod config;
pub mod error;
pub mod simulation;
pub mod engine;
pub mod input;
pub mod optimizer;
pub mod scheduler;

pub use simulation::*;
pub use config::*;
pub use engine::Engine;
pub use error::{OptimizerError, SimError};
pub use input::Command;
