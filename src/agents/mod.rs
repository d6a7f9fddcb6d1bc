//! Market participants and their generators.

/// Random population generation.
pub mod population;
pub mod user;

pub use population::{PopulationGenerator, RandomPopulation};
pub use user::UserAgent;
