//! Hourly demand-response market simulator.
//!
//! Users with shiftable appliances and storage play a best-response game
//! against a quadratic price rule, one hour at a time.

pub mod agents;
pub mod config;
pub mod error;
pub mod io;
pub mod market;
pub mod solver;
