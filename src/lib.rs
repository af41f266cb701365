//! Explicit Lax-Friedrichs solver for the 2D compressible Euler equations in
//! a channel with a circular obstacle.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fv_core;
pub mod scenarios;
pub mod time_integrator;

pub use config::SimulationConfig;
pub use error::{ConfigError, SimResult, SimulationError, StateError};
pub use time_integrator::driver::{run, DiagnosticSample, Run, Simulation};
