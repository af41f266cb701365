//! Error types for configuration, state validation and the run driver.

use thiserror::Error;

pub type SimResult<T> = Result<T, SimulationError>;

/// A physically inadmissible cell found by the post-step validation pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("non-positive density {value} at cell ({i}, {j})")]
    NonPositiveDensity { i: usize, j: usize, value: f64 },

    #[error("negative pressure {value} at cell ({i}, {j})")]
    NegativePressure { i: usize, j: usize, value: f64 },

    #[error("non-finite state at cell ({i}, {j})")]
    NonFiniteState { i: usize, j: usize },
}

impl StateError {
    pub fn cell(&self) -> (usize, usize) {
        match *self {
            StateError::NonPositiveDensity { i, j, .. }
            | StateError::NegativePressure { i, j, .. }
            | StateError::NonFiniteState { i, j } => (i, j),
        }
    }
}

/// Rejected before any field is allocated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid dimensions must be positive (nx={nx}, ny={ny})")]
    EmptyGrid { nx: usize, ny: usize },

    #[error("domain lengths must be positive (lx={lx}, ly={ly})")]
    NonPositiveLength { lx: f64, ly: f64 },

    #[error("cfl must be in (0, 1], got {0}")]
    InvalidCfl(f64),

    #[error("gamma must be greater than 1, got {0}")]
    InvalidGamma(f64),

    #[error("free-stream density and pressure must be positive (rho={rho}, p={p})")]
    InvalidFreeStream { rho: f64, p: f64 },

    #[error("obstacle radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("obstacle at ({cx}, {cy}) with radius {radius} lies outside the domain")]
    ObstacleOutside { cx: f64, cy: f64, radius: f64 },

    #[error("obstacle covers every interior cell")]
    ObstacleCoversDomain,

    #[error("pulse width must be positive and amplitude above -1 (sigma={sigma}, amplitude={amplitude})")]
    InvalidPulse { sigma: f64, amplitude: f64 },

    #[error("diagnostic interval must be positive")]
    ZeroInterval,
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("step {step}: {source}")]
    State {
        step: usize,
        #[source]
        source: StateError,
    },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("csv output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
