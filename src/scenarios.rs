use crate::config::{BoundaryConfig, SimulationConfig};
use crate::fv_core::{
    condition::BoundaryKind,
    initial::{Cylinder, GaussianPulse},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Uniform inflow past a cylinder between reflective walls.
    Cylinder,
    /// Density pulse advected through an open channel, no obstacle.
    Channel,
}

impl Scenario {
    pub fn config(self) -> SimulationConfig {
        match self {
            Scenario::Cylinder => cylinder(),
            Scenario::Channel => channel(),
        }
    }
}

pub fn cylinder() -> SimulationConfig {
    SimulationConfig {
        obstacle: Some(Cylinder::default()),
        ..SimulationConfig::default()
    }
}

pub fn channel() -> SimulationConfig {
    SimulationConfig {
        obstacle: None,
        pulse: Some(GaussianPulse {
            x: 0.5,
            y: 0.5,
            sigma: 0.1,
            amplitude: 0.5,
        }),
        boundaries: BoundaryConfig {
            left: BoundaryKind::Inflow,
            right: BoundaryKind::Outflow,
            bottom: BoundaryKind::Outflow,
            top: BoundaryKind::Outflow,
        },
        ..SimulationConfig::default()
    }
}
