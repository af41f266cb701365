use crate::fv_core::state::{Conserved, ENERGY, RHO, RHO_U, RHO_V};

use serde::{Deserialize, Serialize};

pub trait FluxFunction: Sync {
    fn flux_x(&self, u: &Conserved) -> Conserved;

    fn flux_y(&self, u: &Conserved) -> Conserved;
}

/// Ideal-gas Euler fluxes with a fixed ratio of specific heats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EulerFlux {
    pub gamma: f64,
}

/// `p = (gamma - 1) * (E - 0.5 * rho * (u^2 + v^2))`. Not clamped: a state
/// with too little internal energy yields a negative pressure.
pub fn pressure(gamma: f64, rho: f64, rho_u: f64, rho_v: f64, energy: f64) -> f64 {
    let u = rho_u / rho;
    let v = rho_v / rho;
    let kinetic = 0.5 * rho * (u * u + v * v);
    (gamma - 1.0) * (energy - kinetic)
}

impl EulerFlux {
    pub fn pressure(&self, u: &Conserved) -> f64 {
        pressure(self.gamma, u[RHO], u[RHO_U], u[RHO_V], u[ENERGY])
    }

    pub fn sound_speed(&self, rho: f64, p: f64) -> f64 {
        (self.gamma * p / rho).sqrt()
    }
}

impl FluxFunction for EulerFlux {
    fn flux_x(&self, u: &Conserved) -> Conserved {
        let vel = u[RHO_U] / u[RHO];
        let p = self.pressure(u);
        Conserved::new(
            u[RHO_U],
            u[RHO_U] * vel + p,
            u[RHO_V] * vel,
            (u[ENERGY] + p) * vel,
        )
    }

    fn flux_y(&self, u: &Conserved) -> Conserved {
        let vel = u[RHO_V] / u[RHO];
        let p = self.pressure(u);
        Conserved::new(
            u[RHO_V],
            u[RHO_U] * vel,
            u[RHO_V] * vel + p,
            (u[ENERGY] + p) * vel,
        )
    }
}
