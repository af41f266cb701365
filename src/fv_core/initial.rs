use crate::fv_core::condition::{FreeStreamInit, PulseInit};
use crate::fv_core::state::Conserved;

use serde::{Deserialize, Serialize};

/// Primitive gas state `(rho, u, v, p)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreeStream {
    pub rho: f64,
    pub u: f64,
    pub v: f64,
    pub p: f64,
}

impl Default for FreeStream {
    fn default() -> Self {
        FreeStream {
            rho: 1.0,
            u: 1.0,
            v: 0.0,
            p: 1.0,
        }
    }
}

impl FreeStream {
    pub fn total_energy(&self, gamma: f64) -> f64 {
        self.p / (gamma - 1.0) + 0.5 * self.rho * (self.u * self.u + self.v * self.v)
    }

    pub fn conserved(&self, gamma: f64) -> Conserved {
        Conserved::new(
            self.rho,
            self.rho * self.u,
            self.rho * self.v,
            self.total_energy(gamma),
        )
    }

    /// Same density and pressure with the gas brought to rest; the state held
    /// by solid cells.
    pub fn at_rest(&self, gamma: f64) -> Conserved {
        Conserved::new(self.rho, 0.0, 0.0, self.p / (gamma - 1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl Default for Cylinder {
    fn default() -> Self {
        Cylinder {
            cx: 0.5,
            cy: 0.5,
            radius: 0.1,
        }
    }
}

impl Cylinder {
    /// Boundary inclusive.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (x - self.cx) * (x - self.cx) + (y - self.cy) * (y - self.cy) <= self.radius * self.radius
    }
}

/// Gaussian density and pressure bump on top of the free stream,
/// `1 + amplitude * exp(-r^2 / (2 sigma^2))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianPulse {
    pub x: f64,
    pub y: f64,
    pub sigma: f64,
    pub amplitude: f64,
}

impl GaussianPulse {
    pub fn factor(&self, x: f64, y: f64) -> f64 {
        let r2 = (x - self.x).powi(2) + (y - self.y).powi(2);
        1.0 + self.amplitude * (-r2 / (2.0 * self.sigma * self.sigma)).exp()
    }
}

pub fn cylinder_in_stream(free_stream: FreeStream, gamma: f64, cylinder: Cylinder) -> FreeStreamInit {
    FreeStreamInit {
        free_stream,
        gamma,
        obstacle: Some(cylinder),
    }
}

pub fn open_channel(free_stream: FreeStream, gamma: f64) -> FreeStreamInit {
    FreeStreamInit {
        free_stream,
        gamma,
        obstacle: None,
    }
}

pub fn pulse_in_stream(base: FreeStreamInit, pulse: GaussianPulse) -> PulseInit {
    PulseInit { base, pulse }
}
