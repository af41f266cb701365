use crate::error::StateError;
use crate::fv_core::flux::EulerFlux;
use crate::fv_core::state::{Conserved, Field, ENERGY, RHO, RHO_U, RHO_V};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const DENSITY_FLOOR: f64 = 1e-10;
pub const PRESSURE_FLOOR: f64 = 1e-10;

/// What the driver does with cells that fail [`check_cell`] after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Skip the validation pass.
    Off,
    /// Stop the run at the first bad cell.
    Abort,
    /// Log the bad cells and keep going.
    #[default]
    Warn,
    /// Lift density and pressure to a small floor; non-finite cells still abort.
    Clamp,
}

pub fn check_cell(flux: &EulerFlux, i: usize, j: usize, u: &Conserved) -> Result<(), StateError> {
    if u.iter().any(|v| !v.is_finite()) {
        return Err(StateError::NonFiniteState { i, j });
    }
    if u[RHO] <= 0.0 {
        return Err(StateError::NonPositiveDensity { i, j, value: u[RHO] });
    }
    let p = flux.pressure(u);
    if p < 0.0 {
        return Err(StateError::NegativePressure { i, j, value: p });
    }
    Ok(())
}

/// All inadmissible interior cells, ordered by `(i, j)`.
pub fn scan(u: &Field, flux: &EulerFlux) -> Vec<StateError> {
    let ny = u.ny();
    (1..=u.nx())
        .into_par_iter()
        .flat_map_iter(|i| (1..=ny).filter_map(move |j| check_cell(flux, i, j, &u.get(i, j)).err()))
        .collect()
}

fn clamp_cell(flux: &EulerFlux, i: usize, j: usize, u: &Conserved) -> Result<Option<Conserved>, StateError> {
    match check_cell(flux, i, j, u) {
        Ok(()) => Ok(None),
        Err(err @ StateError::NonFiniteState { .. }) => Err(err),
        Err(_) => {
            let mut fixed = *u;
            fixed[RHO] = fixed[RHO].max(DENSITY_FLOOR);
            if flux.pressure(&fixed) < PRESSURE_FLOOR {
                let kinetic = 0.5 * (fixed[RHO_U] * fixed[RHO_U] + fixed[RHO_V] * fixed[RHO_V]) / fixed[RHO];
                fixed[ENERGY] = PRESSURE_FLOOR / (flux.gamma - 1.0) + kinetic;
            }
            Ok(Some(fixed))
        }
    }
}

/// Repairs interior cells in place and returns how many were touched.
pub fn clamp(u: &mut Field, flux: &EulerFlux) -> Result<usize, StateError> {
    let nx = u.nx();
    let ny = u.ny();
    let counts: Vec<usize> = u
        .par_columns_mut()
        .enumerate()
        .filter(|(i, _)| (1..=nx).contains(i))
        .map(|(i, mut col)| -> Result<usize, StateError> {
            let mut touched = 0;
            for j in 1..=ny {
                if let Some(fixed) = clamp_cell(flux, i, j, &col.get(j))? {
                    col.set(j, &fixed);
                    touched += 1;
                }
            }
            Ok(touched)
        })
        .collect::<Result<Vec<usize>, StateError>>()?;
    Ok(counts.into_iter().sum())
}
