use crate::error::SimResult;
use crate::fv_core::{
    mesh::Mesh,
    state::{Conserved, Field, ENERGY, RHO, RHO_U, RHO_V},
};
use crate::time_integrator::driver::{DiagnosticSample, Simulation};

use csv::Writer;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct RowData {
    i: usize,
    j: usize,
    x: f64,
    y: f64,
    rho: f64,
    u: f64,
    v: f64,
    p: f64,
    energy: f64,
    solid: bool,
}

/// `0.5 * rho * (u^2 + v^2)` of one cell.
pub fn kinetic_energy_density(u: &Conserved) -> f64 {
    let vx = u[RHO_U] / u[RHO];
    let vy = u[RHO_V] / u[RHO];
    0.5 * u[RHO] * (vx * vx + vy * vy)
}

/// Per-column partial sums are formed in parallel and added in column order,
/// so repeated reductions of the same field agree bit for bit.
fn interior_sum<F>(u: &Field, cell: F) -> f64
where
    F: Fn(&Conserved) -> f64 + Sync,
{
    let ny = u.ny();
    let partial: Vec<f64> = (1..=u.nx())
        .into_par_iter()
        .map(|i| (1..=ny).map(|j| cell(&u.get(i, j))).sum::<f64>())
        .collect();
    partial.iter().sum()
}

pub fn total_kinetic_energy(u: &Field) -> f64 {
    interior_sum(u, kinetic_energy_density)
}

pub fn total_mass(u: &Field) -> f64 {
    interior_sum(u, |c| c[RHO])
}

pub fn write_history(path: impl AsRef<Path>, samples: &[DiagnosticSample]) -> SimResult<()> {
    let mut wtr = Writer::from_path(path)?;
    for sample in samples {
        wtr.serialize(sample)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Interior cells of the final field with primitive variables.
pub fn write_field(path: impl AsRef<Path>, sim: &Simulation) -> SimResult<()> {
    let mesh = sim.mesh();
    let u = sim.state();
    let flux = sim.flux();
    let mut wtr = Writer::from_path(path)?;

    for i in mesh.interior_x() {
        for j in mesh.interior_y() {
            let (x, y) = mesh.get_cell(i, j);
            let cell = u.get(i, j);
            let row = RowData {
                i,
                j,
                x,
                y,
                rho: cell[RHO],
                u: cell[RHO_U] / cell[RHO],
                v: cell[RHO_V] / cell[RHO],
                p: flux.pressure(&cell),
                energy: cell[ENERGY],
                solid: sim.mask().is_solid(i, j),
            };
            wtr.serialize(row)?;
        }
    }
    wtr.flush().map_err(csv::Error::from)?;

    Ok(())
}
