use crate::fv_core::{
    flux::FluxFunction,
    state::{Field, ObstacleMask},
};

use rayon::prelude::*;

//TRAITS
pub trait TimeIntegrator: Sync {
    /// Writes the state one step ahead of `u` into `u_new`. Only `u` is read.
    fn update(
        &self,
        u: &Field,
        u_new: &mut Field,
        mask: &ObstacleMask,
        dx: f64,
        dy: f64,
        dt: f64,
        flux_func: &dyn FluxFunction,
    );
}

//STRUCTS
/// Two-dimensional Lax-Friedrichs: four-neighbour average minus centred flux
/// differences. Solid cells and the ghost ring are carried over unchanged.
pub struct LaxFriedrichs2d;

//IMPLEMENTATIONS
impl TimeIntegrator for LaxFriedrichs2d {
    fn update(
        &self,
        u: &Field,
        u_new: &mut Field,
        mask: &ObstacleMask,
        dx: f64,
        dy: f64,
        dt: f64,
        flux_func: &dyn FluxFunction,
    ) {
        let nx = u.nx();
        let ny = u.ny();
        let dtdx = dt / (2.0 * dx);
        let dtdy = dt / (2.0 * dy);

        u_new.par_columns_mut().enumerate().for_each(|(i, mut col)| {
            for j in 0..ny + 2 {
                if i == 0 || i > nx || j == 0 || j > ny || mask.is_solid(i, j) {
                    col.set(j, &u.get(i, j));
                    continue;
                }

                let east = u.get(i + 1, j);
                let west = u.get(i - 1, j);
                let north = u.get(i, j + 1);
                let south = u.get(i, j - 1);

                let average = 0.25 * (east + west + north + south);
                let updated = average
                    - dtdx * (flux_func.flux_x(&east) - flux_func.flux_x(&west))
                    - dtdy * (flux_func.flux_y(&north) - flux_func.flux_y(&south));

                col.set(j, &updated);
            }
        });
    }
}

//HELPERS
/// `cfl * min(dx, dy) / s_max / 2`, fixed for the whole run.
pub fn calc_time_step(dx: f64, dy: f64, cfl: f64, s_max: f64) -> f64 {
    cfl * dx.min(dy) / s_max / 2.0
}
