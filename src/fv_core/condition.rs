use crate::fv_core::initial::{Cylinder, FreeStream, GaussianPulse};
use crate::fv_core::mesh::Mesh;
use crate::fv_core::state::{ColumnMut, Conserved, Field, ObstacleMask, RHO_U, RHO_V};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

//traits
pub trait InitialCondition: Send + Sync {
    fn compute(&self, mesh: &dyn Mesh) -> (Field, ObstacleMask);
}

pub trait BCEnforcer: Sync {
    fn enforce(&self, u: &mut Field);
}

//structs for initial
pub struct FreeStreamInit {
    pub free_stream: FreeStream,
    pub gamma: f64,
    pub obstacle: Option<Cylinder>,
}

pub struct PulseInit {
    pub base: FreeStreamInit,
    pub pulse: GaussianPulse,
}

//structs for boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    /// Ghost cells pinned to the free stream.
    Inflow,
    /// Zero-gradient copy of the adjacent interior cells.
    Outflow,
    /// Mirror of the adjacent cells with the wall-normal momentum negated.
    Reflective,
}

/// Per-edge policies for the rectangular channel. Left/right ghost columns
/// are written first, then bottom/top rows, so rows own the four corners.
pub struct ChannelBC {
    pub left: BoundaryKind,
    pub right: BoundaryKind,
    pub bottom: BoundaryKind,
    pub top: BoundaryKind,
    pub inflow: Conserved,
}

//implementation for initial
impl InitialCondition for FreeStreamInit {
    fn compute(&self, mesh: &dyn Mesh) -> (Field, ObstacleMask) {
        let mut u = Field::zeros(mesh);
        let mut mask = ObstacleMask::empty(mesh);
        let fluid = self.free_stream.conserved(self.gamma);
        let rest = self.free_stream.at_rest(self.gamma);
        let (_, ny) = mesh.get_num_physical_points();

        u.par_columns_mut()
            .zip(mask.par_columns_mut())
            .enumerate()
            .for_each(|(i, (mut col, solid))| {
                for j in 0..ny + 2 {
                    let (x, y) = mesh.get_cell(i, j);
                    let inside = self.obstacle.is_some_and(|c| c.contains(x, y));
                    solid[j] = inside;
                    col.set(j, if inside { &rest } else { &fluid });
                }
            });

        (u, mask)
    }
}

impl InitialCondition for PulseInit {
    fn compute(&self, mesh: &dyn Mesh) -> (Field, ObstacleMask) {
        let (mut u, mask) = self.base.compute(mesh);
        let gamma = self.base.gamma;
        let (_, ny) = mesh.get_num_physical_points();

        u.par_columns_mut().enumerate().for_each(|(i, mut col)| {
            for j in 0..ny + 2 {
                if mask.is_solid(i, j) {
                    continue;
                }
                let (x, y) = mesh.get_cell(i, j);
                let factor = self.pulse.factor(x, y);
                let state = FreeStream {
                    rho: self.base.free_stream.rho * factor,
                    p: self.base.free_stream.p * factor,
                    ..self.base.free_stream
                };
                col.set(j, &state.conserved(gamma));
            }
        });

        (u, mask)
    }
}

//implementation for boundary
fn mirror(u: Conserved, normal: usize) -> Conserved {
    let mut ghost = u;
    ghost[normal] = -ghost[normal];
    ghost
}

impl ChannelBC {
    fn enforce_column(&self, u: &mut Field, ghost: usize, adjacent: usize, kind: BoundaryKind) {
        match kind {
            BoundaryKind::Inflow => u.fill_column(ghost, &self.inflow),
            BoundaryKind::Outflow => u.copy_column(adjacent, ghost),
            BoundaryKind::Reflective => {
                u.copy_column(adjacent, ghost);
                u.column_mut(ghost).rho_u.iter_mut().for_each(|m| *m = -*m);
            }
        }
    }

    fn enforce_row(&self, col: &mut ColumnMut<'_>, ghost: usize, adjacent: usize, kind: BoundaryKind) {
        let state = match kind {
            BoundaryKind::Inflow => self.inflow,
            BoundaryKind::Outflow => col.get(adjacent),
            BoundaryKind::Reflective => mirror(col.get(adjacent), RHO_V),
        };
        col.set(ghost, &state);
    }
}

impl BCEnforcer for ChannelBC {
    fn enforce(&self, u: &mut Field) {
        let nx = u.nx();
        let ny = u.ny();

        self.enforce_column(u, 0, 1, self.left);
        self.enforce_column(u, nx + 1, nx, self.right);

        u.par_columns_mut().for_each(|mut col| {
            self.enforce_row(&mut col, 0, 1, self.bottom);
            self.enforce_row(&mut col, ny + 1, ny, self.top);
        });
    }
}

pub fn initialize_mesh<I, B>(mesh: &dyn Mesh, init: &I, bc: &B) -> (Field, ObstacleMask)
where
    I: InitialCondition + ?Sized,
    B: BCEnforcer + ?Sized,
{
    let (mut u, mask) = init.compute(mesh);
    bc.enforce(&mut u);
    (u, mask)
}
