extern crate nalgebra as na;

use crate::fv_core::mesh::Mesh;
use rayon::prelude::*;

/// Conservative state of one cell: `(rho, rho_u, rho_v, energy)`.
pub type Conserved = na::Vector4<f64>;

pub const RHO: usize = 0;
pub const RHO_U: usize = 1;
pub const RHO_V: usize = 2;
pub const ENERGY: usize = 3;

/// Four parallel arrays of conservative variables over the grid including
/// the ghost ring. A column is the contiguous run of cells sharing one `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    columns: usize,
    stride: usize,
    pub rho: na::DVector<f64>,
    pub rho_u: na::DVector<f64>,
    pub rho_v: na::DVector<f64>,
    pub energy: na::DVector<f64>,
}

pub struct ColumnMut<'a> {
    pub rho: &'a mut [f64],
    pub rho_u: &'a mut [f64],
    pub rho_v: &'a mut [f64],
    pub energy: &'a mut [f64],
}

impl ColumnMut<'_> {
    pub fn get(&self, j: usize) -> Conserved {
        Conserved::new(self.rho[j], self.rho_u[j], self.rho_v[j], self.energy[j])
    }

    pub fn set(&mut self, j: usize, u: &Conserved) {
        self.rho[j] = u[RHO];
        self.rho_u[j] = u[RHO_U];
        self.rho_v[j] = u[RHO_V];
        self.energy[j] = u[ENERGY];
    }

    pub fn fill(&mut self, u: &Conserved) {
        self.rho.fill(u[RHO]);
        self.rho_u.fill(u[RHO_U]);
        self.rho_v.fill(u[RHO_V]);
        self.energy.fill(u[ENERGY]);
    }
}

impl Field {
    pub fn zeros(mesh: &dyn Mesh) -> Self {
        let size = mesh.get_length();
        let stride = mesh.stride();
        Field {
            columns: size / stride,
            stride,
            rho: na::DVector::zeros(size),
            rho_u: na::DVector::zeros(size),
            rho_v: na::DVector::zeros(size),
            energy: na::DVector::zeros(size),
        }
    }

    pub fn nx(&self) -> usize {
        self.columns - 2
    }

    pub fn ny(&self) -> usize {
        self.stride - 2
    }

    pub fn len(&self) -> usize {
        self.rho.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rho.is_empty()
    }

    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        i * self.stride + j
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Conserved {
        let k = self.idx(i, j);
        Conserved::new(self.rho[k], self.rho_u[k], self.rho_v[k], self.energy[k])
    }

    pub fn set(&mut self, i: usize, j: usize, u: &Conserved) {
        let k = self.idx(i, j);
        self.rho[k] = u[RHO];
        self.rho_u[k] = u[RHO_U];
        self.rho_v[k] = u[RHO_V];
        self.energy[k] = u[ENERGY];
    }

    pub fn column_mut(&mut self, i: usize) -> ColumnMut<'_> {
        let range = i * self.stride..(i + 1) * self.stride;
        ColumnMut {
            rho: &mut self.rho.as_mut_slice()[range.clone()],
            rho_u: &mut self.rho_u.as_mut_slice()[range.clone()],
            rho_v: &mut self.rho_v.as_mut_slice()[range.clone()],
            energy: &mut self.energy.as_mut_slice()[range],
        }
    }

    /// Disjoint mutable columns in `i` order, for parallel sweeps.
    pub fn par_columns_mut(&mut self) -> impl IndexedParallelIterator<Item = ColumnMut<'_>> + '_ {
        let stride = self.stride;
        self.rho
            .as_mut_slice()
            .par_chunks_mut(stride)
            .zip(self.rho_u.as_mut_slice().par_chunks_mut(stride))
            .zip(self.rho_v.as_mut_slice().par_chunks_mut(stride))
            .zip(self.energy.as_mut_slice().par_chunks_mut(stride))
            .map(|(((rho, rho_u), rho_v), energy)| ColumnMut {
                rho,
                rho_u,
                rho_v,
                energy,
            })
    }

    pub fn copy_column(&mut self, src: usize, dst: usize) {
        let from = src * self.stride..(src + 1) * self.stride;
        let to = dst * self.stride;
        self.rho.as_mut_slice().copy_within(from.clone(), to);
        self.rho_u.as_mut_slice().copy_within(from.clone(), to);
        self.rho_v.as_mut_slice().copy_within(from.clone(), to);
        self.energy.as_mut_slice().copy_within(from, to);
    }

    pub fn fill_column(&mut self, i: usize, u: &Conserved) {
        self.column_mut(i).fill(u);
    }
}

/// Solid-cell flags, fixed once the initial condition has been computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleMask {
    stride: usize,
    solid: Vec<bool>,
}

impl ObstacleMask {
    pub fn empty(mesh: &dyn Mesh) -> Self {
        ObstacleMask {
            stride: mesh.stride(),
            solid: vec![false; mesh.get_length()],
        }
    }

    #[inline]
    pub fn is_solid(&self, i: usize, j: usize) -> bool {
        self.solid[i * self.stride + j]
    }

    pub fn par_columns_mut(&mut self) -> impl IndexedParallelIterator<Item = &mut [bool]> + '_ {
        self.solid.par_chunks_mut(self.stride)
    }

    pub fn count_interior(&self) -> usize {
        let columns = self.solid.len() / self.stride;
        (1..columns - 1)
            .map(|i| {
                (1..self.stride - 1)
                    .filter(|&j| self.is_solid(i, j))
                    .count()
            })
            .sum()
    }
}
