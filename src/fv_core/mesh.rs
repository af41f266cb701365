use std::ops::RangeInclusive;

pub trait Mesh: Sync {
    fn get_dx(&self) -> f64;

    fn get_dy(&self) -> f64;

    fn get_cell(&self, i: usize, j: usize) -> (f64, f64);

    fn get_length(&self) -> usize;

    fn get_num_physical_points(&self) -> (usize, usize);

    fn stride(&self) -> usize;

    fn idx(&self, i: usize, j: usize) -> usize {
        i * self.stride() + j
    }
}

/// Uniform cell-centred grid over `[0, lx] x [0, ly]` with one ghost layer
/// on every side. Cell `(i, j)` is stored at `i * (ny + 2) + j`.
#[derive(Debug, Clone)]
pub struct Mesh2d {
    dx: f64,
    dy: f64,
    nx: usize,
    ny: usize,
    x_points: Vec<f64>,
    y_points: Vec<f64>,
}

impl Mesh2d {
    pub fn new(lx: f64, ly: f64, nx: usize, ny: usize) -> Self {
        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let x_points: Vec<f64> = (0..nx + 2).map(|i| (i as f64 - 0.5) * dx).collect();
        let y_points: Vec<f64> = (0..ny + 2).map(|j| (j as f64 - 0.5) * dy).collect();
        Mesh2d {
            dx,
            dy,
            nx,
            ny,
            x_points,
            y_points,
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn interior_x(&self) -> RangeInclusive<usize> {
        1..=self.nx
    }

    pub fn interior_y(&self) -> RangeInclusive<usize> {
        1..=self.ny
    }
}

impl Mesh for Mesh2d {
    fn get_dx(&self) -> f64 {
        self.dx
    }

    fn get_dy(&self) -> f64 {
        self.dy
    }

    fn get_cell(&self, i: usize, j: usize) -> (f64, f64) {
        (self.x_points[i], self.y_points[j])
    }

    fn get_length(&self) -> usize {
        (self.nx + 2) * (self.ny + 2)
    }

    fn get_num_physical_points(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    fn stride(&self) -> usize {
        self.ny + 2
    }
}
