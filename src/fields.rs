use std::ops::{Index, IndexMut};

use crate::error::{Result, SolverError};
use crate::grid::{BorderPosition, Grid};
use crate::solver::boundary::apply_flux;
use crate::solver::core::Discretization;
use crate::solver::SolverParams;

/// Fast index for cells where x,y are guaranteed in-bounds.
#[inline(always)]
pub const fn idx_inner(x: usize, y: usize, nx: usize) -> usize {
    y * nx + x
}

/// Dense 2D array over the padded index range, indexed as `m[(i, j)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self::filled(nx, ny, 0.0)
    }

    pub fn filled(nx: usize, ny: usize, value: f64) -> Self {
        Self { nx, ny, data: vec![value; nx * ny] }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[idx_inner(i, j, self.nx)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[idx_inner(i, j, self.nx)]
    }
}

/// Staggered field store.
///
/// `u[(i, j)]` lives on the right face of cell `(i, j)`, `v[(i, j)]` on its top
/// face, `p` and `t` at the centre. All arrays cover `[0, imax+1] x [0, jmax+1]`;
/// the outer ring holds ghost values written by the boundary appliers.
pub struct Fields {
    pub u: Matrix,
    pub v: Matrix,
    pub p: Matrix,
    pub t: Matrix,
    /// Provisional momentum fluxes.
    pub f: Matrix,
    pub g: Matrix,
    /// Right-hand side of the pressure equation.
    pub rs: Matrix,
    /// Scratch buffer for the next temperature field.
    pub(crate) t_next: Matrix,
    nu: f64,
    pub(crate) alpha: f64,
    pub(crate) beta: f64,
    gx: f64,
    gy: f64,
    tau: f64,
    dt: f64,
    pub(crate) disc: Discretization,
}

impl Fields {
    /// Allocate all arrays and set the initial state on fluid cells.
    pub fn new(grid: &Grid, params: &SolverParams) -> Self {
        let (nx, ny) = (grid.imax() + 2, grid.jmax() + 2);
        let mut fields = Self {
            u: Matrix::new(nx, ny),
            v: Matrix::new(nx, ny),
            p: Matrix::new(nx, ny),
            t: Matrix::new(nx, ny),
            f: Matrix::new(nx, ny),
            g: Matrix::new(nx, ny),
            rs: Matrix::new(nx, ny),
            t_next: Matrix::new(nx, ny),
            nu: params.nu,
            alpha: params.alpha,
            beta: params.beta,
            gx: params.gx,
            gy: params.gy,
            tau: params.tau,
            dt: params.dt,
            disc: Discretization::new(grid.dx(), grid.dy(), params.gamma),
        };
        for cell in grid.fluid_cells() {
            let ij = (cell.i(), cell.j());
            fields.u[ij] = params.ui;
            fields.v[ij] = params.vi;
            fields.p[ij] = params.pi;
            fields.t[ij] = params.ti;
        }
        fields
    }

    /// Currently active timestep.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Whole pressure array, for the pressure solver.
    pub fn p_matrix_mut(&mut self) -> &mut Matrix {
        &mut self.p
    }

    /// Provisional fluxes F and G on fluid cells, followed by the flux
    /// boundary conditions. Later passes win on shared ghost indices.
    pub fn calculate_fluxes(&mut self, grid: &Grid, energy_eq: bool) {
        let gravity = if energy_eq { 0.0 } else { 1.0 };
        for cell in grid.fluid_cells() {
            let (i, j) = (cell.i(), cell.j());
            let mut f = self.u[(i, j)]
                + self.dt
                    * (self.nu * self.disc.laplacian(&self.u, i, j)
                        - self.disc.convection_u(&self.u, &self.v, i, j)
                        + gravity * self.gx);
            let mut g = self.v[(i, j)]
                + self.dt
                    * (self.nu * self.disc.laplacian(&self.v, i, j)
                        - self.disc.convection_v(&self.u, &self.v, i, j)
                        + gravity * self.gy);
            if energy_eq {
                let (bx, by) = self.buoyancy(i, j);
                f -= self.gx * self.dt * bx;
                g -= self.gy * self.dt * by;
            }
            self.f[(i, j)] = f;
            self.g[(i, j)] = g;
        }

        apply_flux(self, grid, grid.fixed_wall_cells());
        if energy_eq {
            apply_flux(self, grid, grid.cold_fixed_wall_cells());
            apply_flux(self, grid, grid.hot_fixed_wall_cells());
            apply_flux(self, grid, grid.adiabatic_fixed_wall_cells());
        }
        apply_flux(self, grid, grid.moving_wall_cells());
        apply_flux(self, grid, grid.inflow_cells());
        apply_flux(self, grid, grid.outflow_cells());
    }

    /// Discrete divergence of (F, G) scaled by 1/dt.
    pub fn calculate_rs(&mut self, grid: &Grid) {
        let idt = 1.0 / self.dt;
        let (dx, dy) = (grid.dx(), grid.dy());
        for cell in grid.fluid_cells() {
            let (i, j) = (cell.i(), cell.j());
            let left = grid.neighbour_ij(cell, BorderPosition::Left);
            let bottom = grid.neighbour_ij(cell, BorderPosition::Bottom);
            self.rs[(i, j)] = idt
                * ((self.f[(i, j)] - self.f[left]) / dx + (self.g[(i, j)] - self.g[bottom]) / dy);
        }
    }

    /// Projection: subtract the pressure gradient from the provisional fluxes.
    pub fn calculate_velocities(&mut self, grid: &Grid) {
        let (dtdx, dtdy) = (self.dt / grid.dx(), self.dt / grid.dy());
        for cell in grid.fluid_cells() {
            let (i, j) = (cell.i(), cell.j());
            let right = grid.neighbour_ij(cell, BorderPosition::Right);
            let top = grid.neighbour_ij(cell, BorderPosition::Top);
            self.u[(i, j)] = self.f[(i, j)] - dtdx * (self.p[right] - self.p[(i, j)]);
            self.v[(i, j)] = self.g[(i, j)] - dtdy * (self.p[top] - self.p[(i, j)]);
        }
    }

    /// Adaptive timestep from the viscous and convective stability limits.
    pub fn calculate_dt(&mut self, grid: &Grid) -> Result<f64> {
        self.adapt_dt(grid, false)
    }

    /// As [`Fields::calculate_dt`], additionally bounded by thermal diffusion.
    pub fn calculate_dt_e(&mut self, grid: &Grid) -> Result<f64> {
        self.adapt_dt(grid, true)
    }

    fn adapt_dt(&mut self, grid: &Grid, energy_eq: bool) -> Result<f64> {
        let (max_u, max_v) = self.max_velocities(grid)?;
        let (dx2, dy2) = (grid.dx() * grid.dx(), grid.dy() * grid.dy());
        let diffusive = dx2 * dy2 / (dx2 + dy2) / 2.0;

        let mut bound = diffusive / self.nu;
        if energy_eq {
            bound = bound.min(diffusive / self.alpha);
        }
        // A field at rest imposes no convective limit.
        if max_u > 0.0 {
            bound = bound.min(grid.dx() / max_u);
        }
        if max_v > 0.0 {
            bound = bound.min(grid.dy() / max_v);
        }
        self.dt = self.tau * bound;
        Ok(self.dt)
    }

    /// Largest |U| and |V| over fluid cells. Fails on the first non-finite value.
    pub fn max_velocities(&self, grid: &Grid) -> Result<(f64, f64)> {
        let mut max_u = 0.0_f64;
        let mut max_v = 0.0_f64;
        for cell in grid.fluid_cells() {
            let (i, j) = (cell.i(), cell.j());
            let (u, v) = (self.u[(i, j)], self.v[(i, j)]);
            if !u.is_finite() || !v.is_finite() {
                return Err(SolverError::Diverged { i, j });
            }
            max_u = max_u.max(u.abs());
            max_v = max_v.max(v.abs());
        }
        Ok((max_u, max_v))
    }
}
