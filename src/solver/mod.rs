pub mod boundary;
pub mod core;
pub mod diagnostics;
mod params;
mod thermal;

use std::collections::BTreeMap;

pub use boundary::Boundary;
pub use params::SolverParams;

use crate::config::{BoundaryConfig, Config};
use crate::error::Result;
use crate::fields::Fields;
use crate::grid::Grid;

/// Outcome of one timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Steps completed so far, including this one.
    pub step: u64,
    /// Simulated time after this step.
    pub time: f64,
    /// Timestep that was just taken.
    pub dt: f64,
    pub sor_iterations: usize,
    pub residual: f64,
}

/// A runnable case: grid, field store, boundary appliers and the clock.
pub struct Case {
    name: String,
    grid: Grid,
    fields: Fields,
    boundaries: Vec<Boundary>,
    params: SolverParams,
    time: f64,
    step: u64,
}

impl Case {
    /// Validate `cfg`, build the geometry and grid, and set up all boundaries.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        let codes = &cfg.boundary.codes;
        let map = cfg.domain.geometry.build(cfg.domain.imax, cfg.domain.jmax, codes)?;
        let grid = Grid::new(cfg.domain.extent(), &map, codes)?;
        let boundaries = boundaries_for(&grid, &cfg.boundary);
        Case::new(cfg.name.clone(), grid, SolverParams::from_config(cfg), boundaries)
    }

    pub fn new(
        name: impl Into<String>,
        grid: Grid,
        params: SolverParams,
        boundaries: Vec<Boundary>,
    ) -> Result<Self> {
        let mut fields = Fields::new(&grid, &params);
        if params.adaptive_dt() {
            if params.energy_eq {
                fields.calculate_dt_e(&grid)?;
            } else {
                fields.calculate_dt(&grid)?;
            }
        }
        Ok(Self { name: name.into(), grid, fields, boundaries, params, time: 0.0, step: 0 })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Advance by one timestep.
    pub fn step(&mut self) -> Result<StepReport> {
        let energy = self.params.energy_eq;
        let dt = self.fields.dt();

        self.apply_boundaries(energy)?;
        self.fields.calculate_fluxes(&self.grid, energy);
        self.fields.calculate_rs(&self.grid);
        let (sor_iterations, residual) = self.solve_pressure();
        self.fields.calculate_velocities(&self.grid);

        if energy {
            self.apply_boundaries(true)?;
            self.fields.calculate_temperatures(&self.grid);
        }

        self.time += dt;
        self.step += 1;

        if !self.params.adaptive_dt() {
            // Still catch a blow-up even without timestep control.
            self.fields.max_velocities(&self.grid)?;
        } else if energy {
            self.fields.calculate_dt_e(&self.grid)?;
        } else {
            self.fields.calculate_dt(&self.grid)?;
        }

        Ok(StepReport { step: self.step, time: self.time, dt, sor_iterations, residual })
    }

    fn apply_boundaries(&mut self, with_temperature: bool) -> Result<()> {
        for boundary in &self.boundaries {
            boundary.apply(&self.grid, &mut self.fields)?;
            if with_temperature {
                boundary.apply_temperature(&self.grid, &mut self.fields);
            }
        }
        Ok(())
    }

    /// SOR sweeps until the residual drops to `eps` or `itermax` is reached.
    fn solve_pressure(&mut self) -> (usize, f64) {
        let SolverParams { omega, eps, itermax, .. } = self.params;
        let mut iterations = 0;
        let mut residual = f64::INFINITY;
        while iterations < itermax {
            core::sor_sweep(&mut self.fields.p, &self.fields.rs, &self.grid, omega);
            for boundary in &self.boundaries {
                boundary.apply_pressure(&self.grid, self.fields.p_matrix_mut());
            }
            residual = core::residual(&self.fields.p, &self.fields.rs, &self.grid);
            iterations += 1;
            if residual <= eps {
                break;
            }
        }
        if residual > eps {
            log::warn!(
                "step {}: SOR did not converge in {} iterations (residual {:.3e} > {:.1e})",
                self.step + 1,
                iterations,
                residual,
                eps
            );
        }
        (iterations, residual)
    }
}

/// One applier per cell category present in the grid, in application order.
fn boundaries_for(grid: &Grid, cfg: &BoundaryConfig) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    if grid.fixed_wall_cells().next().is_some() {
        boundaries.push(Boundary::fixed_wall(grid, cfg.wall_temperatures.clone()));
    }
    if grid.moving_wall_cells().next().is_some() {
        let velocity = BTreeMap::from([(cfg.codes.moving_wall, cfg.wall_velocity)]);
        boundaries.push(Boundary::moving_wall(grid, velocity));
    }
    if grid.inflow_cells().next().is_some() {
        boundaries.push(Boundary::inflow(grid, cfg.inflow_u, cfg.inflow_v));
    }
    if grid.outflow_cells().next().is_some() {
        boundaries.push(Boundary::outflow(grid));
    }
    boundaries
}
