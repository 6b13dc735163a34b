use std::collections::BTreeMap;

use crate::error::{Result, SolverError};
use crate::fields::{Fields, Matrix};
use crate::grid::{BorderPosition, Cell, CellType, Grid};

use BorderPosition::{Bottom, Left, Right, Top};

/// Boundary applier for one category of non-fluid cells.
/// Each variant owns copies of the cells it governs plus its constants.
#[derive(Debug, Clone)]
pub enum Boundary {
    /// No-slip, no-penetration wall. `wall_temperature` maps wall ids to a
    /// Dirichlet temperature; walls without an entry are adiabatic.
    FixedWall { cells: Vec<Cell>, wall_temperature: BTreeMap<u32, f64> },
    /// Wall sliding tangentially with the velocity mapped to its wall id.
    MovingWall { cells: Vec<Cell>, wall_velocity: BTreeMap<u32, f64> },
    /// Prescribed inflow velocity.
    Inflow { cells: Vec<Cell>, u: f64, v: f64 },
    /// Zero-gradient velocity, zero pressure.
    Outflow { cells: Vec<Cell> },
}

impl Boundary {
    pub fn fixed_wall(grid: &Grid, wall_temperature: BTreeMap<u32, f64>) -> Self {
        Boundary::FixedWall { cells: grid.fixed_wall_cells().copied().collect(), wall_temperature }
    }

    pub fn moving_wall(grid: &Grid, wall_velocity: BTreeMap<u32, f64>) -> Self {
        Boundary::MovingWall { cells: grid.moving_wall_cells().copied().collect(), wall_velocity }
    }

    pub fn inflow(grid: &Grid, u: f64, v: f64) -> Self {
        Boundary::Inflow { cells: grid.inflow_cells().copied().collect(), u, v }
    }

    pub fn outflow(grid: &Grid) -> Self {
        Boundary::Outflow { cells: grid.outflow_cells().copied().collect() }
    }

    pub fn kind(&self) -> CellType {
        match self {
            Boundary::FixedWall { .. } => CellType::FixedWall,
            Boundary::MovingWall { .. } => CellType::MovingWall,
            Boundary::Inflow { .. } => CellType::Inflow,
            Boundary::Outflow { .. } => CellType::Outflow,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        match self {
            Boundary::FixedWall { cells, .. }
            | Boundary::MovingWall { cells, .. }
            | Boundary::Inflow { cells, .. }
            | Boundary::Outflow { cells } => cells,
        }
    }

    /// Write velocity and pressure ghost values.
    ///
    /// Fixed walls are validated up front: a cell bordering more than two
    /// fluid cells aborts the pass before anything is written.
    pub fn apply(&self, grid: &Grid, fields: &mut Fields) -> Result<()> {
        match self {
            Boundary::FixedWall { cells, .. } => {
                if let Some(cell) = cells.iter().find(|c| c.border_count() > 2) {
                    return Err(SolverError::MalformedBoundary {
                        i: cell.i(),
                        j: cell.j(),
                        count: cell.border_count(),
                    });
                }
                for cell in cells {
                    fixed_wall_velocity(&mut fields.u, &mut fields.v, grid, cell);
                }
            }
            Boundary::MovingWall { cells, wall_velocity } => {
                for cell in cells.iter().filter(|c| c.is_border(Bottom)) {
                    let ij = (cell.i(), cell.j());
                    let below = grid.neighbour_ij(cell, Bottom);
                    let uw = wall_velocity.get(&cell.wall_id()).copied().unwrap_or(0.0);
                    fields.u[ij] = 2.0 * uw - fields.u[below];
                    fields.v[below] = 0.0;
                }
            }
            Boundary::Inflow { cells, u, v } => {
                for cell in cells.iter().filter(|c| c.is_border(Right)) {
                    let ij = (cell.i(), cell.j());
                    fields.u[ij] = *u;
                    fields.v[ij] = 2.0 * v - fields.v[grid.neighbour_ij(cell, Right)];
                }
            }
            Boundary::Outflow { cells } => {
                for cell in cells.iter().filter(|c| c.is_border(Left)) {
                    let ij = (cell.i(), cell.j());
                    let inner = grid.neighbour_ij(cell, Left);
                    fields.u[ij] = fields.u[inner];
                    fields.v[ij] = fields.v[inner];
                }
            }
        }
        self.apply_pressure(grid, fields.p_matrix_mut());
        Ok(())
    }

    /// Pressure ghosts only; called between SOR sweeps.
    pub fn apply_pressure(&self, grid: &Grid, p: &mut Matrix) {
        match self {
            Boundary::FixedWall { cells, .. } => {
                for cell in cells.iter().filter(|c| c.border_count() > 0) {
                    p[(cell.i(), cell.j())] = mean_over_borders(p, grid, cell);
                }
            }
            Boundary::MovingWall { cells, .. } => {
                for cell in cells.iter().filter(|c| c.is_border(Bottom)) {
                    p[(cell.i(), cell.j())] = p[grid.neighbour_ij(cell, Bottom)];
                }
            }
            Boundary::Inflow { cells, .. } => {
                for cell in cells.iter().filter(|c| c.is_border(Right)) {
                    p[(cell.i(), cell.j())] = p[grid.neighbour_ij(cell, Right)];
                }
            }
            Boundary::Outflow { cells } => {
                for cell in cells.iter().filter(|c| c.is_border(Left)) {
                    p[(cell.i(), cell.j())] = 0.0;
                }
            }
        }
    }

    /// Temperature ghosts. Only fixed walls carry a thermal condition.
    pub fn apply_temperature(&self, grid: &Grid, fields: &mut Fields) {
        let Boundary::FixedWall { cells, wall_temperature } = self else {
            return;
        };
        let t = &mut fields.t;
        for cell in cells {
            let dirichlet = wall_temperature.get(&cell.wall_id()).copied();
            for pos in BorderPosition::ALL {
                if !cell.is_border(pos) {
                    continue;
                }
                let interior = t[grid.neighbour_ij(cell, pos)];
                t[(cell.i(), cell.j())] = match dirichlet {
                    Some(tw) => 2.0 * tw - interior,
                    None => interior,
                };
            }
        }
    }
}

/// Flux boundary condition: on every fluid-facing side of each cell the
/// momentum flux equals the normal velocity on that face.
pub fn apply_flux<'a>(fields: &mut Fields, grid: &Grid, cells: impl IntoIterator<Item = &'a Cell>) {
    for cell in cells {
        let ij = (cell.i(), cell.j());
        if cell.is_border(Top) {
            fields.g[ij] = fields.v[ij];
        }
        if cell.is_border(Bottom) {
            let below = grid.neighbour_ij(cell, Bottom);
            fields.g[below] = fields.v[below];
        }
        if cell.is_border(Right) {
            fields.f[ij] = fields.u[ij];
        }
        if cell.is_border(Left) {
            let left = grid.neighbour_ij(cell, Left);
            fields.f[left] = fields.u[left];
        }
    }
}

/// No-slip ghosts for a fixed-wall cell with at most two borders.
/// Normal velocity on each wetted face is zero; tangential ghosts mirror the
/// fluid value so the wall velocity interpolates to zero.
///
/// `u[l]` and `v[b]` are the cell's own left and bottom faces. Diagonal
/// entries are formed from the column of one neighbour and the row of another.
fn fixed_wall_velocity(u: &mut Matrix, v: &mut Matrix, grid: &Grid, cell: &Cell) {
    let c = (cell.i(), cell.j());
    let [t, b, l, r] = BorderPosition::ALL.map(|pos| grid.neighbour_ij(cell, pos));
    let sides = (
        cell.is_border(Top),
        cell.is_border(Bottom),
        cell.is_border(Left),
        cell.is_border(Right),
    );
    match sides {
        // (top, bottom, left, right)
        (true, false, false, false) => {
            v[c] = 0.0;
            u[c] = -u[t];
        }
        (false, true, false, false) => {
            v[b] = 0.0;
            u[c] = -u[b];
        }
        (false, false, false, true) => {
            u[c] = 0.0;
            v[c] = -v[r];
        }
        (false, false, true, false) => {
            u[l] = 0.0;
            v[c] = -v[l];
        }
        (true, false, false, true) => {
            u[c] = 0.0;
            v[c] = 0.0;
            u[l] = -u[(l.0, t.1)];
            v[b] = -v[(r.0, b.1)];
        }
        (true, false, true, false) => {
            u[l] = 0.0;
            v[c] = 0.0;
            u[c] = -u[t];
            v[b] = -v[(l.0, b.1)];
        }
        (false, true, false, true) => {
            u[c] = 0.0;
            v[b] = 0.0;
            u[l] = -u[(l.0, b.1)];
            v[c] = -v[r];
        }
        (false, true, true, false) => {
            u[l] = 0.0;
            v[b] = 0.0;
            u[c] = -u[b];
            v[c] = -v[l];
        }
        (true, true, false, false) => {
            v[c] = 0.0;
            v[b] = 0.0;
            u[c] = -0.5 * (u[t] + u[b]);
        }
        (false, false, true, true) => {
            u[c] = 0.0;
            u[l] = 0.0;
            v[c] = -0.5 * (v[r] + v[l]);
        }
        // No fluid neighbour.
        _ => {}
    }
}

/// Average of `p` over the fluid cells this cell borders.
fn mean_over_borders(p: &Matrix, grid: &Grid, cell: &Cell) -> f64 {
    let mut sum = 0.0;
    let mut count = 0;
    for pos in BorderPosition::ALL {
        if cell.is_border(pos) {
            sum += p[grid.neighbour_ij(cell, pos)];
            count += 1;
        }
    }
    sum / count as f64
}
