use crate::fields::Fields;
use crate::grid::Grid;

impl Fields {
    /// Advance temperature by one explicit step:
    /// T' = T + dt * (alpha * Lap(T) - d(uT)/dx - d(vT)/dy) on fluid cells.
    /// Ghost entries of the new array are zero until the walls are reapplied.
    pub fn calculate_temperatures(&mut self, grid: &Grid) {
        let dt = self.dt();
        self.t_next.fill(0.0);
        for cell in grid.fluid_cells() {
            let (i, j) = (cell.i(), cell.j());
            self.t_next[(i, j)] = self.t[(i, j)]
                + dt * (self.alpha * self.disc.laplacian(&self.t, i, j)
                    - self.disc.convection_t(&self.u, &self.v, &self.t, i, j));
        }
        std::mem::swap(&mut self.t, &mut self.t_next);
    }

    /// Boussinesq factors beta * T averaged onto the U and V faces of (i, j).
    /// The momentum fluxes subtract `g * dt` times these.
    pub(crate) fn buoyancy(&self, i: usize, j: usize) -> (f64, f64) {
        let t = &self.t;
        (
            self.beta * 0.5 * (t[(i, j)] + t[(i + 1, j)]),
            self.beta * 0.5 * (t[(i, j)] + t[(i, j + 1)]),
        )
    }
}
