use crate::fields::Fields;
use crate::grid::Grid;

/// Velocity interpolated to the centre of cell (i, j).
pub fn cell_velocity(fields: &Fields, i: usize, j: usize) -> (f64, f64) {
    (
        0.5 * (fields.u[(i, j)] + fields.u[(i - 1, j)]),
        0.5 * (fields.v[(i, j)] + fields.v[(i, j - 1)]),
    )
}

/// Discrete divergence of the staggered velocity in fluid cell (i, j).
pub fn divergence(fields: &Fields, grid: &Grid, i: usize, j: usize) -> f64 {
    (fields.u[(i, j)] - fields.u[(i - 1, j)]) / grid.dx()
        + (fields.v[(i, j)] - fields.v[(i, j - 1)]) / grid.dy()
}

/// Largest |div u| over fluid cells.
pub fn max_divergence(fields: &Fields, grid: &Grid) -> f64 {
    grid.fluid_cells()
        .map(|c| divergence(fields, grid, c.i(), c.j()).abs())
        .fold(0.0, f64::max)
}

/// Fluid-averaged kinetic energy: KE = 0.5 * <u² + v²> at cell centres.
pub fn kinetic_energy(fields: &Fields, grid: &Grid) -> f64 {
    let n = grid.fluid_count();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = grid
        .fluid_cells()
        .map(|c| {
            let (u, v) = cell_velocity(fields, c.i(), c.j());
            u * u + v * v
        })
        .sum();
    0.5 * sum / n as f64
}

/// Largest cell-centred speed.
pub fn max_speed(fields: &Fields, grid: &Grid) -> f64 {
    grid.fluid_cells()
        .map(|c| {
            let (u, v) = cell_velocity(fields, c.i(), c.j());
            u.hypot(v)
        })
        .fold(0.0, f64::max)
}

/// Fluid-averaged temperature.
pub fn mean_temperature(fields: &Fields, grid: &Grid) -> f64 {
    let n = grid.fluid_count();
    if n == 0 {
        return 0.0;
    }
    grid.fluid_cells().map(|c| fields.t[(c.i(), c.j())]).sum::<f64>() / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{geometry, CellCodes, Domain};
    use crate::solver::SolverParams;

    fn cavity(n: usize) -> Grid {
        let codes = CellCodes::default();
        let map = geometry::lid_driven_cavity(n, n, &codes);
        Grid::new(Domain { imax: n, jmax: n, xlength: 1.0, ylength: 1.0 }, &map, &codes).unwrap()
    }

    #[test]
    fn test_fluid_at_rest() {
        let grid = cavity(4);
        let fields = Fields::new(&grid, &SolverParams::default());
        assert_eq!(kinetic_energy(&fields, &grid), 0.0);
        assert_eq!(max_divergence(&fields, &grid), 0.0);
        assert_eq!(max_speed(&fields, &grid), 0.0);
    }

    #[test]
    fn test_uniform_translation_is_divergence_free() {
        let grid = cavity(4);
        let params = SolverParams { ui: 2.0, ..SolverParams::default() };
        let mut fields = Fields::new(&grid, &params);
        fields.u.fill(2.0);
        assert!(max_divergence(&fields, &grid) < 1e-14);
        assert!((kinetic_energy(&fields, &grid) - 2.0).abs() < 1e-14);
        assert!((max_speed(&fields, &grid) - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_single_face_source() {
        let grid = cavity(4);
        let mut fields = Fields::new(&grid, &SolverParams::default());
        fields.u[(2, 2)] = 1.0;
        // Outflow from (2,2), inflow to (3,2).
        assert!((divergence(&fields, &grid, 2, 2) - 4.0).abs() < 1e-12);
        assert!((divergence(&fields, &grid, 3, 2) + 4.0).abs() < 1e-12);
        assert!((max_divergence(&fields, &grid) - 4.0).abs() < 1e-12);
        assert_eq!(cell_velocity(&fields, 2, 2), (0.5, 0.0));
    }

    #[test]
    fn test_mean_temperature_over_fluid() {
        let grid = cavity(2);
        let params = SolverParams { ti: 0.25, ..SolverParams::default() };
        let mut fields = Fields::new(&grid, &params);
        fields.t[(0, 1)] = 100.0;
        assert!((mean_temperature(&fields, &grid) - 0.25).abs() < 1e-15);
    }
}
