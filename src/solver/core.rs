use crate::fields::Matrix;
use crate::grid::Grid;

/// 5-point Laplacian of `a` at (i, j).
#[inline]
pub fn laplacian(a: &Matrix, i: usize, j: usize, dx: f64, dy: f64) -> f64 {
    (a[(i + 1, j)] - 2.0 * a[(i, j)] + a[(i - 1, j)]) / (dx * dx)
        + (a[(i, j + 1)] - 2.0 * a[(i, j)] + a[(i, j - 1)]) / (dy * dy)
}

/// Finite-difference operators on the staggered grid.
///
/// Convective terms blend central differences with donor-cell (upwind)
/// differences: `gamma = 0` is pure central, `gamma = 1` pure donor-cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discretization {
    dx: f64,
    dy: f64,
    gamma: f64,
}

impl Discretization {
    pub fn new(dx: f64, dy: f64, gamma: f64) -> Self {
        Self { dx, dy, gamma }
    }

    pub fn laplacian(&self, a: &Matrix, i: usize, j: usize) -> f64 {
        laplacian(a, i, j, self.dx, self.dy)
    }

    /// d(u^2)/dx + d(uv)/dy at the U location of cell (i, j).
    pub fn convection_u(&self, u: &Matrix, v: &Matrix, i: usize, j: usize) -> f64 {
        let (dx, dy, gamma) = (self.dx, self.dy, self.gamma);

        let u_r = 0.5 * (u[(i, j)] + u[(i + 1, j)]);
        let u_l = 0.5 * (u[(i - 1, j)] + u[(i, j)]);
        let du2dx = (u_r * u_r - u_l * u_l) / dx
            + gamma / dx
                * (u_r.abs() * 0.5 * (u[(i, j)] - u[(i + 1, j)])
                    - u_l.abs() * 0.5 * (u[(i - 1, j)] - u[(i, j)]));

        let v_t = 0.5 * (v[(i, j)] + v[(i + 1, j)]);
        let v_b = 0.5 * (v[(i, j - 1)] + v[(i + 1, j - 1)]);
        let duvdy = (v_t * 0.5 * (u[(i, j)] + u[(i, j + 1)])
            - v_b * 0.5 * (u[(i, j - 1)] + u[(i, j)]))
            / dy
            + gamma / dy
                * (v_t.abs() * 0.5 * (u[(i, j)] - u[(i, j + 1)])
                    - v_b.abs() * 0.5 * (u[(i, j - 1)] - u[(i, j)]));

        du2dx + duvdy
    }

    /// d(uv)/dx + d(v^2)/dy at the V location of cell (i, j).
    pub fn convection_v(&self, u: &Matrix, v: &Matrix, i: usize, j: usize) -> f64 {
        let (dx, dy, gamma) = (self.dx, self.dy, self.gamma);

        let u_r = 0.5 * (u[(i, j)] + u[(i, j + 1)]);
        let u_l = 0.5 * (u[(i - 1, j)] + u[(i - 1, j + 1)]);
        let duvdx = (u_r * 0.5 * (v[(i, j)] + v[(i + 1, j)])
            - u_l * 0.5 * (v[(i - 1, j)] + v[(i, j)]))
            / dx
            + gamma / dx
                * (u_r.abs() * 0.5 * (v[(i, j)] - v[(i + 1, j)])
                    - u_l.abs() * 0.5 * (v[(i - 1, j)] - v[(i, j)]));

        let v_t = 0.5 * (v[(i, j)] + v[(i, j + 1)]);
        let v_b = 0.5 * (v[(i, j - 1)] + v[(i, j)]);
        let dv2dy = (v_t * v_t - v_b * v_b) / dy
            + gamma / dy
                * (v_t.abs() * 0.5 * (v[(i, j)] - v[(i, j + 1)])
                    - v_b.abs() * 0.5 * (v[(i, j - 1)] - v[(i, j)]));

        duvdx + dv2dy
    }

    /// d(uT)/dx + d(vT)/dy at the centre of cell (i, j).
    pub fn convection_t(&self, u: &Matrix, v: &Matrix, t: &Matrix, i: usize, j: usize) -> f64 {
        let (dx, dy, gamma) = (self.dx, self.dy, self.gamma);
        let (ur, ul) = (u[(i, j)], u[(i - 1, j)]);
        let (vt, vb) = (v[(i, j)], v[(i, j - 1)]);

        let dutdx = (ur * 0.5 * (t[(i, j)] + t[(i + 1, j)]) - ul * 0.5 * (t[(i - 1, j)] + t[(i, j)]))
            / dx
            + gamma / dx
                * (ur.abs() * 0.5 * (t[(i, j)] - t[(i + 1, j)])
                    - ul.abs() * 0.5 * (t[(i - 1, j)] - t[(i, j)]));

        let dvtdy = (vt * 0.5 * (t[(i, j)] + t[(i, j + 1)]) - vb * 0.5 * (t[(i, j - 1)] + t[(i, j)]))
            / dy
            + gamma / dy
                * (vt.abs() * 0.5 * (t[(i, j)] - t[(i, j + 1)])
                    - vb.abs() * 0.5 * (t[(i, j - 1)] - t[(i, j)]));

        dutdx + dvtdy
    }
}

/// One SOR sweep over the fluid cells, in cell order.
/// P = (1-w) P + w / (2 (1/dx^2 + 1/dy^2)) * (neighbour sums - RS)
pub fn sor_sweep(p: &mut Matrix, rs: &Matrix, grid: &Grid, omega: f64) {
    let (dx2, dy2) = (grid.dx() * grid.dx(), grid.dy() * grid.dy());
    let coeff = omega / (2.0 * (1.0 / dx2 + 1.0 / dy2));
    for cell in grid.fluid_cells() {
        let (i, j) = (cell.i(), cell.j());
        p[(i, j)] = (1.0 - omega) * p[(i, j)]
            + coeff
                * ((p[(i + 1, j)] + p[(i - 1, j)]) / dx2 + (p[(i, j + 1)] + p[(i, j - 1)]) / dy2
                    - rs[(i, j)]);
    }
}

/// RMS of the pressure-equation residual over the fluid cells.
pub fn residual(p: &Matrix, rs: &Matrix, grid: &Grid) -> f64 {
    let n = grid.fluid_count();
    if n == 0 {
        return 0.0;
    }
    let (dx, dy) = (grid.dx(), grid.dy());
    let sum: f64 = grid
        .fluid_cells()
        .map(|cell| {
            let (i, j) = (cell.i(), cell.j());
            let r = laplacian(p, i, j, dx, dy) - rs[(i, j)];
            r * r
        })
        .sum();
    (sum / n as f64).sqrt()
}
