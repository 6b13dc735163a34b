use crate::config::Config;

/// Numeric parameters consumed by the field store and the integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    /// Kinematic viscosity.
    pub nu: f64,
    /// Thermal diffusivity.
    pub alpha: f64,
    /// Thermal expansion coefficient.
    pub beta: f64,
    pub gx: f64,
    pub gy: f64,
    /// Initial values on fluid cells.
    pub ui: f64,
    pub vi: f64,
    pub pi: f64,
    pub ti: f64,
    pub energy_eq: bool,
    /// Initial (or fixed, when `tau <= 0`) timestep.
    pub dt: f64,
    /// Safety factor for the adaptive timestep.
    pub tau: f64,
    /// SOR relaxation factor.
    pub omega: f64,
    /// SOR residual tolerance.
    pub eps: f64,
    pub itermax: usize,
    /// Donor-cell weight.
    pub gamma: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            nu: 0.01,
            alpha: 0.01,
            beta: 0.0,
            gx: 0.0,
            gy: 0.0,
            ui: 0.0,
            vi: 0.0,
            pi: 0.0,
            ti: 0.0,
            energy_eq: false,
            dt: 0.05,
            tau: 0.5,
            omega: 1.7,
            eps: 1e-3,
            itermax: 500,
            gamma: 0.5,
        }
    }
}

impl SolverParams {
    pub fn from_config(cfg: &Config) -> Self {
        let ph = &cfg.physics;
        Self {
            nu: ph.nu,
            alpha: ph.alpha,
            beta: ph.beta,
            gx: ph.gx,
            gy: ph.gy,
            ui: ph.ui,
            vi: ph.vi,
            pi: ph.pi,
            ti: ph.ti,
            energy_eq: ph.energy_eq,
            dt: cfg.time.dt,
            tau: cfg.time.tau,
            omega: cfg.solver.omega,
            eps: cfg.solver.eps,
            itermax: cfg.solver.itermax,
            gamma: cfg.solver.gamma,
        }
    }

    /// Timestep control is adaptive unless `tau` is non-positive.
    pub fn adaptive_dt(&self) -> bool {
        self.tau > 0.0
    }
}
