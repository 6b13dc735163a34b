use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Result, SolverError};
use crate::grid::{geometry, CellCodes, Domain, GeometryMap};

/// File picked up from the working directory when no path is given.
pub const DEFAULT_PATH: &str = "macflow.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Case name, used for output file names.
    pub name: String,
    pub physics: PhysicsConfig,
    pub time: TimeConfig,
    pub solver: SolverConfig,
    pub domain: DomainConfig,
    pub boundary: BoundaryConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub nu: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gx: f64,
    pub gy: f64,
    pub ui: f64,
    pub vi: f64,
    pub pi: f64,
    pub ti: f64,
    pub energy_eq: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub t_end: f64,
    /// Initial timestep; the fixed timestep when `tau <= 0`.
    pub dt: f64,
    pub tau: f64,
    /// Simulated time between output frames; `<= 0` writes only first and last.
    pub output_interval: f64,
    /// Hard cap on the number of steps; 0 means unlimited.
    pub max_steps: u64,
    /// Steps between progress lines.
    pub log_interval: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub omega: f64,
    pub eps: f64,
    pub itermax: usize,
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub imax: usize,
    pub jmax: usize,
    pub xlength: f64,
    pub ylength: f64,
    pub geometry: GeometrySource,
}

/// Where the cell id map comes from.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometrySource {
    #[default]
    Cavity,
    HeatedCavity,
    Channel,
    Step,
    /// ASCII PGM file, first row at the top.
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Tangential velocity of walls tagged `codes.moving_wall`.
    pub wall_velocity: f64,
    pub inflow_u: f64,
    pub inflow_v: f64,
    /// Dirichlet temperature per wall id; other walls are adiabatic.
    pub wall_temperatures: BTreeMap<u32, f64>,
    pub codes: CellCodes,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

/// Built-in cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Cavity,
    HeatedCavity,
    Channel,
    Step,
}

impl CaseKind {
    pub const ALL: [CaseKind; 4] = [CaseKind::Cavity, CaseKind::HeatedCavity, CaseKind::Channel, CaseKind::Step];

    pub fn name(self) -> &'static str {
        match self {
            CaseKind::Cavity => "cavity",
            CaseKind::HeatedCavity => "heated_cavity",
            CaseKind::Channel => "channel",
            CaseKind::Step => "step",
        }
    }
}

impl FromStr for CaseKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        CaseKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = CaseKind::ALL.iter().map(|k| k.name()).collect();
                SolverError::InvalidConfig(format!("unknown case {:?} (known: {})", s, known.join(", ")))
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::preset(CaseKind::Cavity)
    }
}

impl Default for PhysicsConfig {
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
        }
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            t_end: 10.0,
            dt: 0.05,
            tau: 0.5,
            output_interval: 0.5,
            max_steps: 0,
            log_interval: 100,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { omega: 1.7, eps: 1e-3, itermax: 500, gamma: 0.5 }
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            imax: 50,
            jmax: 50,
            xlength: 1.0,
            ylength: 1.0,
            geometry: GeometrySource::Cavity,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        let codes = CellCodes::default();
        Self {
            wall_velocity: 1.0,
            inflow_u: 1.0,
            inflow_v: 0.0,
            wall_temperatures: BTreeMap::from([(codes.hot_wall, 1.0), (codes.cold_wall, 0.0)]),
            codes,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { enabled: true, dir: PathBuf::from("output") }
    }
}

impl Config {
    /// Ready-to-run parameters for a built-in case.
    pub fn preset(kind: CaseKind) -> Self {
        let base = Self {
            name: kind.name().to_string(),
            physics: PhysicsConfig::default(),
            time: TimeConfig::default(),
            solver: SolverConfig::default(),
            domain: DomainConfig::default(),
            boundary: BoundaryConfig::default(),
            output: OutputConfig::default(),
        };
        match kind {
            CaseKind::Cavity => Self { name: "lid_driven_cavity".into(), ..base },
            // Prandtl number about 7, hot left wall and cold right wall.
            CaseKind::HeatedCavity => Self {
                physics: PhysicsConfig {
                    nu: 0.001,
                    alpha: 0.000142,
                    beta: 0.00021,
                    gy: -9.81,
                    energy_eq: true,
                    ..PhysicsConfig::default()
                },
                time: TimeConfig { t_end: 100.0, output_interval: 5.0, ..TimeConfig::default() },
                solver: SolverConfig { itermax: 1000, ..SolverConfig::default() },
                domain: DomainConfig { geometry: GeometrySource::HeatedCavity, ..DomainConfig::default() },
                ..base
            },
            CaseKind::Channel => Self {
                time: TimeConfig { t_end: 20.0, output_interval: 1.0, ..TimeConfig::default() },
                domain: DomainConfig {
                    imax: 100,
                    jmax: 20,
                    xlength: 10.0,
                    ylength: 2.0,
                    geometry: GeometrySource::Channel,
                },
                ..base
            },
            CaseKind::Step => Self {
                time: TimeConfig { t_end: 40.0, output_interval: 1.0, ..TimeConfig::default() },
                domain: DomainConfig {
                    imax: 100,
                    jmax: 20,
                    xlength: 10.0,
                    ylength: 2.0,
                    geometry: GeometrySource::Step,
                },
                ..base
            },
        }
    }

    /// Reject parameter combinations the solver cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SolverError::InvalidConfig(msg));
        let d = &self.domain;
        if d.imax == 0 || d.jmax == 0 {
            return invalid(format!("domain must have cells, got {}x{}", d.imax, d.jmax));
        }
        if !(d.xlength > 0.0 && d.ylength > 0.0) {
            return invalid(format!("domain lengths must be positive, got {} x {}", d.xlength, d.ylength));
        }
        if !(self.physics.nu > 0.0) {
            return invalid(format!("nu must be positive, got {}", self.physics.nu));
        }
        if self.physics.energy_eq && !(self.physics.alpha > 0.0) {
            return invalid(format!("alpha must be positive with the energy equation, got {}", self.physics.alpha));
        }
        let s = &self.solver;
        if !(s.omega > 0.0 && s.omega < 2.0) {
            return invalid(format!("omega must lie in (0, 2), got {}", s.omega));
        }
        if !(s.eps > 0.0) {
            return invalid(format!("eps must be positive, got {}", s.eps));
        }
        if s.itermax == 0 {
            return invalid("itermax must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&s.gamma) {
            return invalid(format!("gamma must lie in [0, 1], got {}", s.gamma));
        }
        if !(self.time.t_end > 0.0) {
            return invalid(format!("t_end must be positive, got {}", self.time.t_end));
        }
        if !(self.time.dt > 0.0) {
            return invalid(format!("dt must be positive, got {}", self.time.dt));
        }

        let codes = self.boundary.codes.all();
        for (n, a) in codes.iter().enumerate() {
            if codes[n + 1..].contains(a) {
                return invalid(format!("cell code {} is used for two categories", a));
            }
        }
        if self.physics.energy_eq {
            let c = &self.boundary.codes;
            for (role, id) in [("hot", c.hot_wall), ("cold", c.cold_wall)] {
                if !self.boundary.wall_temperatures.contains_key(&id) {
                    return invalid(format!("{} wall id {} has no entry in wall_temperatures", role, id));
                }
            }
        }
        Ok(())
    }
}

impl DomainConfig {
    pub fn extent(&self) -> Domain {
        Domain { imax: self.imax, jmax: self.jmax, xlength: self.xlength, ylength: self.ylength }
    }
}

impl GeometrySource {
    pub fn build(&self, imax: usize, jmax: usize, codes: &CellCodes) -> Result<GeometryMap> {
        Ok(match self {
            GeometrySource::Cavity => geometry::lid_driven_cavity(imax, jmax, codes),
            GeometrySource::HeatedCavity => geometry::heated_cavity(imax, jmax, codes),
            GeometrySource::Channel => geometry::channel(imax, jmax, codes),
            GeometrySource::Step => geometry::backward_step(imax, jmax, codes),
            GeometrySource::File { path } => geometry::load_pgm(path)?,
        })
    }
}

/// Parse a YAML document; missing keys take the cavity defaults.
pub fn parse(yaml: &str) -> Result<Config> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Read and parse a config file.
pub fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    parse(&contents)
}

/// Load `macflow.yaml` from the working directory, falling back to `fallback`
/// when the file is absent or unreadable.
pub fn load_or(fallback: Config) -> Config {
    let path = Path::new(DEFAULT_PATH);
    if !path.exists() {
        return fallback;
    }
    match load_from(path) {
        Ok(cfg) => {
            log::info!("loaded {}", DEFAULT_PATH);
            cfg
        }
        Err(e) => {
            log::warn!("failed to load {}: {}; using the {} preset", DEFAULT_PATH, e, fallback.name);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.name, "lid_driven_cavity");
        assert_eq!(cfg.physics.nu, 0.01);
        assert!(!cfg.physics.energy_eq);
        assert_eq!(cfg.time.t_end, 10.0);
        assert_eq!(cfg.time.tau, 0.5);
        assert_eq!(cfg.solver.omega, 1.7);
        assert_eq!(cfg.solver.itermax, 500);
        assert_eq!(cfg.solver.gamma, 0.5);
        assert_eq!(cfg.domain.imax, 50);
        assert_eq!(cfg.domain.geometry, GeometrySource::Cavity);
        assert_eq!(cfg.boundary.wall_velocity, 1.0);
        assert_eq!(cfg.boundary.codes.moving_wall, 8);
        assert_eq!(cfg.boundary.wall_temperatures.get(&4), Some(&1.0));
        assert!(cfg.output.enabled);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "physics:\n  nu: 0.002\ndomain:\n  imax: 64\n";
        let cfg = parse(yaml).unwrap();
        assert_eq!(cfg.physics.nu, 0.002);
        assert_eq!(cfg.physics.alpha, 0.01); // default
        assert_eq!(cfg.domain.imax, 64);
        assert_eq!(cfg.domain.jmax, 50); // default
        assert_eq!(cfg.solver.omega, 1.7); // default
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
name: hot_box
physics:
  nu: 0.001
  alpha: 0.0002
  beta: 0.0003
  gx: 0.0
  gy: -9.81
  ui: 0.0
  vi: 0.0
  pi: 0.0
  ti: 0.5
  energy_eq: true
time:
  t_end: 50.0
  dt: 0.01
  tau: 0.0
  output_interval: 2.5
  max_steps: 1000
  log_interval: 10
solver:
  omega: 1.5
  eps: 0.0001
  itermax: 200
  gamma: 0.9
domain:
  imax: 30
  jmax: 40
  xlength: 1.5
  ylength: 2.0
  geometry:
    kind: file
    path: shapes/box.pgm
boundary:
  wall_velocity: 0.0
  inflow_u: 0.5
  inflow_v: 0.1
  wall_temperatures:
    4: 2.0
    5: -1.0
  codes:
    moving_wall: 9
output:
  enabled: false
  dir: runs/hot_box
"#;
        let cfg = parse(yaml).unwrap();
        assert_eq!(cfg.name, "hot_box");
        assert_eq!(cfg.physics.gy, -9.81);
        assert_eq!(cfg.physics.ti, 0.5);
        assert!(cfg.physics.energy_eq);
        assert_eq!(cfg.time.tau, 0.0);
        assert_eq!(cfg.time.max_steps, 1000);
        assert_eq!(cfg.time.log_interval, 10);
        assert_eq!(cfg.solver.itermax, 200);
        assert_eq!(cfg.solver.gamma, 0.9);
        assert_eq!(cfg.domain.jmax, 40);
        assert_eq!(cfg.domain.geometry, GeometrySource::File { path: PathBuf::from("shapes/box.pgm") });
        assert_eq!(cfg.boundary.inflow_v, 0.1);
        assert_eq!(cfg.boundary.wall_temperatures.get(&5), Some(&-1.0));
        assert_eq!(cfg.boundary.codes.moving_wall, 9);
        assert_eq!(cfg.boundary.codes.hot_wall, 4); // default
        assert!(!cfg.output.enabled);
        assert_eq!(cfg.output.dir, PathBuf::from("runs/hot_box"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_geometry_kinds() {
        let cfg = parse("domain:\n  geometry:\n    kind: heated_cavity\n").unwrap();
        assert_eq!(cfg.domain.geometry, GeometrySource::HeatedCavity);
        assert!(parse("domain:\n  geometry:\n    kind: sphere\n").is_err());
    }

    #[test]
    fn test_presets_validate_and_build() {
        for kind in CaseKind::ALL {
            let cfg = Config::preset(kind);
            cfg.validate().unwrap();
            let map = cfg.domain.geometry.build(cfg.domain.imax, cfg.domain.jmax, &cfg.boundary.codes).unwrap();
            assert_eq!(map.width(), cfg.domain.imax + 2, "{}", kind.name());
        }
        assert!(Config::preset(CaseKind::HeatedCavity).physics.energy_eq);
    }

    #[test]
    fn test_case_names_parse() {
        assert_eq!("heated_cavity".parse::<CaseKind>().unwrap(), CaseKind::HeatedCavity);
        assert_eq!("step".parse::<CaseKind>().unwrap(), CaseKind::Step);
        assert!(matches!("karman".parse::<CaseKind>(), Err(SolverError::InvalidConfig(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let check = |edit: fn(&mut Config)| {
            let mut cfg = Config::default();
            edit(&mut cfg);
            assert!(matches!(cfg.validate(), Err(SolverError::InvalidConfig(_))), "{:?}", cfg);
        };
        check(|c| c.physics.nu = 0.0);
        check(|c| c.solver.omega = 2.0);
        check(|c| c.solver.omega = 0.0);
        check(|c| c.solver.gamma = 1.5);
        check(|c| c.solver.eps = 0.0);
        check(|c| c.solver.itermax = 0);
        check(|c| c.domain.imax = 0);
        check(|c| c.domain.ylength = -1.0);
        check(|c| c.time.t_end = 0.0);
        check(|c| c.time.dt = f64::NAN);
        check(|c| c.boundary.codes.moving_wall = 3);
        check(|c| {
            c.physics.energy_eq = true;
            c.physics.alpha = 0.0;
        });
        check(|c| {
            c.physics.energy_eq = true;
            c.boundary.wall_temperatures.clear();
        });
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.yaml");
        std::fs::write(&path, "time:\n  t_end: 3.0\n").unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.time.t_end, 3.0);
        assert!(matches!(load_from(dir.path().join("nope.yaml")), Err(SolverError::Io(_))));
        std::fs::write(&path, "time: [1, 2").unwrap();
        assert!(matches!(load_from(&path), Err(SolverError::Yaml(_))));
    }

    #[test]
    fn test_load_missing_default_file() {
        // No macflow.yaml in the test working directory: the fallback is used.
        let cfg = load_or(Config::preset(CaseKind::Channel));
        assert_eq!(cfg.domain.geometry, GeometrySource::Channel);
    }

    #[test]
    fn test_shipped_configs() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs");
        let hot = load_from(dir.join("heated_cavity.yaml")).unwrap();
        hot.validate().unwrap();
        assert!(hot.physics.energy_eq);
        assert_eq!(hot.domain.geometry, GeometrySource::HeatedCavity);
        assert_eq!(hot.boundary.wall_temperatures.get(&5), Some(&0.0));

        let step = load_from(dir.join("step.yaml")).unwrap();
        step.validate().unwrap();
        assert_eq!(step.name, "backward_step");
        assert_eq!(step.domain.geometry, GeometrySource::Step);
        assert_eq!(step.output.dir, PathBuf::from("output/step"));
    }
}
