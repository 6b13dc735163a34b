// Geometry id maps: built-in case layouts and the ASCII PGM reader.

use std::fs;
use std::path::Path;

use super::CellCodes;
use crate::error::{Result, SolverError};

/// Cell ids over the padded index range `[0, width) x [0, height)`, `j = 0` at the bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryMap {
    width: usize,
    height: usize,
    ids: Vec<u32>,
}

impl GeometryMap {
    pub fn filled(width: usize, height: usize, id: u32) -> Self {
        Self { width, height, ids: vec![id; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.ids[j * self.width + i]
    }

    pub fn set(&mut self, i: usize, j: usize, id: u32) {
        self.ids[j * self.width + i] = id;
    }

    /// Fluid interior surrounded by a one-cell ring of `wall`.
    fn boxed(imax: usize, jmax: usize, codes: &CellCodes, wall: u32) -> Self {
        let mut map = Self::filled(imax + 2, jmax + 2, codes.fluid);
        for i in 0..imax + 2 {
            map.set(i, 0, wall);
            map.set(i, jmax + 1, wall);
        }
        for j in 0..jmax + 2 {
            map.set(0, j, wall);
            map.set(imax + 1, j, wall);
        }
        map
    }
}

/// Closed box whose whole top row is the moving lid.
pub fn lid_driven_cavity(imax: usize, jmax: usize, codes: &CellCodes) -> GeometryMap {
    let mut map = GeometryMap::boxed(imax, jmax, codes, codes.fixed_wall);
    for i in 0..imax + 2 {
        map.set(i, jmax + 1, codes.moving_wall);
    }
    map
}

/// Differentially heated box: hot left wall, cold right wall, adiabatic top and bottom.
pub fn heated_cavity(imax: usize, jmax: usize, codes: &CellCodes) -> GeometryMap {
    let mut map = GeometryMap::boxed(imax, jmax, codes, codes.adiabatic_wall);
    for j in 1..=jmax {
        map.set(0, j, codes.hot_wall);
        map.set(imax + 1, j, codes.cold_wall);
    }
    map
}

/// Plane channel: inflow on the left, outflow on the right, no-slip top and bottom.
pub fn channel(imax: usize, jmax: usize, codes: &CellCodes) -> GeometryMap {
    let mut map = GeometryMap::boxed(imax, jmax, codes, codes.fixed_wall);
    for j in 1..=jmax {
        map.set(0, j, codes.inflow);
        map.set(imax + 1, j, codes.outflow);
    }
    map
}

/// Backward-facing step: a channel whose lower-left quarter is a solid block.
pub fn backward_step(imax: usize, jmax: usize, codes: &CellCodes) -> GeometryMap {
    let mut map = channel(imax, jmax, codes);
    let step_len = (imax / 4).max(1);
    let step_height = (jmax / 2).max(1);
    for j in 1..=step_height {
        map.set(0, j, codes.fixed_wall);
        for i in 1..=step_len {
            map.set(i, j, codes.fixed_wall);
        }
    }
    map
}

/// Parse an ASCII (`P2`) PGM image. The first row of the file is the top of the domain.
pub fn parse_pgm(text: &str) -> Result<GeometryMap> {
    let mut tokens = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace);

    match tokens.next() {
        Some("P2") => {}
        Some(other) => {
            return Err(SolverError::Geometry(format!("expected P2 magic, found {:?}", other)));
        }
        None => return Err(SolverError::Geometry("empty file".into())),
    }

    let mut header = [0usize; 3];
    for (slot, name) in header.iter_mut().zip(["width", "height", "maxval"]) {
        let token = tokens
            .next()
            .ok_or_else(|| SolverError::Geometry(format!("missing {}", name)))?;
        *slot = token
            .parse()
            .map_err(|_| SolverError::Geometry(format!("bad {}: {:?}", name, token)))?;
    }
    let [width, height, maxval] = header;
    if width < 3 || height < 3 {
        return Err(SolverError::Geometry(format!(
            "{}x{} leaves no interior cells",
            width, height
        )));
    }

    let mut map = GeometryMap::filled(width, height, 0);
    for row in 0..height {
        let j = height - 1 - row;
        for i in 0..width {
            let token = tokens.next().ok_or_else(|| {
                SolverError::Geometry(format!("expected {} values, file ends early", width * height))
            })?;
            let id: u32 = token
                .parse()
                .map_err(|_| SolverError::Geometry(format!("bad cell value {:?}", token)))?;
            if id as usize > maxval {
                return Err(SolverError::Geometry(format!(
                    "cell value {} exceeds maxval {}",
                    id, maxval
                )));
            }
            map.set(i, j, id);
        }
    }
    if tokens.next().is_some() {
        return Err(SolverError::Geometry("trailing data after pixel values".into()));
    }
    Ok(map)
}

pub fn load_pgm(path: impl AsRef<Path>) -> Result<GeometryMap> {
    let text = fs::read_to_string(path)?;
    parse_pgm(&text)
}
