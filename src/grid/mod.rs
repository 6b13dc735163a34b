pub mod geometry;

use serde::Deserialize;

use crate::error::{Result, SolverError};
pub use geometry::GeometryMap;

/// Index of a cell in the grid's cell arena.
pub type CellId = usize;

/// Side of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderPosition {
    Top,
    Bottom,
    Left,
    Right,
}

impl BorderPosition {
    pub const ALL: [BorderPosition; 4] = [
        BorderPosition::Top,
        BorderPosition::Bottom,
        BorderPosition::Left,
        BorderPosition::Right,
    ];

    const fn slot(self) -> usize {
        match self {
            BorderPosition::Top => 0,
            BorderPosition::Bottom => 1,
            BorderPosition::Left => 2,
            BorderPosition::Right => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Fluid,
    FixedWall,
    MovingWall,
    Inflow,
    Outflow,
}

impl CellType {
    pub fn name(self) -> &'static str {
        match self {
            CellType::Fluid => "fluid",
            CellType::FixedWall => "fixed wall",
            CellType::MovingWall => "moving wall",
            CellType::Inflow => "inflow",
            CellType::Outflow => "outflow",
        }
    }
}

/// Thermal role of a fixed wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThermalRole {
    #[default]
    None,
    Cold,
    Hot,
    Adiabatic,
}

/// Geometry ids and the cell categories they map to.
/// Any id not listed here (and not fluid/inflow/outflow) is a plain fixed wall.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CellCodes {
    pub fluid: u32,
    pub inflow: u32,
    pub outflow: u32,
    pub fixed_wall: u32,
    pub hot_wall: u32,
    pub cold_wall: u32,
    pub adiabatic_wall: u32,
    pub moving_wall: u32,
}

impl Default for CellCodes {
    fn default() -> Self {
        Self {
            fluid: 0,
            inflow: 1,
            outflow: 2,
            fixed_wall: 3,
            hot_wall: 4,
            cold_wall: 5,
            adiabatic_wall: 6,
            moving_wall: 8,
        }
    }
}

impl CellCodes {
    pub fn classify(&self, id: u32) -> (CellType, ThermalRole) {
        if id == self.fluid {
            (CellType::Fluid, ThermalRole::None)
        } else if id == self.inflow {
            (CellType::Inflow, ThermalRole::None)
        } else if id == self.outflow {
            (CellType::Outflow, ThermalRole::None)
        } else if id == self.moving_wall {
            (CellType::MovingWall, ThermalRole::None)
        } else if id == self.hot_wall {
            (CellType::FixedWall, ThermalRole::Hot)
        } else if id == self.cold_wall {
            (CellType::FixedWall, ThermalRole::Cold)
        } else if id == self.adiabatic_wall {
            (CellType::FixedWall, ThermalRole::Adiabatic)
        } else {
            (CellType::FixedWall, ThermalRole::None)
        }
    }

    /// Codes that must not collide with each other.
    pub fn all(&self) -> [u32; 8] {
        [
            self.fluid,
            self.inflow,
            self.outflow,
            self.fixed_wall,
            self.hot_wall,
            self.cold_wall,
            self.adiabatic_wall,
            self.moving_wall,
        ]
    }
}

/// A grid cell. Immutable once the grid is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    i: usize,
    j: usize,
    kind: CellType,
    wall_id: u32,
    thermal: ThermalRole,
    borders: [bool; 4],
    neighbours: [Option<CellId>; 4],
}

impl Cell {
    pub fn i(&self) -> usize {
        self.i
    }

    pub fn j(&self) -> usize {
        self.j
    }

    pub fn kind(&self) -> CellType {
        self.kind
    }

    pub fn wall_id(&self) -> u32 {
        self.wall_id
    }

    /// True when the neighbour on `pos` is a fluid cell (only set on non-fluid cells).
    pub fn is_border(&self, pos: BorderPosition) -> bool {
        self.borders[pos.slot()]
    }

    /// Number of fluid-facing borders.
    pub fn border_count(&self) -> usize {
        self.borders.iter().filter(|&&b| b).count()
    }

    /// Arena handle of the same-row/column neighbour on `pos`.
    /// `None` only outward from the domain ring.
    pub fn neighbour(&self, pos: BorderPosition) -> Option<CellId> {
        self.neighbours[pos.slot()]
    }
}

/// Physical extent of the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub imax: usize,
    pub jmax: usize,
    pub xlength: f64,
    pub ylength: f64,
}

/// Structured grid: cell arena plus order-stable cell sets per category.
#[derive(Debug, Clone)]
pub struct Grid {
    imax: usize,
    jmax: usize,
    dx: f64,
    dy: f64,
    cells: Vec<Cell>,
    fluid: Vec<CellId>,
    fixed_wall: Vec<CellId>,
    cold_fixed_wall: Vec<CellId>,
    hot_fixed_wall: Vec<CellId>,
    adiabatic_fixed_wall: Vec<CellId>,
    moving_wall: Vec<CellId>,
    inflow: Vec<CellId>,
    outflow: Vec<CellId>,
}

impl Grid {
    /// Classify every cell of `map` and wire up neighbours and border flags.
    pub fn new(domain: Domain, map: &GeometryMap, codes: &CellCodes) -> Result<Self> {
        let (nx, ny) = (domain.imax + 2, domain.jmax + 2);
        if map.width() != nx || map.height() != ny {
            return Err(SolverError::GeometrySize {
                expected_width: nx,
                expected_height: ny,
                found_width: map.width(),
                found_height: map.height(),
            });
        }

        let mut cells = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let wall_id = map.get(i, j);
                let (kind, thermal) = codes.classify(wall_id);
                let on_ring = i == 0 || j == 0 || i == nx - 1 || j == ny - 1;
                if on_ring && kind == CellType::Fluid {
                    return Err(SolverError::FluidOnDomainBoundary { i, j });
                }
                let mut neighbours = [None; 4];
                if j + 1 < ny {
                    neighbours[BorderPosition::Top.slot()] = Some((j + 1) * nx + i);
                }
                if j > 0 {
                    neighbours[BorderPosition::Bottom.slot()] = Some((j - 1) * nx + i);
                }
                if i > 0 {
                    neighbours[BorderPosition::Left.slot()] = Some(j * nx + i - 1);
                }
                if i + 1 < nx {
                    neighbours[BorderPosition::Right.slot()] = Some(j * nx + i + 1);
                }
                cells.push(Cell {
                    i,
                    j,
                    kind,
                    wall_id,
                    thermal,
                    borders: [false; 4],
                    neighbours,
                });
            }
        }

        // Border flags: a non-fluid cell borders every fluid neighbour.
        for id in 0..cells.len() {
            if cells[id].kind == CellType::Fluid {
                continue;
            }
            let mut borders = [false; 4];
            for pos in BorderPosition::ALL {
                if let Some(n) = cells[id].neighbours[pos.slot()] {
                    borders[pos.slot()] = cells[n].kind == CellType::Fluid;
                }
            }
            cells[id].borders = borders;
        }

        let mut grid = Grid {
            imax: domain.imax,
            jmax: domain.jmax,
            dx: domain.xlength / domain.imax as f64,
            dy: domain.ylength / domain.jmax as f64,
            cells,
            fluid: Vec::new(),
            fixed_wall: Vec::new(),
            cold_fixed_wall: Vec::new(),
            hot_fixed_wall: Vec::new(),
            adiabatic_fixed_wall: Vec::new(),
            moving_wall: Vec::new(),
            inflow: Vec::new(),
            outflow: Vec::new(),
        };

        for (id, cell) in grid.cells.iter().enumerate() {
            match cell.kind {
                CellType::Fluid => grid.fluid.push(id),
                CellType::FixedWall => {
                    grid.fixed_wall.push(id);
                    match cell.thermal {
                        ThermalRole::Cold => grid.cold_fixed_wall.push(id),
                        ThermalRole::Hot => grid.hot_fixed_wall.push(id),
                        ThermalRole::Adiabatic => grid.adiabatic_fixed_wall.push(id),
                        ThermalRole::None => {}
                    }
                }
                CellType::MovingWall => {
                    only_borders(cell, BorderPosition::Bottom)?;
                    grid.moving_wall.push(id);
                }
                CellType::Inflow => {
                    only_borders(cell, BorderPosition::Right)?;
                    grid.inflow.push(id);
                }
                CellType::Outflow => {
                    only_borders(cell, BorderPosition::Left)?;
                    grid.outflow.push(id);
                }
            }
        }

        Ok(grid)
    }

    pub fn imax(&self) -> usize {
        self.imax
    }

    pub fn jmax(&self) -> usize {
        self.jmax
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }

    pub fn cell_at(&self, i: usize, j: usize) -> &Cell {
        &self.cells[j * (self.imax + 2) + i]
    }

    pub fn neighbour(&self, cell: &Cell, pos: BorderPosition) -> Option<&Cell> {
        cell.neighbour(pos).map(|id| self.cell(id))
    }

    /// Coordinates of the neighbour on `pos`, resolved through the arena.
    /// Fluid cells have all four neighbours, and a border flag is only set
    /// towards an existing one; a missing neighbour resolves to `cell` itself.
    #[inline]
    pub fn neighbour_ij(&self, cell: &Cell, pos: BorderPosition) -> (usize, usize) {
        self.neighbour(cell, pos).map_or((cell.i, cell.j), |n| (n.i, n.j))
    }

    pub fn fluid_count(&self) -> usize {
        self.fluid.len()
    }

    pub fn fluid_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.fluid)
    }

    pub fn fixed_wall_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.fixed_wall)
    }

    pub fn cold_fixed_wall_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.cold_fixed_wall)
    }

    pub fn hot_fixed_wall_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.hot_fixed_wall)
    }

    pub fn adiabatic_fixed_wall_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.adiabatic_fixed_wall)
    }

    pub fn moving_wall_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.moving_wall)
    }

    pub fn inflow_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.inflow)
    }

    pub fn outflow_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter_ids(&self.outflow)
    }

    fn iter_ids<'a>(&'a self, ids: &'a [CellId]) -> impl Iterator<Item = &'a Cell> + 'a {
        ids.iter().map(move |&id| &self.cells[id])
    }
}

/// Reject cells that border fluid anywhere except on `allowed`.
fn only_borders(cell: &Cell, allowed: BorderPosition) -> Result<()> {
    let stray = BorderPosition::ALL
        .into_iter()
        .any(|pos| pos != allowed && cell.is_border(pos));
    if stray {
        return Err(SolverError::UnsupportedBorder {
            kind: cell.kind.name(),
            i: cell.i,
            j: cell.j,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cavity(imax: usize, jmax: usize) -> Grid {
        let codes = CellCodes::default();
        let map = geometry::lid_driven_cavity(imax, jmax, &codes);
        let domain = Domain { imax, jmax, xlength: 1.0, ylength: 1.0 };
        Grid::new(domain, &map, &codes).unwrap()
    }

    #[test]
    fn test_cavity_classification() {
        let grid = cavity(4, 4);
        assert_eq!(grid.fluid_count(), 16);
        assert_eq!(grid.moving_wall_cells().count(), 6, "whole top row is lid");
        // Bottom, left and right rings without the two top corners.
        assert_eq!(grid.fixed_wall_cells().count(), 6 + 4 + 4);
        assert_eq!(grid.inflow_cells().count(), 0);
        assert_eq!(grid.outflow_cells().count(), 0);
        assert!((grid.dx() - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_cell_order_is_row_major() {
        let grid = cavity(4, 3);
        let coords: Vec<(usize, usize)> = grid.fluid_cells().map(|c| (c.i(), c.j())).collect();
        assert_eq!(coords[0], (1, 1));
        assert_eq!(coords[1], (2, 1));
        assert_eq!(coords[4], (1, 2));
        assert_eq!(*coords.last().unwrap(), (4, 3));
    }

    #[test]
    fn test_border_flags_face_fluid() {
        let grid = cavity(4, 4);
        let bottom = grid.cell_at(2, 0);
        assert!(bottom.is_border(BorderPosition::Top));
        assert_eq!(bottom.border_count(), 1);

        let left = grid.cell_at(0, 2);
        assert!(left.is_border(BorderPosition::Right));
        assert!(!left.is_border(BorderPosition::Left));

        let lid = grid.cell_at(3, 5);
        assert!(lid.is_border(BorderPosition::Bottom));

        let corner = grid.cell_at(0, 0);
        assert_eq!(corner.border_count(), 0, "corner cell touches no fluid");
    }

    #[test]
    fn test_neighbour_lookup_via_arena() {
        let grid = cavity(4, 4);
        let cell = grid.cell_at(2, 2);
        let right = grid.neighbour(cell, BorderPosition::Right).unwrap();
        assert_eq!((right.i(), right.j()), (3, 2));
        assert_eq!(grid.neighbour_ij(cell, BorderPosition::Bottom), (2, 1));
        assert_eq!(grid.neighbour_ij(cell, BorderPosition::Top), (2, 3));
        let corner = grid.cell_at(0, 0);
        assert!(grid.neighbour(corner, BorderPosition::Left).is_none());
        assert!(grid.neighbour(corner, BorderPosition::Bottom).is_none());
        assert_eq!(grid.neighbour_ij(corner, BorderPosition::Left), (0, 0));
        let up = corner.neighbour(BorderPosition::Top).unwrap();
        assert_eq!((grid.cell(up).i(), grid.cell(up).j()), (0, 1));
    }

    #[test]
    fn test_thermal_subsets() {
        let codes = CellCodes::default();
        let map = geometry::heated_cavity(5, 5, &codes);
        let domain = Domain { imax: 5, jmax: 5, xlength: 1.0, ylength: 1.0 };
        let grid = Grid::new(domain, &map, &codes).unwrap();
        assert_eq!(grid.hot_fixed_wall_cells().count(), 5);
        assert_eq!(grid.cold_fixed_wall_cells().count(), 5);
        assert_eq!(grid.adiabatic_fixed_wall_cells().count(), 2 * 7);
        assert_eq!(grid.fixed_wall_cells().count(), 5 + 5 + 14);
        assert!(grid.hot_fixed_wall_cells().all(|c| c.i() == 0));
        assert!(grid.cold_fixed_wall_cells().all(|c| c.wall_id() == codes.cold_wall));
    }

    #[test]
    fn test_fluid_on_ring_rejected() {
        let codes = CellCodes::default();
        let mut map = geometry::lid_driven_cavity(3, 3, &codes);
        map.set(0, 2, codes.fluid);
        let domain = Domain { imax: 3, jmax: 3, xlength: 1.0, ylength: 1.0 };
        let err = Grid::new(domain, &map, &codes).unwrap_err();
        assert!(matches!(err, SolverError::FluidOnDomainBoundary { i: 0, j: 2 }));
    }

    #[test]
    fn test_geometry_size_mismatch() {
        let codes = CellCodes::default();
        let map = geometry::lid_driven_cavity(3, 3, &codes);
        let domain = Domain { imax: 4, jmax: 3, xlength: 1.0, ylength: 1.0 };
        let err = Grid::new(domain, &map, &codes).unwrap_err();
        assert!(matches!(err, SolverError::GeometrySize { expected_width: 6, found_width: 5, .. }));
    }

    #[test]
    fn test_inflow_must_face_right() {
        let codes = CellCodes::default();
        let mut map = geometry::channel(4, 3, &codes);
        // Inflow on the right wall faces fluid on its left side.
        map.set(5, 2, codes.inflow);
        let domain = Domain { imax: 4, jmax: 3, xlength: 1.0, ylength: 1.0 };
        let err = Grid::new(domain, &map, &codes).unwrap_err();
        assert!(matches!(err, SolverError::UnsupportedBorder { kind: "inflow", i: 5, j: 2 }));
    }

    #[test]
    fn test_unknown_ids_are_fixed_walls() {
        let codes = CellCodes::default();
        assert_eq!(codes.classify(7), (CellType::FixedWall, ThermalRole::None));
        assert_eq!(codes.classify(4), (CellType::FixedWall, ThermalRole::Hot));
        assert_eq!(codes.classify(8), (CellType::MovingWall, ThermalRole::None));
    }
}
