// Legacy-VTK frame writer and manifest.json.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::TimeConfig;
use crate::error::Result;
use crate::grid::CellType;
use crate::solver::diagnostics::cell_velocity;
use crate::solver::Case;

const MANIFEST_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridInfo {
    pub imax: usize,
    pub jmax: usize,
    pub dx: f64,
    pub dy: f64,
    #[serde(rename = "type")]
    pub grid_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub t_end: f64,
    pub output_interval: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub step: u64,
    pub time: f64,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub model: String,
    pub grid: GridInfo,
    pub time: TimeInfo,
    pub fields: Vec<String>,
    pub frames: Vec<FrameEntry>,
}

/// Writes one VTK file per frame into a directory and records each in the manifest.
pub struct FrameWriter {
    dir: PathBuf,
    manifest: Manifest,
    with_temperature: bool,
}

impl FrameWriter {
    pub fn create(dir: impl AsRef<Path>, case: &Case, time: &TimeConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let with_temperature = case.params().energy_eq;
        let mut fields = vec!["fluid".to_string(), "pressure".to_string()];
        if with_temperature {
            fields.push("temperature".to_string());
        }
        fields.push("velocity".to_string());

        let grid = case.grid();
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            model: case.name().to_string(),
            grid: GridInfo {
                imax: grid.imax(),
                jmax: grid.jmax(),
                dx: grid.dx(),
                dy: grid.dy(),
                grid_type: "staggered".to_string(),
            },
            time: TimeInfo { t_end: time.t_end, output_interval: time.output_interval },
            fields,
            frames: Vec::new(),
        };
        Ok(Self { dir, manifest, with_temperature })
    }

    pub fn frame_count(&self) -> usize {
        self.manifest.frames.len()
    }

    /// Step of the most recently written frame.
    pub fn last_step(&self) -> Option<u64> {
        self.manifest.frames.last().map(|f| f.step)
    }

    /// Write the current state of `case` as `<name>_<step>.vtk`.
    pub fn write_frame(&mut self, case: &Case) -> Result<PathBuf> {
        let file = format!("{}_{}.vtk", case.name(), case.step_count());
        let path = self.dir.join(&file);
        let mut w = BufWriter::new(File::create(&path)?);
        write_vtk(&mut w, case, self.with_temperature)?;
        w.flush()?;

        log::debug!("wrote {}", path.display());
        self.manifest.frames.push(FrameEntry { step: case.step_count(), time: case.time(), file });
        Ok(path)
    }

    /// Write `manifest.json` and return its path.
    pub fn finish(self) -> Result<PathBuf> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

/// ASCII legacy VTK, STRUCTURED_POINTS with one value per interior cell.
/// Non-fluid cells report zero pressure and velocity.
fn write_vtk<W: Write>(w: &mut W, case: &Case, with_temperature: bool) -> io::Result<()> {
    let grid = case.grid();
    let fields = case.fields();
    let (imax, jmax) = (grid.imax(), grid.jmax());
    let interior = move || (1..=jmax).flat_map(move |j| (1..=imax).map(move |i| grid.cell_at(i, j)));

    writeln!(w, "# vtk DataFile Version 3.0")?;
    writeln!(w, "{} step {} t={}", case.name(), case.step_count(), case.time())?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET STRUCTURED_POINTS")?;
    writeln!(w, "DIMENSIONS {} {} 1", imax + 1, jmax + 1)?;
    writeln!(w, "ORIGIN 0 0 0")?;
    writeln!(w, "SPACING {} {} 1", grid.dx(), grid.dy())?;
    writeln!(w, "CELL_DATA {}", imax * jmax)?;

    writeln!(w, "SCALARS fluid int 1")?;
    writeln!(w, "LOOKUP_TABLE default")?;
    for cell in interior() {
        writeln!(w, "{}", u8::from(cell.kind() == CellType::Fluid))?;
    }

    writeln!(w, "SCALARS pressure double 1")?;
    writeln!(w, "LOOKUP_TABLE default")?;
    for cell in interior() {
        let p = if cell.kind() == CellType::Fluid { fields.p[(cell.i(), cell.j())] } else { 0.0 };
        writeln!(w, "{}", p)?;
    }

    if with_temperature {
        writeln!(w, "SCALARS temperature double 1")?;
        writeln!(w, "LOOKUP_TABLE default")?;
        for cell in interior() {
            writeln!(w, "{}", fields.t[(cell.i(), cell.j())])?;
        }
    }

    writeln!(w, "VECTORS velocity double")?;
    for cell in interior() {
        let (u, v) = if cell.kind() == CellType::Fluid {
            cell_velocity(fields, cell.i(), cell.j())
        } else {
            (0.0, 0.0)
        };
        writeln!(w, "{} {} 0", u, v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaseKind, Config};

    fn small(kind: CaseKind) -> Config {
        let mut cfg = Config::preset(kind);
        cfg.domain.imax = 4;
        cfg.domain.jmax = 3;
        cfg
    }

    #[test]
    fn test_frames_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = small(CaseKind::Cavity);
        let mut case = Case::from_config(&cfg).unwrap();
        let mut writer = FrameWriter::create(dir.path().join("run"), &case, &cfg.time).unwrap();

        writer.write_frame(&case).unwrap();
        case.step().unwrap();
        let second = writer.write_frame(&case).unwrap();
        assert_eq!(writer.frame_count(), 2);
        assert_eq!(writer.last_step(), Some(1));
        assert!(second.ends_with("lid_driven_cavity_1.vtk"));

        let manifest_path = writer.finish().unwrap();
        let manifest: Manifest =
            serde_json::from_str(&std::fs::read_to_string(manifest_path).unwrap()).unwrap();
        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.model, "lid_driven_cavity");
        assert_eq!(manifest.grid.imax, 4);
        assert_eq!(manifest.grid.grid_type, "staggered");
        assert_eq!(manifest.fields, vec!["fluid", "pressure", "velocity"]);
        assert_eq!(manifest.frames[0].file, "lid_driven_cavity_0.vtk");
        assert_eq!(manifest.frames[1].step, 1);
        assert!(manifest.frames[1].time > 0.0);
    }

    #[test]
    fn test_vtk_layout() {
        let cfg = small(CaseKind::HeatedCavity);
        let case = Case::from_config(&cfg).unwrap();
        let mut buf = Vec::new();
        write_vtk(&mut buf, &case, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# vtk DataFile Version 3.0");
        assert!(lines.contains(&"DIMENSIONS 5 4 1"));
        assert!(lines.contains(&"CELL_DATA 12"));
        assert!(lines.contains(&"SCALARS temperature double 1"));

        let start = lines.iter().position(|l| *l == "SCALARS fluid int 1").unwrap() + 2;
        assert!(lines[start..start + 12].iter().all(|l| *l == "1"), "interior is all fluid");
        let vectors = lines.iter().position(|l| *l == "VECTORS velocity double").unwrap();
        assert_eq!(lines.len(), vectors + 1 + 12);
        assert_eq!(lines[vectors + 1], "0 0 0");
    }

    #[test]
    fn test_obstacle_cells_are_masked() {
        let mut cfg = Config::preset(CaseKind::Step);
        cfg.domain.imax = 8;
        cfg.domain.jmax = 4;
        let case = Case::from_config(&cfg).unwrap();
        let mut buf = Vec::new();
        write_vtk(&mut buf, &case, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.iter().position(|l| *l == "SCALARS fluid int 1").unwrap() + 2;
        let mask = &lines[start..start + 32];
        // Block covers i = 1..=2, j = 1..=2.
        assert_eq!(mask.iter().filter(|l| **l == "0").count(), 4);
        assert_eq!(mask[0], "0");
        assert_eq!(mask[2], "1");
        assert!(!text.contains("temperature"));
    }
}
