use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::config::TimeConfig;
use crate::error::Result;
use crate::output::FrameWriter;
use crate::solver::diagnostics::{kinetic_energy, max_divergence, max_speed, mean_temperature};
use crate::solver::Case;

/// What a finished (or interrupted) run did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub time: f64,
    pub frames: usize,
    pub interrupted: bool,
    pub kinetic_energy: f64,
    pub max_divergence: f64,
}

/// Advance `case` until `t_end`, the step cap, or until `running` is cleared.
///
/// With a writer, the initial state, every `output_interval` of simulated
/// time, and the final state are written as frames.
pub fn run(
    case: &mut Case,
    time: &TimeConfig,
    running: &AtomicBool,
    mut writer: Option<&mut FrameWriter>,
) -> Result<RunSummary> {
    // Absorbs round-off in the accumulated clock.
    let tol = 1e-9 * time.t_end;
    let mut next_output = time.output_interval;
    let mut interrupted = false;

    if let Some(w) = writer.as_mut() {
        w.write_frame(case)?;
    }

    while case.time() < time.t_end - tol {
        if time.max_steps > 0 && case.step_count() >= time.max_steps {
            info!("reached max_steps = {}", time.max_steps);
            break;
        }
        if !running.load(Ordering::SeqCst) {
            info!("interrupted at step {}", case.step_count());
            interrupted = true;
            break;
        }

        let report = case.step()?;
        if time.log_interval > 0 && report.step % time.log_interval == 0 {
            let ke = kinetic_energy(case.fields(), case.grid());
            let vmax = max_speed(case.fields(), case.grid());
            if case.params().energy_eq {
                let t_mean = mean_temperature(case.fields(), case.grid());
                info!(
                    "step={} t={:.4} dt={:.3e} sor={} res={:.3e} KE={:.6e} |u|max={:.4} T={:.4}",
                    report.step, report.time, report.dt, report.sor_iterations, report.residual, ke, vmax, t_mean
                );
            } else {
                info!(
                    "step={} t={:.4} dt={:.3e} sor={} res={:.3e} KE={:.6e} |u|max={:.4}",
                    report.step, report.time, report.dt, report.sor_iterations, report.residual, ke, vmax
                );
            }
        } else {
            debug!(
                "step={} t={:.6} dt={:.3e} sor={} res={:.3e}",
                report.step, report.time, report.dt, report.sor_iterations, report.residual
            );
        }

        if time.output_interval > 0.0 && case.time() >= next_output - tol {
            if let Some(w) = writer.as_mut() {
                let path = w.write_frame(case)?;
                info!("frame {} -> {}", w.frame_count() - 1, path.display());
            }
            while next_output <= case.time() + tol {
                next_output += time.output_interval;
            }
        }
    }

    let mut frames = 0;
    if let Some(w) = writer.as_mut() {
        if w.last_step() != Some(case.step_count()) {
            w.write_frame(case)?;
        }
        frames = w.frame_count();
    }

    Ok(RunSummary {
        steps: case.step_count(),
        time: case.time(),
        frames,
        interrupted,
        kinetic_energy: kinetic_energy(case.fields(), case.grid()),
        max_divergence: max_divergence(case.fields(), case.grid()),
    })
}
