mod config;
mod error;
mod fields;
mod grid;
mod output;
mod physics;
mod solver;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use log::{error, info};

use config::{CaseKind, Config};
use output::FrameWriter;
use solver::Case;

struct Defaults;

impl Defaults {
    const CASE: CaseKind = CaseKind::Cavity;
    const LOG_FILTER: &'static str = "info";
}

const USAGE: &str = "usage: macflow [<config.yaml> | --config <file>] [--case <cavity|heated_cavity|channel|step>] \
[--output <dir>] [--no-output] [--max-steps <n>]";

/// Command-line options; anything left unset comes from the config file.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    case: Option<CaseKind>,
    output: Option<PathBuf>,
    no_output: bool,
    max_steps: Option<u64>,
    help: bool,
}

/// Parse arguments (without the program name).
fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = || it.next().with_context(|| format!("{} needs a value", arg));
        match arg.as_str() {
            "--config" | "-c" => cli.config = Some(PathBuf::from(value()?)),
            "--case" => cli.case = Some(value()?.parse()?),
            "--output" | "-o" => cli.output = Some(PathBuf::from(value()?)),
            "--no-output" => cli.no_output = true,
            "--max-steps" => {
                let raw = value()?;
                cli.max_steps = Some(raw.parse().with_context(|| format!("bad --max-steps {:?}", raw))?);
            }
            "--help" | "-h" => cli.help = true,
            path if !path.starts_with('-') && cli.config.is_none() => cli.config = Some(PathBuf::from(path)),
            other => bail!("unknown argument {:?}\n{}", other, USAGE),
        }
    }
    Ok(cli)
}

/// Resolve the config: an explicit file must load, otherwise `macflow.yaml`
/// in the working directory, otherwise the chosen preset.
fn resolve_config(cli: &CliArgs) -> anyhow::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_from(path).with_context(|| format!("loading {}", path.display()))?,
        None => config::load_or(Config::preset(cli.case.unwrap_or(Defaults::CASE))),
    };
    if let Some(dir) = &cli.output {
        cfg.output.dir = dir.clone();
    }
    if cli.no_output {
        cfg.output.enabled = false;
    }
    if let Some(n) = cli.max_steps {
        cfg.time.max_steps = n;
    }
    Ok(cfg)
}

fn run(cli: CliArgs) -> anyhow::Result<()> {
    let cfg = resolve_config(&cli)?;
    let mut case = Case::from_config(&cfg).context("setting up the case")?;
    let grid = case.grid();
    info!(
        "{}: {}x{} cells ({} fluid), dx={:.4} dy={:.4}, energy={}, t_end={}",
        case.name(),
        grid.imax(),
        grid.jmax(),
        grid.fluid_count(),
        grid.dx(),
        grid.dy(),
        cfg.physics.energy_eq,
        cfg.time.t_end
    );
    let kinds: Vec<String> =
        case.boundaries().iter().map(|b| format!("{} ({} cells)", b.kind().name(), b.cells().len())).collect();
    info!("boundaries: {}", kinds.join(", "));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("installing the Ctrl+C handler")?;

    let mut writer = if cfg.output.enabled {
        Some(FrameWriter::create(&cfg.output.dir, &case, &cfg.time)?)
    } else {
        None
    };

    let started = Instant::now();
    let summary = physics::run(&mut case, &cfg.time, &running, writer.as_mut())?;

    if let Some(w) = writer {
        let manifest = w.finish()?;
        info!("{} frames, manifest at {}", summary.frames, manifest.display());
    }
    info!(
        "{} after {} steps at t={:.4} in {:.1}s: KE={:.6e} max|div|={:.3e}",
        if summary.interrupted { "stopped" } else { "done" },
        summary.steps,
        summary.time,
        started.elapsed().as_secs_f64(),
        summary.kinetic_energy,
        summary.max_divergence
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(Defaults::LOG_FILTER)).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    };
    if cli.help {
        println!("{}", USAGE);
        return;
    }
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
