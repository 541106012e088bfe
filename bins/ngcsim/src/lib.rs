//! Corner sweeps of ngspice netlists.
//!
//! Reads the sweep directives embedded in a netlist, renders one netlist per
//! corner, simulates the corners concurrently, and writes a CSV report with
//! one row per corner.
#![warn(missing_docs)]

use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use config::Config;
use diagnostics::Severity;
use ngspice::dispatch::{Dispatcher, Job, Scratch, DEFAULT_EXTENSION};
use ngspice::Ngspice;
use sweep::{parse_directives, ParsedDirectives, Renderer, SweepSpec, Temperature};
use tracing::{span, Instrument, Level};


/// Arguments to [`run`].
#[derive(Debug, Clone, ClapParser)]
#[command(
    version,
    about,
    long_about = "Simulate every corner declared by the ngc_* directives of a SPICE netlist and tabulate the measurements"
)]
pub struct Args {
    /// Keep the rendered netlist of every corner, named `<corner_id>.<ext>`.
    #[arg(short, long)]
    pub keep_netlists: bool,
    /// The number of simulations run concurrently.
    ///
    /// Defaults to `run.jobs` from the configuration, or 1.
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel: Option<NonZeroUsize>,
    /// The path where the CSV report should be saved.
    ///
    /// The file and its parent directories will be created if necessary.
    /// Defaults to `<netlist stem>_corners.csv` in the current directory.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Render the netlist of every corner without simulating.
    #[arg(short = 'n', long)]
    pub no_run: bool,
    /// The directory rendered netlists are written to.
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,
    /// The per-simulation timeout in seconds.
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
    /// The simulator executable.
    #[arg(long, value_name = "CMD")]
    pub simulator: Option<String>,
    /// The annotated input netlist.
    pub netlist: PathBuf,
}

/// The outcome of a sweep.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Summary {
    /// The number of corners.
    pub corners: usize,
    /// The number of corners whose simulation did not complete.
    pub failed: usize,
    /// The number of corners with at least one unavailable measurement.
    pub incomplete: usize,
    /// Where the report was written, if corners were simulated.
    pub report: Option<PathBuf>,
    /// Where the rendered netlists were kept, if they were kept.
    pub netlists: Option<PathBuf>,
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.report {
            Some(ref report) => {
                writeln!(
                    f,
                    "{} corners simulated, {} failed, {} with unavailable measurements",
                    self.corners, self.failed, self.incomplete
                )?;
                write!(f, "report: {}", report.display())?;
            }
            None => write!(f, "{} corners rendered, none simulated", self.corners)?,
        }
        if let Some(ref netlists) = self.netlists {
            write!(f, "\nnetlists: {}", netlists.display())?;
        }
        Ok(())
    }
}

/// Settings resolved from the command line and the configuration.
struct Settings {
    simulator: Ngspice,
    parallel: NonZeroUsize,
    scratch_dir: Option<PathBuf>,
    unavailable: String,
    temperature: Temperature,
}

impl Settings {
    /// Command-line flags take priority over configuration values.
    fn new(args: &Args, config: Config) -> Self {
        let timeout = args
            .timeout
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| config.simulator.timeout());
        let command = args
            .simulator
            .clone()
            .unwrap_or(config.simulator.command);
        let simulator = Ngspice::new(command)
            .with_args(config.simulator.args)
            .with_timeout(timeout);
        let parallel = args
            .parallel
            .or(NonZeroUsize::new(config.run.jobs))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            simulator,
            parallel,
            scratch_dir: args.scratch_dir.clone().or(config.run.scratch_dir),
            unavailable: config.report.unavailable,
            temperature: Temperature::new(config.sweep.default_temperature),
        }
    }
}

/// The file stem and extension of the input netlist.
fn netlist_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "netlist".to_string());
    let extension = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    (stem, extension)
}

/// The default report path for a netlist with the given file stem.
pub fn default_report_path(stem: &str) -> PathBuf {
    PathBuf::from(format!("{}_corners.csv", stem))
}

/// Reads the sweep directives of a netlist, warning about anything that
/// would make the sweep useless.
fn read_sweep(netlist: &str, temperature: Temperature) -> SweepSpec {
    let ParsedDirectives { mut spec, issues } = parse_directives(netlist);
    spec.set_default_temperature(temperature);
    let warnings = issues.at_least(Severity::Warning).count();
    if warnings > 0 {
        tracing::warn!("skipped {} malformed or duplicate directive(s)", warnings);
    }
    if spec.is_empty() {
        tracing::warn!("no sweep directives found; simulating the netlist as is");
    } else if spec.measures().is_empty() {
        tracing::warn!("no measurements requested with `ngc_out`; the report will only list corners");
    }
    if spec.temperatures().is_empty() {
        tracing::info!(%temperature, "no temperatures swept; simulating at the default temperature");
    }
    spec
}

/// Runs a complete sweep: parse, enumerate, render, simulate, and report.
pub async fn run(args: Args, config: Config) -> Result<Summary> {
    let contents = std::fs::read_to_string(&args.netlist)
        .with_context(|| format!("failed to read netlist `{}`", args.netlist.display()))?;
    let (stem, extension) = netlist_name(&args.netlist);
    let span = span!(Level::INFO, "sweep", netlist = %stem);

    let settings = Settings::new(&args, config);

    async move {
        let spec = read_sweep(&contents, settings.temperature);
        let corners = spec
            .corners()
            .with_context(|| "the sweep declares too many corners to enumerate")?;
        let total = corners.len();
        if total == 0 {
            bail!("the sweep has no corners: an axis has no values");
        }
        tracing::info!(corners = total, "enumerated corners");

        // Fail on an unwritable report before simulating.
        let output = if args.no_run {
            None
        } else {
            let path = args
                .output
                .clone()
                .unwrap_or_else(|| default_report_path(&stem));
            let file = sweep::report::create_file(&path)
                .with_context(|| format!("cannot write report to `{}`", path.display()))?;
            Some((path, file))
        };

        let retain = args.keep_netlists;
        let scratch = match (retain, settings.scratch_dir) {
            (true, Some(dir)) => Scratch::retained(dir, extension),
            (true, None) => Scratch::retained(Scratch::default_retained_dir(&stem), extension),
            (false, Some(dir)) => Scratch::ephemeral_in(dir, extension),
            (false, None) => Scratch::ephemeral(extension),
        }
        .with_context(|| "failed to create scratch directory")?;

        let renderer = Renderer::new(&contents, &spec);
        let jobs = corners.map(|corner| Job::new(corner.id(), renderer.render(&corner)));

        let mut summary = Summary {
            corners: total,
            failed: 0,
            incomplete: 0,
            report: None,
            netlists: scratch.is_retained().then(|| scratch.path().to_path_buf()),
        };

        match output {
            None => {
                if !retain {
                    tracing::warn!(
                        "rendering without simulating or keeping netlists; rendered netlists will be discarded"
                    );
                }
                for job in jobs {
                    // Ephemeral netlists are removed as soon as they are dropped.
                    scratch.write(&job).with_context(|| {
                        format!("failed to write netlist of corner {}", job.id())
                    })?;
                }
                tracing::info!(corners = total, "rendered netlists");
            }
            Some((path, file)) => {
                if let Err(e) = settings.simulator.check().await {
                    drop(file);
                    let _ = std::fs::remove_file(&path);
                    return Err(e).with_context(|| "cannot run the simulator");
                }

                let outcomes = Dispatcher::new(&settings.simulator, &scratch)
                    .parallel(settings.parallel)
                    .run(jobs)
                    .await;
                summary.failed = outcomes.values().filter(|o| !o.is_completed()).count();

                let report = ngspice::collect_report(&spec, &outcomes)
                    .with_context(|| "failed to assemble report")?
                    .with_unavailable(settings.unavailable);
                summary.incomplete = report.summary().incomplete;

                report
                    .write_csv(file)
                    .with_context(|| format!("failed to write report to `{}`", path.display()))?;
                tracing::info!(path = ?path, rows = total, "wrote report");
                summary.report = Some(path);
            }
        }

        scratch
            .close()
            .with_context(|| "failed to remove scratch directory")?;
        tracing::info!(
            corners = summary.corners,
            failed = summary.failed,
            incomplete = summary.incomplete,
            "sweep finished"
        );
        Ok(summary)
    }
    .instrument(span)
    .await
}
