//! ngspice plugin for corner sweeps.
//!
//! Runs the ngspice command-line simulator on rendered corner netlists
//! (see [`dispatch`]) and turns its textual output into report rows
//! (see [`measure`]).
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use arcstr::ArcStr;
use sweep::{CornerId, Report, ResultRow, SweepSpec};
use tokio::process::Command;

use crate::dispatch::Outcome;
use crate::error::{Error, Result};

pub mod dispatch;
pub mod error;
pub mod measure;

/// The default simulator executable.
pub const DEFAULT_COMMAND: &str = "ngspice";
/// The default arguments passed before the netlist path (batch mode).
pub const DEFAULT_ARGS: &[&str] = &["-b"];
/// The default per-simulation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// ngspice simulator configuration.
///
/// The simulator is invoked as `<command> <args>... <netlist>`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Ngspice {
    command: ArcStr,
    args: Vec<ArcStr>,
    timeout: Duration,
}

impl Default for Ngspice {
    fn default() -> Self {
        Self {
            command: ArcStr::from(DEFAULT_COMMAND),
            args: DEFAULT_ARGS.iter().copied().map(ArcStr::from).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Ngspice {
    /// Creates a simulator configuration running the given executable with no extra arguments.
    pub fn new(command: impl Into<ArcStr>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the arguments passed before the netlist path.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<ArcStr>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the wall-clock timeout of each simulation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The simulator executable.
    #[inline]
    pub fn command(&self) -> &ArcStr {
        &self.command
    }

    /// The arguments passed before the netlist path.
    #[inline]
    pub fn args(&self) -> &[ArcStr] {
        &self.args
    }

    /// The wall-clock timeout of each simulation.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the command simulating the netlist at the given path.
    ///
    /// Standard input is closed and both output streams are captured. The
    /// child is killed if the returned command's child handle is dropped.
    pub fn simulate_command(&self, netlist: &Path) -> Command {
        let mut command = Command::new(self.command.as_str());
        command
            .args(self.args.iter().map(ArcStr::as_str))
            .arg(netlist)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Checks that the simulator can be launched by running `<command> --version`.
    ///
    /// The check is subject to the simulator timeout.
    /// Returns the first line the simulator printed, which is usually its version.
    pub async fn check(&self) -> Result<ArcStr> {
        let output = Command::new(self.command.as_str())
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| Error::CheckTimeout(self.command.clone(), self.timeout))?
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::SimulatorNotFound(self.command.clone()),
                _ => Error::Io(e),
            })?;
        if !output.status.success() {
            tracing::debug!(status = ?output.status, "simulator version check exited unsuccessfully");
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        tracing::info!(command = %self.command, version, "found simulator");
        Ok(ArcStr::from(version))
    }
}

/// Assembles the report of a sweep from the outcomes of its corners.
///
/// Rows follow corner enumeration order regardless of the order in which the
/// corners completed. Corners that failed or have no outcome produce rows in
/// which every measurement is unavailable.
pub fn collect_report(spec: &SweepSpec, outcomes: &BTreeMap<CornerId, Outcome>) -> Result<Report> {
    let mut report = Report::new(spec);
    let num_measures = spec.measures().len();
    for corner in spec.corners()? {
        let row = match outcomes.get(&corner.id()) {
            Some(Outcome::Completed(log)) => {
                let measurements = measure::extract(log, spec.measures());
                ResultRow::new(corner, measurements)
            }
            Some(Outcome::Failed(_)) => ResultRow::unavailable(corner, num_measures),
            None => {
                tracing::warn!(corner = %corner.id(), "no simulation outcome for corner");
                ResultRow::unavailable(corner, num_measures)
            }
        };
        report.push(row)?;
    }
    Ok(report)
}
