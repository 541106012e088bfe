//! Concurrent execution of corner simulations.
//!
//! A [`Dispatcher`] pulls [`Job`]s from a lazy sequence and runs at most a
//! fixed number of simulator processes at a time. Each job is isolated: a
//! failing, crashing, or hanging simulation only affects its own corner.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arcstr::ArcStr;
use futures_util::stream::{self, StreamExt};
use sweep::CornerId;
use tempfile::{NamedTempFile, TempDir};
use tracing::{span, Instrument, Level};

use crate::error::Result;
use crate::Ngspice;

/// The default netlist file extension.
pub const DEFAULT_EXTENSION: &str = "sp";

/// One simulation to run: a corner and its rendered netlist.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Job {
    id: CornerId,
    netlist: String,
}

impl Job {
    /// Creates a new job.
    pub fn new(id: CornerId, netlist: impl Into<String>) -> Self {
        Self {
            id,
            netlist: netlist.into(),
        }
    }

    /// The corner simulated by this job.
    #[inline]
    pub fn id(&self) -> CornerId {
        self.id
    }

    /// The rendered netlist.
    #[inline]
    pub fn netlist(&self) -> &str {
        &self.netlist
    }
}

/// The outcome of a single simulation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The simulator exited successfully, producing the given log
    /// (standard output followed by standard error).
    Completed(String),
    /// The simulation did not complete.
    Failed(FailureReason),
}

impl Outcome {
    /// Returns `true` if the simulation completed.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Why a simulation failed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FailureReason {
    /// The simulation exceeded its timeout and was killed.
    Timeout(Duration),
    /// The simulator exited unsuccessfully.
    ///
    /// The code is `None` if the simulator was terminated by a signal.
    ExitStatus(Option<i32>),
    /// The netlist could not be written, the simulator could not be launched,
    /// or its output could not be read.
    Io(ArcStr),
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(timeout) => write!(f, "timed out after {:?}", timeout),
            Self::ExitStatus(Some(code)) => write!(f, "exited with status {}", code),
            Self::ExitStatus(None) => write!(f, "terminated by a signal"),
            Self::Io(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug)]
enum ScratchDir {
    Ephemeral(TempDir),
    Retained(PathBuf),
}

/// The directory rendered netlists are written to.
///
/// An ephemeral scratch directory is removed, along with its contents, when
/// dropped. Netlists in an ephemeral directory are also removed as soon as
/// their simulation ends. A retained scratch directory is never cleaned, and
/// holds one `<corner_id>.<ext>` netlist per corner.
#[derive(Debug)]
pub struct Scratch {
    dir: ScratchDir,
    extension: ArcStr,
}

/// A netlist written to a [`Scratch`] directory.
///
/// Temporary netlists are deleted when dropped.
#[derive(Debug)]
pub enum NetlistFile {
    /// A netlist that outlives the run.
    Retained(PathBuf),
    /// A netlist deleted once dropped.
    Temporary(NamedTempFile),
}

impl NetlistFile {
    /// The path of the netlist.
    pub fn path(&self) -> &Path {
        match self {
            Self::Retained(path) => path,
            Self::Temporary(file) => file.path(),
        }
    }
}

impl Scratch {
    /// Creates an ephemeral scratch directory in the system temporary directory.
    pub fn ephemeral(extension: impl Into<ArcStr>) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("ngcsim_").tempdir()?;
        tracing::debug!(path = ?dir.path(), "created ephemeral scratch directory");
        Ok(Self {
            dir: ScratchDir::Ephemeral(dir),
            extension: extension.into(),
        })
    }

    /// Creates an ephemeral scratch directory inside the given directory.
    pub fn ephemeral_in(parent: impl AsRef<Path>, extension: impl Into<ArcStr>) -> Result<Self> {
        let parent = parent.as_ref();
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix("ngcsim_")
            .tempdir_in(parent)?;
        tracing::debug!(path = ?dir.path(), "created ephemeral scratch directory");
        Ok(Self {
            dir: ScratchDir::Ephemeral(dir),
            extension: extension.into(),
        })
    }

    /// Uses the given directory, creating it if needed, and retains everything written to it.
    pub fn retained(dir: impl Into<PathBuf>, extension: impl Into<ArcStr>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(path = ?dir, "using retained scratch directory");
        Ok(Self {
            dir: ScratchDir::Retained(dir),
            extension: extension.into(),
        })
    }

    /// The default retained scratch directory for a netlist with the given file stem:
    /// `<tmp>/ngcsim_<stem>_<pid>`.
    pub fn default_retained_dir(stem: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ngcsim_{}_{}", stem, std::process::id()))
    }

    /// The scratch directory.
    pub fn path(&self) -> &Path {
        match self.dir {
            ScratchDir::Ephemeral(ref dir) => dir.path(),
            ScratchDir::Retained(ref dir) => dir,
        }
    }

    /// Returns `true` if netlists written to this directory are kept.
    #[inline]
    pub fn is_retained(&self) -> bool {
        matches!(self.dir, ScratchDir::Retained(_))
    }

    /// The extension of the netlists written to this directory.
    #[inline]
    pub fn extension(&self) -> &ArcStr {
        &self.extension
    }

    /// Writes the netlist of a job.
    ///
    /// Retained netlists are named `<corner_id>.<ext>`; ephemeral ones get a
    /// unique name starting with the corner ID.
    pub fn write(&self, job: &Job) -> std::io::Result<NetlistFile> {
        match self.dir {
            ScratchDir::Retained(ref dir) => {
                let path = dir.join(format!("{}.{}", job.id, self.extension));
                std::fs::write(&path, &job.netlist)?;
                Ok(NetlistFile::Retained(path))
            }
            ScratchDir::Ephemeral(ref dir) => {
                let mut file = tempfile::Builder::new()
                    .prefix(&format!("{}_", job.id))
                    .suffix(&format!(".{}", self.extension))
                    .tempfile_in(dir.path())?;
                file.write_all(job.netlist.as_bytes())?;
                file.flush()?;
                Ok(NetlistFile::Temporary(file))
            }
        }
    }

    /// Removes an ephemeral scratch directory, reporting any error.
    ///
    /// Retained directories are left untouched.
    pub fn close(self) -> Result<()> {
        if let ScratchDir::Ephemeral(dir) = self.dir {
            dir.close()?;
        }
        Ok(())
    }
}

/// Runs simulations with bounded concurrency.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    simulator: &'a Ngspice,
    scratch: &'a Scratch,
    parallel: NonZeroUsize,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher running one simulation at a time.
    pub fn new(simulator: &'a Ngspice, scratch: &'a Scratch) -> Self {
        Self {
            simulator,
            scratch,
            parallel: NonZeroUsize::MIN,
        }
    }

    /// Sets the maximum number of concurrent simulations.
    pub fn parallel(mut self, parallel: NonZeroUsize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs every job, returning the outcome of each corner.
    ///
    /// Jobs are pulled from `jobs` only when a slot is free, so at most
    /// `parallel` netlists are rendered and on disk at any time. Outcomes
    /// complete in any order; the returned map is ordered by corner.
    pub async fn run<I>(&self, jobs: I) -> BTreeMap<CornerId, Outcome>
    where
        I: IntoIterator<Item = Job>,
        I::IntoIter: ExactSizeIterator,
    {
        let jobs = jobs.into_iter();
        let total = jobs.len();
        let span = span!(
            Level::INFO,
            "dispatch",
            jobs = total,
            parallel = self.parallel.get()
        );

        async move {
            tracing::info!("running simulations");
            let progress_step = (total / 20).max(1);
            let mut results = BTreeMap::new();
            let mut failed = 0;
            let mut outcomes = stream::iter(jobs)
                .map(|job| self.run_job(job))
                .buffer_unordered(self.parallel.get());

            while let Some((id, outcome)) = outcomes.next().await {
                if !outcome.is_completed() {
                    failed += 1;
                }
                match results.entry(id) {
                    Entry::Vacant(entry) => {
                        entry.insert(outcome);
                    }
                    Entry::Occupied(_) => {
                        tracing::error!(corner = %id, "corner simulated more than once; keeping the first outcome");
                    }
                }
                let completed = results.len();
                if completed % progress_step == 0 || completed == total {
                    tracing::info!(
                        completed,
                        total,
                        failed,
                        "progress: {}%",
                        completed * 100 / total.max(1)
                    );
                }
            }
            results
        }
        .instrument(span)
        .await
    }

    /// Runs a single job to completion, failure, or timeout.
    pub async fn run_job(&self, job: Job) -> (CornerId, Outcome) {
        let id = job.id;
        let outcome = match self.simulate(&job).await {
            Ok(outcome) => outcome,
            Err(reason) => Outcome::Failed(reason),
        };
        match outcome {
            Outcome::Completed(_) => tracing::debug!(corner = %id, "simulation completed"),
            Outcome::Failed(ref reason) => {
                tracing::warn!(corner = %id, "simulation failed: {}", reason)
            }
        }
        (id, outcome)
    }

    async fn simulate(&self, job: &Job) -> std::result::Result<Outcome, FailureReason> {
        let io_failure =
            |action: &str, e: std::io::Error| FailureReason::Io(arcstr::format!("{}: {}", action, e));

        // Dropping `netlist` removes an ephemeral netlist on every exit path.
        let netlist = self
            .scratch
            .write(job)
            .map_err(|e| io_failure("failed to write netlist", e))?;
        tracing::debug!(corner = %job.id, path = ?netlist.path(), "wrote netlist");

        let child = self
            .simulator
            .simulate_command(netlist.path())
            .spawn()
            .map_err(|e| io_failure("failed to launch simulator", e))?;

        // On timeout, the child is dropped and therefore killed.
        let output = tokio::time::timeout(self.simulator.timeout(), child.wait_with_output())
            .await
            .map_err(|_| FailureReason::Timeout(self.simulator.timeout()))?
            .map_err(|e| io_failure("failed to read simulator output", e))?;

        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(Outcome::Completed(log))
        } else {
            tracing::debug!(corner = %job.id, log = %log.trim_end(), "simulator output");
            Err(FailureReason::ExitStatus(output.status.code()))
        }
    }
}
