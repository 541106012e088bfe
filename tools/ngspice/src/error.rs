//! ngspice errors.

use std::time::Duration;

use arcstr::ArcStr;
use thiserror::Error as ThisError;

/// The result type returned by ngspice library functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Possible ngspice errors.
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O error.
    #[error("io error")]
    Io(#[from] std::io::Error),
    /// Error in the sweep or its report.
    #[error("sweep error")]
    Sweep(#[from] sweep::error::Error),
    /// The simulator executable could not be found.
    #[error("simulator `{0}` not found")]
    SimulatorNotFound(ArcStr),
    /// The simulator did not answer `--version` in time.
    #[error("simulator `{0}` did not respond to `--version` within {1:?}")]
    CheckTimeout(ArcStr, Duration),
}
