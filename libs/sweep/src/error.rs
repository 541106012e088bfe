//! Sweep errors.

use crate::CornerId;
use thiserror::Error as ThisError;

/// The result type returned by sweep library functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Possible sweep errors.
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O error.
    #[error("io error")]
    Io(#[from] std::io::Error),
    /// Error writing the CSV report.
    #[error("error writing report")]
    Csv(#[from] csv::Error),
    /// The number of corners does not fit in a `usize`.
    #[error("corner space is too large to enumerate")]
    CornerSpaceOverflow,
    /// A report row was added out of corner order.
    #[error("row for corner {got} added after row for corner {prev}")]
    RowOutOfOrder {
        /// The last corner already in the report.
        prev: CornerId,
        /// The corner that was added.
        got: CornerId,
    },
    /// A report row has the wrong number of measurements.
    #[error("expected {expected} measurements for corner {corner}, got {got}")]
    MeasurementCount {
        /// The corner of the offending row.
        corner: CornerId,
        /// The number of measurements in the sweep specification.
        expected: usize,
        /// The number of measurements in the row.
        got: usize,
    },
}
