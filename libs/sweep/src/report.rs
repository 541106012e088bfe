//! Tabular sweep results.

use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use arcstr::ArcStr;

use crate::error::{Error, Result};
use crate::{Corner, SweepSpec};

/// The default text written for unavailable measurements.
pub const DEFAULT_UNAVAILABLE: &str = "N/A";

/// A single measurement cell.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Measurement {
    /// A numeric value, in the simulator's textual form.
    Value(ArcStr),
    /// The measurement is missing, failed, or the corner did not complete.
    Unavailable,
}

impl Measurement {
    /// Returns `true` if this measurement has a value.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// The value of this measurement, if available.
    pub fn value(&self) -> Option<&ArcStr> {
        match self {
            Self::Value(value) => Some(value),
            Self::Unavailable => None,
        }
    }
}

/// The results of one corner.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResultRow {
    corner: Corner,
    measurements: Vec<Measurement>,
}

impl ResultRow {
    /// Creates a row from the measurements of a corner, in measure order.
    pub fn new(corner: Corner, measurements: Vec<Measurement>) -> Self {
        Self {
            corner,
            measurements,
        }
    }

    /// Creates a row in which all `num_measures` measurements are unavailable.
    pub fn unavailable(corner: Corner, num_measures: usize) -> Self {
        Self::new(corner, vec![Measurement::Unavailable; num_measures])
    }

    /// The corner this row describes.
    #[inline]
    pub fn corner(&self) -> &Corner {
        &self.corner
    }

    /// The measurements of this row, in measure order.
    #[inline]
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Returns `true` if any measurement of this row is unavailable.
    pub fn is_incomplete(&self) -> bool {
        self.measurements.iter().any(|m| !m.is_available())
    }
}

/// A report with one row per corner, in corner order.
#[derive(Debug, Clone)]
pub struct Report {
    header: Vec<String>,
    num_measures: usize,
    rows: Vec<ResultRow>,
    unavailable: ArcStr,
}

/// Counts of the rows in a [`Report`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReportSummary {
    /// The total number of rows.
    pub rows: usize,
    /// The number of rows with at least one unavailable measurement.
    pub incomplete: usize,
}

impl Display for ReportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} corners, {} with unavailable measurements",
            self.rows, self.incomplete
        )
    }
}

impl Report {
    /// Creates an empty report with the columns of the given specification.
    pub fn new(spec: &SweepSpec) -> Self {
        let header = ["corner_id".to_string(), "temperature".to_string()]
            .into_iter()
            .chain(spec.params().map(|p| format!("param_{}", p.name())))
            .chain(spec.libs().map(|l| l.id().column_name()))
            .chain(spec.measures().iter().map(|m| m.to_string()))
            .collect();
        Self {
            header,
            num_measures: spec.measures().len(),
            rows: Vec::new(),
            unavailable: ArcStr::from(DEFAULT_UNAVAILABLE),
        }
    }

    /// Sets the text written for unavailable measurements.
    pub fn with_unavailable(mut self, text: impl Into<ArcStr>) -> Self {
        self.unavailable = text.into();
        self
    }

    /// Appends a row.
    ///
    /// Rows must be added in strictly increasing corner order and carry one
    /// measurement per requested measure.
    pub fn push(&mut self, row: ResultRow) -> Result<()> {
        if let Some(prev) = self.rows.last() {
            if prev.corner.id() >= row.corner.id() {
                return Err(Error::RowOutOfOrder {
                    prev: prev.corner.id(),
                    got: row.corner.id(),
                });
            }
        }
        if row.measurements.len() != self.num_measures {
            return Err(Error::MeasurementCount {
                corner: row.corner.id(),
                expected: self.num_measures,
                got: row.measurements.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// The column names.
    #[inline]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// The rows, in corner order.
    #[inline]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// The number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the report has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Counts complete and incomplete rows.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            rows: self.rows.len(),
            incomplete: self.rows.iter().filter(|row| row.is_incomplete()).count(),
        }
    }

    fn record<'a>(&'a self, row: &'a ResultRow) -> Vec<&'a str> {
        let corner = &row.corner;
        let mut record = Vec::with_capacity(self.header.len());
        record.extend(corner.params().values().map(ArcStr::as_str));
        record.extend(corner.libs().values().map(ArcStr::as_str));
        record.extend(row.measurements.iter().map(|m| match m {
            Measurement::Value(value) => value.as_str(),
            Measurement::Unavailable => self.unavailable.as_str(),
        }));
        record
    }

    /// Writes the report as CSV.
    pub fn write_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(w);
        writer.write_record(&self.header)?;
        for row in self.rows.iter() {
            let id = row.corner.id().to_string();
            let temperature = row.corner.temperature().to_string();
            writer.write_record(
                [id.as_str(), temperature.as_str()]
                    .into_iter()
                    .chain(self.record(row)),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the report as CSV to the file at `path`, creating parent directories as needed.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = create_file(path)?;
        self.write_csv(file)?;
        tracing::info!(path = ?path, rows = self.rows.len(), "wrote report");
        Ok(())
    }
}

/// Creates (or truncates) a report file, creating parent directories as needed.
///
/// Lets callers find out that a report cannot be written before producing it.
pub fn create_file(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}
