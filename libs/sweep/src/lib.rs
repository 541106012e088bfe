//! Corner sweep specifications for SPICE netlists.
//!
//! A [`SweepSpec`] describes every axis a netlist should be swept over:
//! `.param` values, library corners, and temperatures, along with the
//! measurements to collect. Specifications are usually read from
//! `ngc_*` comment directives embedded in the netlist (see [`directive`]),
//! enumerated into [`Corner`]s (see [`corner`]), and rendered back into
//! per-corner netlists (see [`render`]).
#![warn(missing_docs)]

use std::fmt::Display;
use std::str::FromStr;

use arcstr::ArcStr;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use thiserror::Error;
use unicase::UniCase;

pub mod corner;
pub mod directive;
pub mod error;
pub mod render;
pub mod report;
#[cfg(test)]
mod tests;

pub use corner::{Corner, CornerId, Corners};
pub use directive::{parse_directives, ParsedDirectives};
pub use render::Renderer;
pub use report::{Measurement, Report, ReportSummary, ResultRow};

/// A parameter swept over a list of literal values.
///
/// Values are substituted verbatim; unit suffixes such as `5n` are never interpreted.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParamAxis {
    name: ArcStr,
    values: Vec<ArcStr>,
}

/// The identity of a library axis: a library file and an optional section key.
///
/// Two axes on the same file with different keys are distinct, which allows the
/// NMOS and PMOS sections of one model file to vary independently.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LibId {
    file: ArcStr,
    key: Option<ArcStr>,
}

/// A library file whose section key is swept over a list of corner names.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LibAxis {
    id: LibId,
    corners: Vec<ArcStr>,
}

/// A simulation temperature in degrees Celsius.
///
/// Stored as an exact decimal so that the value is rendered exactly as written.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Temperature(Decimal);

/// An error parsing a [`Temperature`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("`{0}` is not a numeric temperature")]
pub struct ParseTemperatureError(pub ArcStr);

/// A complete description of the corners to simulate and the measurements to collect.
#[derive(Debug, Clone, Default)]
pub struct SweepSpec {
    params: IndexMap<UniCase<ArcStr>, ParamAxis>,
    libs: IndexMap<LibId, LibAxis>,
    temperatures: Vec<Temperature>,
    default_temperature: Temperature,
    measures: Vec<ArcStr>,
}

impl ParamAxis {
    /// Creates a new parameter axis.
    pub fn new(name: impl Into<ArcStr>, values: impl IntoIterator<Item = impl Into<ArcStr>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The parameter name, as written in the directive.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The values this parameter takes, in declaration order.
    #[inline]
    pub fn values(&self) -> &[ArcStr] {
        &self.values
    }
}

impl LibId {
    /// Creates a new library identity.
    ///
    /// Whitespace around the key is trimmed, and an empty key is treated as absent.
    pub fn new(file: impl Into<ArcStr>, key: Option<&str>) -> Self {
        Self {
            file: file.into(),
            key: key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(ArcStr::from),
        }
    }

    /// The library file name or path suffix.
    #[inline]
    pub fn file(&self) -> &ArcStr {
        &self.file
    }

    /// The section key matched in `.lib` statements, if any.
    #[inline]
    pub fn key(&self) -> Option<&ArcStr> {
        self.key.as_ref()
    }

    /// The report column name for this library: `lib_<file>` or `lib_<file>_<key>`.
    pub fn column_name(&self) -> String {
        match self.key {
            Some(ref key) => format!("lib_{}_{}", self.file, key),
            None => format!("lib_{}", self.file),
        }
    }
}

impl Display for LibId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.key {
            Some(ref key) => write!(f, "{}({})", self.file, key),
            None => write!(f, "{}", self.file),
        }
    }
}

impl LibAxis {
    /// Creates a new library axis.
    pub fn new(id: LibId, corners: impl IntoIterator<Item = impl Into<ArcStr>>) -> Self {
        Self {
            id,
            corners: corners.into_iter().map(Into::into).collect(),
        }
    }

    /// The identity of this axis.
    #[inline]
    pub fn id(&self) -> &LibId {
        &self.id
    }

    /// The corner names substituted for the key, in declaration order.
    #[inline]
    pub fn corners(&self) -> &[ArcStr] {
        &self.corners
    }
}

impl Temperature {
    /// Creates a temperature from a decimal value in degrees Celsius.
    #[inline]
    pub fn new(celsius: Decimal) -> Self {
        Self(celsius)
    }

    /// The temperature in degrees Celsius.
    #[inline]
    pub fn celsius(&self) -> Decimal {
        self.0
    }
}

/// 25 degrees Celsius, the temperature of a sweep without a temperature axis.
impl Default for Temperature {
    fn default() -> Self {
        Self(Decimal::from(25))
    }
}

impl FromStr for Temperature {
    type Err = ParseTemperatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map(Self)
            .map_err(|_| ParseTemperatureError(s.into()))
    }
}

impl Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SweepSpec {
    /// Creates an empty sweep specification.
    ///
    /// An empty specification enumerates exactly one corner with no variation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the values of a parameter axis.
    ///
    /// Parameter names are case-insensitive. If the parameter was already swept,
    /// its values are replaced, the axis keeps its original position,
    /// and the previous axis is returned.
    pub fn set_param(
        &mut self,
        name: impl Into<ArcStr>,
        values: impl IntoIterator<Item = impl Into<ArcStr>>,
    ) -> Option<ParamAxis> {
        let axis = ParamAxis::new(name, values);
        self.params.insert(UniCase::new(axis.name.clone()), axis)
    }

    /// Sets the corners of a library axis.
    ///
    /// If the axis was already swept, its corners are replaced, the axis keeps its
    /// original position, and the previous axis is returned.
    pub fn set_lib(
        &mut self,
        id: LibId,
        corners: impl IntoIterator<Item = impl Into<ArcStr>>,
    ) -> Option<LibAxis> {
        let axis = LibAxis::new(id.clone(), corners);
        self.libs.insert(id, axis)
    }

    /// Appends a temperature.
    ///
    /// Returns `false`, leaving the list unchanged, if the temperature is already present.
    pub fn add_temperature(&mut self, temperature: Temperature) -> bool {
        if self.temperatures.contains(&temperature) {
            return false;
        }
        self.temperatures.push(temperature);
        true
    }

    /// Sets the temperature of every corner when no temperatures are swept.
    ///
    /// Defaults to [`Temperature::default`].
    pub fn set_default_temperature(&mut self, temperature: Temperature) {
        self.default_temperature = temperature;
    }

    /// The temperature of every corner when no temperatures are swept.
    #[inline]
    pub fn default_temperature(&self) -> Temperature {
        self.default_temperature
    }

    /// Appends a measurement name.
    ///
    /// Returns `false`, leaving the list unchanged, if a measurement with the
    /// same case-insensitive name is already present.
    pub fn add_measure(&mut self, name: impl Into<ArcStr>) -> bool {
        let name = name.into();
        if self
            .measures
            .iter()
            .any(|m| UniCase::new(m.as_str()) == UniCase::new(name.as_str()))
        {
            return false;
        }
        self.measures.push(name);
        true
    }

    /// The parameter axes, in declaration order.
    pub fn params(&self) -> impl ExactSizeIterator<Item = &ParamAxis> + DoubleEndedIterator {
        self.params.values()
    }

    /// Looks up a parameter axis by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&ParamAxis> {
        self.params.get(&UniCase::new(ArcStr::from(name)))
    }

    /// The library axes, in declaration order.
    pub fn libs(&self) -> impl ExactSizeIterator<Item = &LibAxis> + DoubleEndedIterator {
        self.libs.values()
    }

    /// Looks up a library axis by identity.
    pub fn lib(&self, id: &LibId) -> Option<&LibAxis> {
        self.libs.get(id)
    }

    /// The temperatures, in declaration order.
    #[inline]
    pub fn temperatures(&self) -> &[Temperature] {
        &self.temperatures
    }

    /// The measurement names, in declaration order.
    #[inline]
    pub fn measures(&self) -> &[ArcStr] {
        &self.measures
    }

    /// Returns `true` if no axes and no measurements are specified.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
            && self.libs.is_empty()
            && self.temperatures.is_empty()
            && self.measures.is_empty()
    }
}
