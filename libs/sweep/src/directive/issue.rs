//! Issues found while reading sweep directives.

use std::fmt::Display;

use arcstr::ArcStr;
use diagnostics::{Diagnostic, Location, Severity};

use super::DirectiveKind;
use crate::{LibId, Temperature};

/// An issue found in a sweep directive.
///
/// Issues never abort parsing: the offending directive, or the offending
/// part of it, is skipped and the remaining directives are still read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectiveIssue {
    cause: Cause,
    severity: Severity,
    location: Location,
}

/// The cause of a [`DirectiveIssue`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Cause {
    /// A comment starts with `ngc_` but names no known directive.
    UnknownDirective {
        /// The unrecognized keyword.
        keyword: ArcStr,
    },
    /// A directive has no arguments at all.
    MissingName {
        /// The kind of directive.
        kind: DirectiveKind,
    },
    /// A directive names an axis but lists no values for it.
    MissingValues {
        /// The kind of directive.
        kind: DirectiveKind,
        /// The axis that has no values.
        name: ArcStr,
    },
    /// A library specification has unbalanced parentheses.
    UnbalancedParens {
        /// The library specification as written.
        spec: ArcStr,
    },
    /// A temperature directive contains a non-numeric token.
    InvalidTemperature {
        /// The offending token.
        token: ArcStr,
    },
    /// A parameter is swept by more than one directive.
    DuplicateParam {
        /// The parameter name.
        name: ArcStr,
    },
    /// A library file and key are swept by more than one directive.
    DuplicateLib {
        /// The library identity.
        id: LibId,
    },
    /// A temperature is listed more than once.
    DuplicateTemperature {
        /// The repeated temperature.
        temperature: Temperature,
    },
    /// A measurement is requested more than once.
    DuplicateMeasure {
        /// The repeated measurement name.
        name: ArcStr,
    },
}

impl Diagnostic for DirectiveIssue {
    fn severity(&self) -> Severity {
        self.severity
    }

    fn location(&self) -> Option<Location> {
        Some(self.location)
    }

    fn help(&self) -> Option<Box<dyn Display>> {
        let help = match self.cause {
            Cause::UnknownDirective { .. } => {
                "known directives are ngc_param, ngc_lib, ngc_temp, and ngc_out"
            }
            Cause::MissingName { kind } | Cause::MissingValues { kind, .. } => kind.usage(),
            Cause::UnbalancedParens { .. } => "write the key as <file>(<key>)",
            Cause::DuplicateParam { .. } | Cause::DuplicateLib { .. } => {
                "merge the values into a single directive"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

impl DirectiveIssue {
    /// Creates a new directive issue and logs it immediately.
    ///
    /// The log level is selected according to the severity of the cause.
    pub(crate) fn new_and_log(cause: Cause, location: Location) -> Self {
        let issue = Self {
            severity: cause.severity(),
            cause,
            location,
        };
        diagnostics::log(&issue);
        issue
    }

    /// Gets the underlying cause of this issue.
    #[inline]
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The netlist line containing the directive.
    #[inline]
    pub fn line(&self) -> usize {
        self.location.line
    }
}

impl Cause {
    fn severity(&self) -> Severity {
        match self {
            Self::DuplicateTemperature { .. } | Self::DuplicateMeasure { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl Display for DirectiveIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDirective { keyword } => {
                write!(f, "unknown directive `{}`; ignoring it", keyword)
            }
            Self::MissingName { kind } => {
                write!(f, "`{}` has no arguments; skipping it", kind.keyword())
            }
            Self::MissingValues { kind, name } => write!(
                f,
                "`{}` for `{}` lists no values; skipping it",
                kind.keyword(),
                name
            ),
            Self::UnbalancedParens { spec } => write!(
                f,
                "unbalanced parentheses in library specification `{}`; skipping it",
                spec
            ),
            Self::InvalidTemperature { token } => write!(
                f,
                "`{}` is not a numeric temperature; skipping the whole directive",
                token
            ),
            Self::DuplicateParam { name } => write!(
                f,
                "parameter `{}` is swept more than once; the last directive will be used",
                name
            ),
            Self::DuplicateLib { id } => write!(
                f,
                "library `{}` is swept more than once; the last directive will be used",
                id
            ),
            Self::DuplicateTemperature { temperature } => {
                write!(f, "temperature {} is listed more than once", temperature)
            }
            Self::DuplicateMeasure { name } => {
                write!(f, "measurement `{}` is requested more than once", name)
            }
        }
    }
}
