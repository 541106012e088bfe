//! Utilities for collecting and reporting issues found in netlist sources.

#![warn(missing_docs)]


use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// An issue that should be reported to users.
pub trait Diagnostic: Debug + Display {
    /// Returns an optional help message that should indicate
    /// what users need to do to resolve an issue.
    fn help(&self) -> Option<Box<dyn Display>> {
        None
    }

    /// Returns the severity of this issue.
    ///
    /// The default implementation returns [`Severity::default`].
    fn severity(&self) -> Severity {
        Default::default()
    }

    /// Returns the source line the issue refers to, if any.
    fn location(&self) -> Option<Location> {
        None
    }
}

/// An enumeration of possible severity levels.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Severity {
    /// An informational message.
    Info,
    /// A warning.
    #[default]
    Warning,
    /// An error. Often, but not always, fatal.
    Error,
}

/// A 1-based line in a source file.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Location {
    /// The line number, starting at 1.
    pub line: usize,
}

impl Location {
    /// Creates a location from a 0-based line index.
    #[inline]
    pub fn from_index(idx: usize) -> Self {
        Self { line: idx + 1 }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}", self.line)
    }
}

/// An ordered collection of issues.
#[derive(Debug, Clone)]
pub struct IssueSet<T> {
    issues: Vec<T>,
    num_warnings: usize,
}

impl<T> IssueSet<T> {
    /// Creates a new, empty issue set.
    #[inline]
    pub fn new() -> Self {
        Self {
            issues: Vec::new(),
            num_warnings: 0,
        }
    }

    /// Returns an iterator over all issues in the order they were added.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.issues.iter()
    }

    /// The number of issues in this issue set.
    #[inline]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns `true` if this issue set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl<T: Diagnostic> IssueSet<T> {
    /// Adds the given issue to the issue set.
    pub fn add(&mut self, issue: T) {
        if issue.severity() == Severity::Warning {
            self.num_warnings += 1;
        }
        self.issues.push(issue);
    }

    /// Returns `true` if this issue set contains a warning.
    pub fn has_warning(&self) -> bool {
        self.num_warnings > 0
    }

    /// The number of warnings in this issue set.
    #[inline]
    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    /// Returns the issues at or above the given severity.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &T> {
        self.issues
            .iter()
            .filter(move |issue| issue.severity() >= severity)
    }
}

impl<T> IntoIterator for IssueSet<T> {
    type Item = T;
    type IntoIter = <std::vec::Vec<T> as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl<T> Default for IssueSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Logs a diagnostic at the tracing level matching its severity.
///
/// The location and help message, if present, are attached as fields.
pub fn log<T: Diagnostic>(issue: &T) {
    let line = issue.location().map(|loc| loc.line);
    let help = issue.help().map(|help| help.to_string());
    // Tracing macros need a level known at compile time.
    match issue.severity() {
        Severity::Info => tracing::info!(line = ?line, help = ?help, "{}", issue),
        Severity::Warning => tracing::warn!(line = ?line, help = ?help, "{}", issue),
        Severity::Error => tracing::error!(line = ?line, help = ?help, "{}", issue),
    }
}

impl<T: Display + Diagnostic> Display for IssueSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for issue in self.issues.iter() {
            match issue.location() {
                Some(loc) => writeln!(f, "{}: {} ({})", issue.severity(), issue, loc)?,
                None => writeln!(f, "{}: {}", issue.severity(), issue)?,
            }
        }
        Ok(())
    }
}
