//! Sweep directives embedded in netlist comments.
//!
//! Directives are comment lines whose text, after the leading `*` characters,
//! starts with one of the following keywords:
//!
//! ```text
//! ** ngc_param vdd_p 2.7 3.0 3.3
//! ** ngc_lib models.lib(mos_typ) tt ff ss
//! ** ngc_temp -40 27 125
//! ** ngc_out delay_rise delay_fall
//! ```
//!
//! Reading directives never modifies the netlist. Malformed directives are
//! skipped and reported as [`DirectiveIssue`]s.

pub mod issue;
#[cfg(test)]
mod tests;

use std::fmt::Display;

use arcstr::ArcStr;
use diagnostics::{IssueSet, Location};
use tracing::{span, Level};
use unicase::UniCase;

use crate::{LibId, SweepSpec, Temperature};
pub use issue::{Cause, DirectiveIssue};

/// The prefix shared by all directive keywords.
pub const DIRECTIVE_PREFIX: &str = "ngc_";

/// The kinds of sweep directives.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DirectiveKind {
    /// `ngc_param <name> <value>...`
    Param,
    /// `ngc_lib <file>[(<key>)] <corner>...`
    Lib,
    /// `ngc_temp <temperature>...`
    Temp,
    /// `ngc_out <measure>...`
    Out,
}

impl DirectiveKind {
    /// The keyword introducing this directive.
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Param => "ngc_param",
            Self::Lib => "ngc_lib",
            Self::Temp => "ngc_temp",
            Self::Out => "ngc_out",
        }
    }

    pub(crate) const fn usage(&self) -> &'static str {
        match self {
            Self::Param => "usage: ngc_param <name> <value1> <value2> ...",
            Self::Lib => "usage: ngc_lib <file>[(<key>)] <corner1> <corner2> ...",
            Self::Temp => "usage: ngc_temp <temp1> <temp2> ...",
            Self::Out => "usage: ngc_out <measure1> <measure2> ...",
        }
    }

    /// Looks up a directive by its case-insensitive keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        [Self::Param, Self::Lib, Self::Temp, Self::Out]
            .into_iter()
            .find(|kind| UniCase::new(kind.keyword()) == UniCase::new(keyword))
    }
}

impl Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// The result of reading the directives of a netlist.
#[derive(Debug, Clone, Default)]
pub struct ParsedDirectives {
    /// The sweep described by the valid directives.
    pub spec: SweepSpec,
    /// Issues found in malformed or redundant directives.
    pub issues: IssueSet<DirectiveIssue>,
}

/// Reads every sweep directive in the given netlist text.
pub fn parse_directives(netlist: &str) -> ParsedDirectives {
    let _guard = span!(Level::INFO, "reading sweep directives").entered();
    let mut parsed = ParsedDirectives::default();
    for (idx, line) in netlist.lines().enumerate() {
        parsed.parse_line(Location::from_index(idx), line);
    }
    tracing::debug!(
        params = parsed.spec.params().len(),
        libs = parsed.spec.libs().len(),
        temperatures = parsed.spec.temperatures().len(),
        measures = parsed.spec.measures().len(),
        "read sweep directives"
    );
    parsed
}

/// Splits a comment line into its directive keyword and arguments.
///
/// Returns `None` for lines that are not directives.
pub(crate) fn split_directive(line: &str) -> Option<(&str, &str)> {
    let body = line.trim_start().strip_prefix('*')?;
    let body = body.trim_start_matches('*').trim();
    let keyword = body.split_whitespace().next()?;
    let prefix = keyword.get(..DIRECTIVE_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(DIRECTIVE_PREFIX) {
        return None;
    }
    Some((keyword, body[keyword.len()..].trim()))
}

impl ParsedDirectives {
    fn issue(&mut self, cause: Cause, location: Location) {
        self.issues.add(DirectiveIssue::new_and_log(cause, location));
    }

    fn parse_line(&mut self, location: Location, line: &str) {
        let Some((keyword, args)) = split_directive(line) else {
            return;
        };
        let Some(kind) = DirectiveKind::from_keyword(keyword) else {
            self.issue(
                Cause::UnknownDirective {
                    keyword: keyword.into(),
                },
                location,
            );
            return;
        };
        if args.is_empty() {
            self.issue(Cause::MissingName { kind }, location);
            return;
        }

        match kind {
            DirectiveKind::Param => self.parse_param(location, args),
            DirectiveKind::Lib => self.parse_lib(location, args),
            DirectiveKind::Temp => self.parse_temp(location, args),
            DirectiveKind::Out => self.parse_out(location, args),
        }
    }

    fn parse_param(&mut self, location: Location, args: &str) {
        let mut tokens = args.split_whitespace();
        let Some(name) = tokens.next() else {
            return;
        };
        let values: Vec<&str> = tokens.collect();
        if values.is_empty() {
            self.issue(
                Cause::MissingValues {
                    kind: DirectiveKind::Param,
                    name: name.into(),
                },
                location,
            );
            return;
        }
        if self.spec.set_param(name, values).is_some() {
            self.issue(Cause::DuplicateParam { name: name.into() }, location);
        }
    }

    fn parse_lib(&mut self, location: Location, args: &str) {
        let (id, rest) = match split_lib_spec(args) {
            Ok(split) => split,
            Err(spec) => {
                self.issue(Cause::UnbalancedParens { spec: spec.into() }, location);
                return;
            }
        };
        let corners: Vec<&str> = rest.split_whitespace().collect();
        if corners.is_empty() {
            self.issue(
                Cause::MissingValues {
                    kind: DirectiveKind::Lib,
                    name: arcstr::format!("{}", id),
                },
                location,
            );
            return;
        }
        if self.spec.set_lib(id.clone(), corners).is_some() {
            self.issue(Cause::DuplicateLib { id }, location);
        }
    }

    fn parse_temp(&mut self, location: Location, args: &str) {
        let mut temperatures = Vec::new();
        for token in args.split_whitespace() {
            match token.parse::<Temperature>() {
                Ok(t) => temperatures.push(t),
                Err(_) => {
                    self.issue(
                        Cause::InvalidTemperature {
                            token: token.into(),
                        },
                        location,
                    );
                    return;
                }
            }
        }
        for temperature in temperatures {
            if !self.spec.add_temperature(temperature) {
                self.issue(Cause::DuplicateTemperature { temperature }, location);
            }
        }
    }

    fn parse_out(&mut self, location: Location, args: &str) {
        for name in args.split_whitespace() {
            if !self.spec.add_measure(name) {
                self.issue(Cause::DuplicateMeasure { name: name.into() }, location);
            }
        }
    }
}

/// Splits `<file>[(<key>)] <corners>...` into the library identity and the
/// remaining text.
///
/// Whitespace is allowed between the file and the opening parenthesis and
/// inside the parentheses. On failure, returns the library specification
/// as written.
fn split_lib_spec(args: &str) -> Result<(LibId, &str), &str> {
    let file_end = args
        .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .unwrap_or(args.len());
    let file = &args[..file_end];
    let after = args[file_end..].trim_start();
    let unbalanced = || {
        let end = args.find(char::is_whitespace).unwrap_or(args.len());
        &args[..end]
    };

    if file.is_empty() || after.starts_with(')') {
        return Err(unbalanced());
    }
    match after.strip_prefix('(') {
        Some(inner) => {
            let close = inner.find(')').ok_or_else(unbalanced)?;
            let key = &inner[..close];
            if key.contains('(') {
                return Err(unbalanced());
            }
            Ok((LibId::new(ArcStr::from(file), Some(key)), &inner[close + 1..]))
        }
        None => Ok((LibId::new(ArcStr::from(file), None), after)),
    }
}
