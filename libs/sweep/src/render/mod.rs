//! Rendering of per-corner netlists.
//!
//! The renderer edits the netlist text line by line. Only three kinds of lines
//! are ever changed:
//!
//! * `.param` lines assigning a swept parameter,
//! * `.lib <path> <key>` lines referencing a swept library,
//! * the `.temp` line, which is overwritten or inserted.
//!
//! Every other line, including the directives themselves, is emitted
//! byte-for-byte, along with its original line terminator.

#[cfg(test)]
mod tests;

use std::ops::Range;
use std::path::Path;

use arcstr::ArcStr;
use lazy_static::lazy_static;
use regex::Regex;
use unicase::UniCase;

use crate::{Corner, SweepSpec};

lazy_static! {
    static ref PARAM_LINE: Regex = Regex::new(r"(?i)^\s*\.param\s").unwrap();
    // Values are a `{...}`, `'...'`, or `"..."` expression, or a single token.
    static ref ASSIGNMENT: Regex =
        Regex::new(r#"([^\s=]+)(\s*=\s*)(\{[^}]*\}|'[^']*'|"[^"]*"|[^\s=]+)"#).unwrap();
    static ref LIB_LINE: Regex = Regex::new(r"(?i)^\s*\.lib\s+(\S+)\s+(\S+)").unwrap();
    static ref TEMP_LINE: Regex = Regex::new(r"(?i)^(\s*)\.temp(\s|$)").unwrap();
    static ref ANALYSIS_LINE: Regex =
        Regex::new(r"(?i)^\s*\.(tran|ac|dc|op|noise|tf|sens|pz|disto|control)(\s|$)").unwrap();
    static ref END_LINE: Regex = Regex::new(r"(?i)^\s*\.end\s*$").unwrap();
}

/// Renders corner-specific netlists from a base netlist.
///
/// The base netlist is analyzed once in [`Renderer::new`]; each call to
/// [`Renderer::render`] then only splices corner values into the
/// precomputed substitution points.
#[derive(Debug, Clone)]
pub struct Renderer<'a> {
    lines: Vec<Line<'a>>,
    temp: TempPlacement,
    newline: &'a str,
}

#[derive(Debug, Clone)]
struct Line<'a> {
    body: &'a str,
    end: &'a str,
    edit: Option<Edit>,
}

/// A substitution point within a line body.
#[derive(Debug, Clone, Eq, PartialEq)]
enum Edit {
    /// Value tokens to replace with the value of the parameter axis at the given index.
    Values(Vec<(Range<usize>, usize)>),
    /// A `.lib` key token to replace with the corner of the library axis at the given index.
    LibKey { range: Range<usize>, axis: usize },
    /// An existing `.temp` line with the given indentation.
    Temp { indent: Range<usize> },
}

/// Where the `.temp` line of a rendered netlist goes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum TempPlacement {
    /// Existing `.temp` lines are overwritten.
    Overwrite,
    /// A new line is inserted before the line at the given index.
    InsertBefore(usize),
    /// A new line is appended to the netlist.
    Append,
}

/// Splits text into line bodies and their terminators (`\n`, `\r\n`, or none).
fn split_lines(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split_inclusive('\n').map(|line| {
        let body = line
            .strip_suffix("\r\n")
            .or_else(|| line.strip_suffix('\n'))
            .unwrap_or(line);
        (body, &line[body.len()..])
    })
}

fn unquote(path: &str) -> &str {
    path.trim_matches(|c| c == '"' || c == '\'')
}

impl<'a> Renderer<'a> {
    /// Analyzes `netlist` for the substitution points of every axis in `spec`.
    ///
    /// Swept parameters and libraries that the netlist never references are
    /// logged as warnings; their values are still enumerated and reported.
    pub fn new(netlist: &'a str, spec: &SweepSpec) -> Self {
        let mut lines: Vec<Line<'a>> = split_lines(netlist)
            .map(|(body, end)| Line {
                body,
                end,
                edit: None,
            })
            .collect();

        let mut params_seen = vec![false; spec.params.len()];
        let mut libs_seen = vec![false; spec.libs.len()];
        let mut first_temp = None;
        let mut first_analysis = None;
        let mut first_end = None;

        for (idx, line) in lines.iter_mut().enumerate() {
            if PARAM_LINE.is_match(line.body) {
                line.edit = param_edit(line.body, spec, &mut params_seen);
            } else if let Some(edit) = lib_edit(line.body, spec) {
                if let Edit::LibKey { axis, .. } = edit {
                    libs_seen[axis] = true;
                }
                line.edit = Some(edit);
            } else if let Some(caps) = TEMP_LINE.captures(line.body) {
                let indent = caps.get(1).map(|m| m.range()).unwrap_or(0..0);
                line.edit = Some(Edit::Temp { indent });
                first_temp.get_or_insert(idx);
            } else if ANALYSIS_LINE.is_match(line.body) {
                first_analysis.get_or_insert(idx);
            } else if END_LINE.is_match(line.body) {
                first_end.get_or_insert(idx);
            }
        }

        for (axis, _) in spec.params().zip(&params_seen).filter(|(_, seen)| !**seen) {
            tracing::warn!(
                param = %axis.name(),
                "swept parameter is not assigned by any `.param` line"
            );
        }
        for (axis, _) in spec.libs().zip(&libs_seen).filter(|(_, seen)| !**seen) {
            tracing::warn!(
                lib = %axis.id(),
                "swept library is not referenced by any `.lib` line"
            );
        }

        let temp = match (first_temp, first_analysis.or(first_end)) {
            (Some(_), _) => TempPlacement::Overwrite,
            (None, Some(idx)) => TempPlacement::InsertBefore(idx),
            (None, None) => TempPlacement::Append,
        };
        let newline = lines
            .iter()
            .map(|line| line.end)
            .find(|end| !end.is_empty())
            .unwrap_or("\n");

        tracing::debug!(
            lines = lines.len(),
            substitutions = lines.iter().filter(|line| line.edit.is_some()).count(),
            temp = ?temp,
            "analyzed netlist"
        );

        Self {
            lines,
            temp,
            newline,
        }
    }

    /// Renders the netlist for the given corner.
    ///
    /// The corner must have been enumerated from the specification this
    /// renderer was created with.
    pub fn render(&self, corner: &Corner) -> String {
        let temp_line = |indent: &str| format!("{}.temp {}", indent, corner.temperature());

        let mut out = String::with_capacity(
            self.lines
                .iter()
                .map(|line| line.body.len() + line.end.len())
                .sum::<usize>()
                + 32,
        );
        for (idx, line) in self.lines.iter().enumerate() {
            if self.temp == TempPlacement::InsertBefore(idx) {
                out.push_str(&temp_line(""));
                out.push_str(self.newline);
            }
            match line.edit {
                Some(Edit::Values(ref values)) => {
                    let mut last = 0;
                    for (range, axis) in values {
                        out.push_str(&line.body[last..range.start]);
                        match corner.param_at(*axis) {
                            Some(value) => out.push_str(value),
                            None => out.push_str(&line.body[range.clone()]),
                        }
                        last = range.end;
                    }
                    out.push_str(&line.body[last..]);
                }
                Some(Edit::LibKey { ref range, axis }) => {
                    let key = corner
                        .lib_at(axis)
                        .map(ArcStr::as_str)
                        .unwrap_or(&line.body[range.clone()]);
                    out.push_str(&line.body[..range.start]);
                    out.push_str(key);
                    out.push_str(&line.body[range.end..]);
                }
                Some(Edit::Temp { ref indent }) => {
                    out.push_str(&temp_line(&line.body[indent.clone()]));
                }
                None => out.push_str(line.body),
            }
            out.push_str(line.end);
        }
        if self.temp == TempPlacement::Append {
            if self.lines.last().is_some_and(|line| line.end.is_empty()) {
                out.push_str(self.newline);
            }
            out.push_str(&temp_line(""));
            out.push_str(self.newline);
        }
        out
    }
}

/// Finds every assignment to a swept parameter on a `.param` line.
fn param_edit(body: &str, spec: &SweepSpec, seen: &mut [bool]) -> Option<Edit> {
    let values: Vec<_> = ASSIGNMENT
        .captures_iter(body)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let axis = spec
                .params
                .get_index_of(&UniCase::new(ArcStr::from(name)))?;
            seen[axis] = true;
            Some((caps.get(3)?.range(), axis))
        })
        .collect();
    (!values.is_empty()).then_some(Edit::Values(values))
}

/// Matches a `.lib <path> <key>` line against the library axes.
///
/// Axes with a key are tried first, so that a keyless axis on the same file
/// only applies to lines no keyed axis claims.
fn lib_edit(body: &str, spec: &SweepSpec) -> Option<Edit> {
    let caps = LIB_LINE.captures(body)?;
    let path = Path::new(unquote(caps.get(1)?.as_str()));
    let key = caps.get(2)?;

    let keyed = spec.libs.values().enumerate().find(|(_, axis)| {
        axis.id().key().is_some_and(|k| {
            UniCase::new(k.as_str()) == UniCase::new(key.as_str())
                && path.ends_with(axis.id().file().as_str())
        })
    });
    let (axis, _) = keyed.or_else(|| {
        spec.libs.values().enumerate().find(|(_, axis)| {
            axis.id().key().is_none() && path.ends_with(axis.id().file().as_str())
        })
    })?;

    Some(Edit::LibKey {
        range: key.range(),
        axis,
    })
}
