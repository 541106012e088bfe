//! Raw TOML configuration loading and merging.
//!
//! Configuration files are discovered by walking from the working directory up
//! its ancestors. Values from nearer files take priority over values from
//! farther ones, and environment variables take priority over all files.
//! Tables are merged key by key; any other value is replaced as a whole.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toml::{Table, Value};

use crate::paths;

/// The name of configuration files.
pub const CONFIG_FILE: &str = "Ngcsim.toml";

/// The prefix of environment variables overriding configuration values.
///
/// The value of `<section>.<key>` is overridden by `NGCSIM_<SECTION>_<KEY>`.
pub const ENV_PREFIX: &str = "NGCSIM";

/// Where a configuration value was defined.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Definition {
    /// Defined in a configuration file.
    Path(PathBuf),
    /// Defined by an environment variable.
    Environment(String),
}

impl Definition {
    /// The directory relative paths are resolved against.
    pub(crate) fn root<'a>(&'a self, cwd: &'a Path) -> &'a Path {
        match self {
            Definition::Path(p) => p.parent().unwrap_or(cwd),
            Definition::Environment(_) => cwd,
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Path(p) => write!(f, "`{}`", p.display()),
            Definition::Environment(key) => write!(f, "environment variable `{}`", key),
        }
    }
}

/// How a configuration value is interpreted when it comes from the environment
/// or when it names a path.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Kind {
    String,
    Integer,
    /// An integer or a floating point number.
    Number,
    /// A whitespace-separated list in the environment.
    List,
    /// A path relative to where it is defined.
    Path,
    /// A path relative to where it is defined if it contains a separator,
    /// otherwise a program looked up on `PATH`.
    Program,
}

/// Every known configuration key.
const KEYS: &[(&str, &str, Kind)] = &[
    ("simulator", "command", Kind::Program),
    ("simulator", "args", Kind::List),
    ("simulator", "timeout", Kind::Integer),
    ("run", "jobs", Kind::Integer),
    ("run", "scratch_dir", Kind::Path),
    ("report", "unavailable", Kind::String),
    ("sweep", "default_temperature", Kind::Number),
];

/// The environment variable overriding `<section>.<key>`.
pub(crate) fn env_key(section: &str, key: &str) -> String {
    format!(
        "{}_{}_{}",
        ENV_PREFIX,
        section.to_uppercase(),
        key.to_uppercase()
    )
}

/// Unparsed configuration, before conversion into typed values.
#[derive(Debug, Clone)]
pub(crate) struct RawConfig {
    /// The directory configuration discovery starts from.
    cwd: PathBuf,
    /// Directory where config file searching should stop (inclusive).
    search_stop_path: Option<PathBuf>,
    /// Environment variable snapshot.
    env: HashMap<String, String>,
}

impl RawConfig {
    pub(crate) fn new(cwd: PathBuf) -> Self {
        let env = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        Self {
            cwd,
            search_stop_path: None,
            env,
        }
    }

    pub(crate) fn set_env(&mut self, env: HashMap<String, String>) {
        self.env = env;
    }

    /// Sets the path where ancestor config file searching will stop. The
    /// given path is included, but its ancestors are not.
    pub(crate) fn set_search_stop_path(&mut self, path: PathBuf) {
        self.search_stop_path = Some(path);
    }

    /// Loads and merges all configuration files and environment overrides.
    pub(crate) fn load(&self) -> Result<Table> {
        let files = paths::find_in_ancestors(
            &self.cwd,
            self.search_stop_path.as_deref(),
            CONFIG_FILE,
        );
        let mut merged = Table::new();
        for path in files.iter().rev() {
            let table = load_file(path)?;
            merge(&mut merged, table);
        }
        self.apply_env(&mut merged)?;
        Ok(merged)
    }

    fn apply_env(&self, table: &mut Table) -> Result<()> {
        for &(section, key, kind) in KEYS {
            let var = env_key(section, key);
            let Some(raw) = self.env.get(&var) else {
                continue;
            };
            let definition = Definition::Environment(var.clone());
            let value = match kind {
                Kind::String => Value::String(raw.clone()),
                Kind::Integer => Value::Integer(raw.trim().parse().with_context(|| {
                    format!("invalid value `{}` in {}: expected an integer", raw, definition)
                })?),
                Kind::Number => parse_number(raw).with_context(|| {
                    format!("invalid value `{}` in {}: expected a number", raw, definition)
                })?,
                Kind::List => Value::Array(
                    raw.split_whitespace()
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                ),
                Kind::Path | Kind::Program => {
                    Value::String(resolve_path(kind, raw, definition.root(&self.cwd)))
                }
            };
            tracing::debug!(%definition, "applying configuration override");
            section_mut(table, section)?.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Loads a configuration file, resolving relative paths against its directory.
fn load_file(path: &Path) -> Result<Table> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file `{}`", path.display()))?;
    let mut table: Table = contents
        .parse()
        .map_err(|e| anyhow::Error::from(e).context("could not parse input as TOML"))
        .with_context(|| format!("could not parse TOML configuration in `{}`", path.display()))?;

    let definition = Definition::Path(path.to_path_buf());
    let root = definition.root(path);
    for &(section, key, kind) in KEYS {
        if !matches!(kind, Kind::Path | Kind::Program) {
            continue;
        }
        let value = table
            .get_mut(section)
            .and_then(Value::as_table_mut)
            .and_then(|section| section.get_mut(key));
        if let Some(Value::String(s)) = value {
            *s = resolve_path(kind, s, root);
        }
    }
    tracing::debug!(path = ?path, "loaded configuration file");
    Ok(table)
}

fn parse_number(raw: &str) -> Result<Value> {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(i) => Ok(Value::Integer(i)),
        Err(_) => Ok(Value::Float(raw.parse::<f64>()?)),
    }
}

fn resolve_path(kind: Kind, value: &str, root: &Path) -> String {
    if kind == Kind::Program && !value.contains(['/', '\\']) {
        return value.to_string();
    }
    paths::resolve(root, value).to_string_lossy().into_owned()
}

fn section_mut<'a>(table: &'a mut Table, section: &str) -> Result<&'a mut Table> {
    table
        .entry(section.to_string())
        .or_insert(Value::Table(Table::new()))
        .as_table_mut()
        .with_context(|| format!("configuration key `{}` must be a table", section))
}

/// Merges `from` into `into`, with values in `from` taking priority.
fn merge(into: &mut Table, from: Table) {
    for (key, value) in from {
        match value {
            Value::Table(new) => match into.get_mut(&key) {
                Some(Value::Table(old)) => merge(old, new),
                _ => {
                    into.insert(key, Value::Table(new));
                }
            },
            value => {
                into.insert(key, value);
            }
        }
    }
}
