//! Ready-made lenses
//!
//! A small set of lenses for common configuration formats, built with the public
//! constructors and looked up by name through [`LensRegistry`]:
//!
//! - `keyvalue`: `key = value` lines, `#` comments, blank lines
//! - `shellvars`: `NAME=value` lines with an optional `export`, comments, blank lines
//! - `hosts`: `/etc/hosts` records, numbered with `seq`
//!
//! Every lens is built with typechecking on, so a registry lookup never hands out an
//! ambiguous lens.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::error::{LensError, LensResult};
use crate::lens::{Info, Lens};

macro_rules! here {
    () => {
        Info::new(file!(), line!(), column!())
    };
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("lens '{0}' not found")]
    NotFound(String),

    #[error("lens '{name}' failed to build: {source}")]
    Build {
        name: String,
        #[source]
        source: LensError,
    },
}

struct Entry {
    description: &'static str,
    build: fn() -> LensResult<Lens>,
    lens: OnceCell<Lens>,
}

/// Named lenses, built on first use.
pub struct LensRegistry {
    entries: BTreeMap<String, Entry>,
}

impl LensRegistry {
    pub fn new() -> Self {
        LensRegistry {
            entries: BTreeMap::new(),
        }
    }

    /// Register a lens. A lens with the same name is replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: &'static str,
        build: fn() -> LensResult<Lens>,
    ) {
        self.entries.insert(
            name.into(),
            Entry {
                description,
                build,
                lens: OnceCell::new(),
            },
        );
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Lens, RegistryError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        entry
            .lens
            .get_or_try_init(entry.build)
            .cloned()
            .map_err(|source| RegistryError::Build {
                name: name.to_string(),
                source,
            })
    }

    /// Names with their descriptions, sorted by name.
    pub fn list_lenses(&self) -> Vec<(&str, &'static str)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description))
            .collect()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("keyvalue", "key = value lines with # comments", keyvalue);
        registry.register("shellvars", "NAME=value shell variable assignments", shellvars);
        registry.register("hosts", "/etc/hosts records", hosts);
        registry
    }
}

impl Default for LensRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn concat_all(info: Info, lenses: impl IntoIterator<Item = Lens>) -> LensResult<Lens> {
    let mut lenses = lenses.into_iter();
    let first = lenses.next().ok_or(LensError::MissingPayload {
        info: info.clone(),
        tag: "concat",
        what: "child lens",
    })?;
    lenses.try_fold(first, |acc, l| Lens::make_concat(info.clone(), acc, l, true))
}

fn union_all(info: Info, lenses: impl IntoIterator<Item = Lens>) -> LensResult<Lens> {
    let mut lenses = lenses.into_iter();
    let first = lenses.next().ok_or(LensError::MissingPayload {
        info: info.clone(),
        tag: "union",
        what: "child lens",
    })?;
    lenses.try_fold(first, |acc, l| Lens::make_union(info.clone(), acc, l, true))
}

fn comment() -> LensResult<Lens> {
    Lens::del(here!(), "[ \t]*#[^\n]*\n", "#\n")
}

fn blank() -> LensResult<Lens> {
    Lens::del(here!(), "[ \t]*\n", "\n")
}

fn eol() -> LensResult<Lens> {
    Lens::del(here!(), "[ \t]*\n", "\n")
}

/// Lines, each either `entry`, a comment or blank.
fn lines(entry: Lens) -> LensResult<Lens> {
    let line = union_all(here!(), [entry, comment()?, blank()?])?;
    Lens::make_star(here!(), line, true)
}

/// `key = value`
pub fn keyvalue() -> LensResult<Lens> {
    let entry = concat_all(
        here!(),
        [
            Lens::key(here!(), "[A-Za-z0-9_.-]+")?,
            Lens::del(here!(), "[ \t]*=[ \t]*", " = ")?,
            Lens::store(here!(), "[^ \t\n]([^\n]*[^ \t\n])?")?,
            eol()?,
        ],
    )?;
    lines(Lens::make_subtree(here!(), entry)?)
}

/// `export NAME=value`, where `export` is optional and kept as written.
pub fn shellvars() -> LensResult<Lens> {
    let export = Lens::del(here!(), "export[ \t]+", "export ")?;
    let entry = concat_all(
        here!(),
        [
            Lens::make_maybe(here!(), export, true)?,
            Lens::key(here!(), "[A-Za-z_][A-Za-z0-9_]*")?,
            Lens::del(here!(), "=", "=")?,
            Lens::store(here!(), "[^\n]*")?,
            Lens::del(here!(), "\n", "\n")?,
        ],
    )?;
    lines(Lens::make_subtree(here!(), entry)?)
}

/// `ipaddr canonical alias* [# comment]`, one numbered record per line.
pub fn hosts() -> LensResult<Lens> {
    let field = |name: &str, pattern: &str| -> LensResult<Lens> {
        let entry = Lens::make_concat(
            here!(),
            Lens::label(here!(), name)?,
            Lens::store(here!(), pattern)?,
            true,
        )?;
        Lens::make_subtree(here!(), entry)
    };
    let word = "[^ \t\n#]+";
    let alias = Lens::make_subtree(
        here!(),
        concat_all(
            here!(),
            [
                Lens::del(here!(), "[ \t]+", " ")?,
                Lens::label(here!(), "alias")?,
                Lens::store(here!(), word)?,
            ],
        )?,
    )?;
    let record = concat_all(
        here!(),
        [
            Lens::seq(here!(), "host")?,
            field("ipaddr", "[0-9A-Fa-f.:]+")?,
            Lens::del(here!(), "[ \t]+", "\t")?,
            field("canonical", word)?,
            Lens::make_star(here!(), alias, true)?,
            Lens::del(here!(), "[ \t]*(#[^\n]*)?\n", "\n")?,
        ],
    )?;
    lines(Lens::make_subtree(here!(), record)?)
}
