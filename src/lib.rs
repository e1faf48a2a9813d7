//! # bilens
//!
//! Bidirectional lenses for configuration files. One lens describes both how to read text
//! into a tree and how to write a modified tree back, so that edits through the tree
//! change only what was edited and every other byte of the file survives.
//!
//! ```rust,ignore
//! use bilens::{engine, Info, Lens, ParseFlags};
//!
//! let at = Info::unknown;
//! let line = Lens::make_concat(at(), Lens::key(at(), "[a-z]+")?, Lens::del(at(), " = ", " = ")?, true)?;
//! let line = Lens::make_concat(at(), line, Lens::store(at(), "[0-9]+")?, true)?;
//!
//! let mut parsed = engine::get(&line, "x = 1", ParseFlags::default())?;
//! parsed.tree.children[0].value = Some("2".into());
//! let text = engine::put(&line, &parsed.tree, &parsed.skel, &mut parsed.dict, "x = 1")?;
//! assert_eq!(text, "x = 2");
//! ```
//!
//! Layout, leaf first:
//!
//! - [`fa`]: regular languages as minimal DFAs; overlap and ambiguity checks
//! - [`lens`]: the combinators and their typechecking
//! - [`skel`]: skeletons and dictionaries, the formatting `get` saves for `put`
//! - [`tree`]: the tree `get` produces, with a small path API
//! - [`engine`]: `parse`, `get`, `put`
//! - [`library`]: ready-made lenses for common formats
//! - [`config`], [`error`], [`testing`]: the supporting cast

pub mod config;
pub mod engine;
pub mod error;
pub mod fa;
pub mod lens;
pub mod library;
pub mod skel;
pub mod testing;
pub mod tree;

pub use config::ParseFlags;
pub use engine::{create, get, parse, put, put_text, Parsed};
pub use error::{LensError, LnsError, RegexpError, TreeError};
pub use fa::Regexp;
pub use lens::{Info, Lens, Tag};
pub use skel::{Dict, Skel};
pub use tree::{Node, Tree};
