//! Test support
//!
//! Two pieces, used by the unit tests and the integration tests alike:
//!
//! - [`assert_tree`]: fluent assertions over a [`Tree`]
//! - [`Samples`]: sample configuration files under `samples/<lens>/NN-description.conf`
//!
//! ```rust,ignore
//! let parsed = Samples::load("hosts", 1).get();
//! assert_tree(&parsed.tree)
//!     .node_count(3)
//!     .node(0, |n| {
//!         n.label("1").child_value("ipaddr", "127.0.0.1");
//!     });
//! ```

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ParseFlags;
use crate::engine::{self, Parsed};
use crate::library::LensRegistry;
use crate::tree::{Node, Tree};

// ============================================================================
// Tree assertions
// ============================================================================

pub fn assert_tree(tree: &Tree) -> TreeAssertion<'_> {
    TreeAssertion { tree }
}

pub struct TreeAssertion<'a> {
    tree: &'a Tree,
}

impl<'a> TreeAssertion<'a> {
    pub fn node_count(self, expected: usize) -> Self {
        let actual = self.tree.children.len();
        assert_eq!(
            actual,
            expected,
            "Expected {expected} top-level nodes, found {actual}: [{}]",
            summarize(&self.tree.children)
        );
        self
    }

    /// Assert on the top-level node at `index`.
    pub fn node<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(NodeAssertion<'a>),
    {
        assert!(
            index < self.tree.children.len(),
            "Node index {index} out of bounds (tree has {} nodes)",
            self.tree.children.len()
        );
        assertion(NodeAssertion {
            node: &self.tree.children[index],
            context: format!("/[{index}]"),
        });
        self
    }

    /// Assert the labels of the top-level nodes, in order.
    pub fn labels(self, expected: &[&str]) -> Self {
        let actual: Vec<_> = self
            .tree
            .children
            .iter()
            .map(|n| n.label().unwrap_or("(none)"))
            .collect();
        assert_eq!(actual, expected, "Top-level labels differ");
        self
    }

    pub fn value_at(self, path: &str, expected: &str) -> Self {
        let found = self
            .tree
            .get(path)
            .unwrap_or_else(|e| panic!("Bad path {path}: {e}"));
        let node = found.unwrap_or_else(|| panic!("No node at {path}"));
        assert_eq!(node.value(), Some(expected), "Value at {path}");
        self
    }
}

pub struct NodeAssertion<'a> {
    node: &'a Node,
    context: String,
}

impl<'a> NodeAssertion<'a> {
    pub fn label(self, expected: &str) -> Self {
        assert_eq!(
            self.node.label(),
            Some(expected),
            "{}: expected label {expected:?}",
            self.context
        );
        self
    }

    pub fn unlabeled(self) -> Self {
        assert!(
            self.node.label.is_none(),
            "{}: expected no label, found {:?}",
            self.context,
            self.node.label
        );
        self
    }

    pub fn value(self, expected: &str) -> Self {
        assert_eq!(
            self.node.value(),
            Some(expected),
            "{}: expected value {expected:?}",
            self.context
        );
        self
    }

    pub fn no_value(self) -> Self {
        assert!(
            self.node.value.is_none(),
            "{}: expected no value, found {:?}",
            self.context,
            self.node.value
        );
        self
    }

    pub fn child_count(self, expected: usize) -> Self {
        let actual = self.node.children.len();
        assert_eq!(
            actual,
            expected,
            "{}: expected {expected} children, found {actual}: [{}]",
            self.context,
            summarize(&self.node.children)
        );
        self
    }

    /// Assert the value of the first child labeled `label`.
    pub fn child_value(self, label: &str, expected: &str) -> Self {
        let child = self
            .node
            .children
            .iter()
            .find(|c| c.label() == Some(label))
            .unwrap_or_else(|| panic!("{}: no child labeled {label:?}", self.context));
        assert_eq!(
            child.value(),
            Some(expected),
            "{}/{label}: unexpected value",
            self.context
        );
        self
    }

    pub fn child<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(NodeAssertion<'a>),
    {
        assert!(
            index < self.node.children.len(),
            "{}: child index {index} out of bounds ({} children)",
            self.context,
            self.node.children.len()
        );
        assertion(NodeAssertion {
            node: &self.node.children[index],
            context: format!("{}/[{index}]", self.context),
        });
        self
    }
}

fn summarize(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|n| match (&n.label, &n.value) {
            (Some(l), Some(v)) => format!("{l}={v}"),
            (Some(l), None) => l.clone(),
            (None, Some(v)) => format!("(none)={v}"),
            (None, None) => "(none)".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Sample files
// ============================================================================

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),
}

/// Sample inputs for the built-in lenses.
pub struct Samples;

impl Samples {
    fn dir(lens: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("samples")
            .join(lens)
    }

    fn find_file(lens: &str, number: usize) -> Result<PathBuf, SampleError> {
        let dir = Self::dir(lens);
        let prefix = format!("{number:02}-");
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(name) = name.to_str() {
                if name.starts_with(&prefix) && name.ends_with(".conf") {
                    return Ok(entry.path());
                }
            }
        }
        Err(SampleError::NotFound(format!(
            "No sample {number} in {}",
            dir.display()
        )))
    }

    pub fn get_source_for(lens: &str, number: usize) -> Result<String, SampleError> {
        Ok(fs::read_to_string(Self::find_file(lens, number)?)?)
    }

    /// Source text, panicking with a helpful message if the sample is missing.
    pub fn must_get_source_for(lens: &str, number: usize) -> String {
        Self::get_source_for(lens, number)
            .unwrap_or_else(|e| panic!("Failed to load {lens} sample #{number}: {e}"))
    }

    /// Sample numbers available for `lens`, sorted.
    pub fn list_numbers_for(lens: &str) -> Result<Vec<usize>, SampleError> {
        let mut numbers: Vec<usize> = fs::read_dir(Self::dir(lens))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(".conf")?;
                name.split('-').next()?.parse().ok()
            })
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    pub fn load(lens: &str, number: usize) -> SampleLoader {
        SampleLoader {
            lens: lens.to_string(),
            number,
        }
    }
}

pub struct SampleLoader {
    lens: String,
    number: usize,
}

impl SampleLoader {
    pub fn source(&self) -> String {
        Samples::must_get_source_for(&self.lens, self.number)
    }

    /// Parse the sample with the registry lens of the same name.
    pub fn get(&self) -> Parsed {
        let lens = LensRegistry::with_defaults()
            .get(&self.lens)
            .unwrap_or_else(|e| panic!("{e}"));
        engine::get(&lens, &self.source(), ParseFlags::default()).unwrap_or_else(|e| {
            panic!("{} sample #{}: {e}", self.lens, self.number)
        })
    }
}
