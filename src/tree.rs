//! The tree produced by `get` and consumed by `put`
//!
//! An ordered forest of nodes; each node has an optional label, an optional string value
//! and ordered children. Nothing about the tree depends on a particular lens.
//!
//! Nodes are addressed with slash-separated paths. A segment is a label, `*` for any
//! label, or `(none)` for an unlabeled node, optionally followed by a 1-based index among
//! the siblings it matches: `/1/alias[2]`, `/*/ipaddr`.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;

static SEGMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<label>[^\[\]/]+)(?:\[(?P<index>[1-9][0-9]*)\])?$").unwrap());

const NO_LABEL: &str = "(none)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn unlabeled() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    /// `None` is the wildcard.
    label: Option<Option<String>>,
    index: Option<usize>,
}

impl Segment {
    fn selects(&self, node: &Node) -> bool {
        match &self.label {
            None => true,
            Some(label) => node.label == *label,
        }
    }

    /// Indices in `nodes` this segment picks.
    fn select(&self, nodes: &[Node]) -> Vec<usize> {
        let matching = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| self.selects(n))
            .map(|(i, _)| i);
        match self.index {
            Some(nth) => matching.skip(nth - 1).take(1).collect(),
            None => matching.collect(),
        }
    }
}

fn parse_path(path: &str) -> Result<Vec<Segment>, TreeError> {
    let invalid = |reason: &str| TreeError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| invalid("paths start with '/'"))?;
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    rest.split('/')
        .map(|part| {
            let caps = SEGMENT_REGEX
                .captures(part)
                .ok_or_else(|| invalid(&format!("bad segment '{part}'")))?;
            let label = match &caps["label"] {
                "*" => None,
                NO_LABEL => Some(None),
                other => Some(Some(other.to_string())),
            };
            let index = match caps.name("index") {
                Some(m) => Some(
                    m.as_str()
                        .parse()
                        .map_err(|_| invalid(&format!("index too large in '{part}'")))?,
                ),
                None => None,
            };
            Ok(Segment { label, index })
        })
        .collect()
}

impl Tree {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every node matching `path`, in document order.
    pub fn matches(&self, path: &str) -> Result<Vec<&Node>, TreeError> {
        let segments = parse_path(path)?;
        let mut level: Vec<&Node> = Vec::new();
        let mut current: Vec<&[Node]> = vec![&self.children];
        for (depth, segment) in segments.iter().enumerate() {
            level = current
                .iter()
                .flat_map(|&nodes| segment.select(nodes).into_iter().map(move |i| &nodes[i]))
                .collect();
            if depth + 1 < segments.len() {
                current = level.iter().map(|n| n.children.as_slice()).collect();
            }
        }
        Ok(level)
    }

    /// The single node at `path`, if any.
    pub fn get(&self, path: &str) -> Result<Option<&Node>, TreeError> {
        let found = self.matches(path)?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.into_iter().next()),
            count => Err(TreeError::Ambiguous {
                path: path.to_string(),
                count,
            }),
        }
    }

    /// Set the value at `path`, creating missing nodes at the end of their parent.
    pub fn set(&mut self, path: &str, value: impl Into<String>) -> Result<(), TreeError> {
        let segments = parse_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| TreeError::InvalidPath {
                path: path.to_string(),
                reason: "cannot set a value on the root".to_string(),
            })?;
        let mut nodes = &mut self.children;
        for segment in parents {
            let index = pick_or_create(nodes, segment, path)?;
            nodes = &mut nodes[index].children;
        }
        let index = pick_or_create(nodes, last, path)?;
        nodes[index].value = Some(value.into());
        Ok(())
    }

    /// Remove every node matching `path` together with its subtree. Returns how many
    /// nodes were removed.
    pub fn remove(&mut self, path: &str) -> Result<usize, TreeError> {
        let segments = parse_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            let count = self.children.len();
            self.children.clear();
            return Ok(count);
        };
        Ok(remove_in(&mut self.children, parents, last))
    }

    /// One `path = value` line per node, in document order.
    pub fn render_paths(&self) -> String {
        let mut out = String::new();
        render_level(&self.children, "", &mut out);
        out
    }
}

fn pick_or_create(nodes: &mut Vec<Node>, segment: &Segment, path: &str) -> Result<usize, TreeError> {
    match segment.select(nodes).as_slice() {
        [] => match (&segment.label, segment.index) {
            (Some(label), None | Some(1)) => {
                nodes.push(Node {
                    label: label.clone(),
                    ..Node::default()
                });
                Ok(nodes.len() - 1)
            }
            _ => Err(TreeError::InvalidPath {
                path: path.to_string(),
                reason: "cannot create a node from a wildcard or index".to_string(),
            }),
        },
        [one] => Ok(*one),
        many => Err(TreeError::Ambiguous {
            path: path.to_string(),
            count: many.len(),
        }),
    }
}

fn remove_in(nodes: &mut Vec<Node>, parents: &[Segment], last: &Segment) -> usize {
    match parents.split_first() {
        None => {
            let doomed = last.select(nodes);
            let mut i = 0;
            nodes.retain(|_| {
                let keep = !doomed.contains(&i);
                i += 1;
                keep
            });
            doomed.len()
        }
        Some((segment, rest)) => {
            let picked = segment.select(nodes);
            picked
                .into_iter()
                .map(|i| remove_in(&mut nodes[i].children, rest, last))
                .sum()
        }
    }
}

/// Path segment naming `nodes[i]` among its siblings.
/// Path segment of every node in `nodes`: the label, with an index when the label repeats.
pub(crate) fn segment_names(nodes: &[Node]) -> Vec<String> {
    let mut totals: HashMap<Option<&str>, usize> = HashMap::new();
    for node in nodes {
        *totals.entry(node.label.as_deref()).or_default() += 1;
    }
    let mut seen: HashMap<Option<&str>, usize> = HashMap::new();
    nodes
        .iter()
        .map(|node| {
            let label = node.label.as_deref();
            let name = label.unwrap_or(NO_LABEL);
            if totals.get(&label).is_some_and(|&n| n > 1) {
                let nth = seen.entry(label).or_default();
                *nth += 1;
                format!("{name}[{nth}]")
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn render_level(nodes: &[Node], prefix: &str, out: &mut String) {
    for (node, name) in nodes.iter().zip(segment_names(nodes)) {
        let path = format!("{prefix}/{name}");
        match &node.value {
            Some(value) => out.push_str(&format!("{path} = {value}\n")),
            None => out.push_str(&format!("{path}\n")),
        }
        render_level(&node.children, &path, out);
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_paths())
    }
}
