//! Error types
//!
//! Three families, one per phase:
//! - [`RegexpError`]: a primitive's pattern could not be compiled
//! - [`LensError`]: a combinator rejected its children while the lens was being built
//! - [`LnsError`]: `get`/`parse` failed at a byte position, or `put` failed at a tree path
//!
//! [`TreeError`] covers the path API of [`crate::tree::Tree`].

use thiserror::Error;

use crate::lens::{Info, Lens};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexpError {
    #[error("invalid regexp /{pattern}/: {message}")]
    Syntax { pattern: String, message: String },

    #[error("unsupported regexp construct: {0}")]
    Unsupported(String),
}

/// Why a lens could not be constructed.
#[derive(Debug, Clone, Error)]
pub enum LensError {
    #[error("{info}: {source}")]
    Regexp {
        info: Info,
        #[source]
        source: RegexpError,
    },

    #[error("{info}: {tag} requires a {what}")]
    MissingPayload {
        info: Info,
        tag: &'static str,
        what: &'static str,
    },

    #[error("{info}: {tag} regexp {regexp} does not match any string")]
    EmptyLanguage {
        info: Info,
        tag: &'static str,
        regexp: String,
    },

    #[error("{info}: del default '{default}' is not matched by {regexp}")]
    DefaultMismatch {
        info: Info,
        regexp: String,
        default: String,
    },

    #[error("{info}: overlapping lenses in union\n    Example matched by both: '{example}'\n    First lens: {left}\n    Second lens: {right}")]
    OverlappingUnion {
        info: Info,
        left: String,
        right: String,
        example: String,
    },

    #[error("{info}: ambiguous concatenation\n    '{example}' can belong to either side\n    First lens: {left}\n    Second lens: {right}")]
    AmbiguousConcat {
        info: Info,
        left: String,
        right: String,
        example: String,
    },

    #[error("{info}: ambiguous iteration\n    '{example}' can be split across iterations of {child}")]
    AmbiguousIteration {
        info: Info,
        child: String,
        example: String,
    },

    #[error("{info}: illegal {what}: {child} matches the empty word")]
    NullableBody {
        info: Info,
        what: &'static str,
        child: String,
    },

    #[error("{info}: multiple {what} in {combinator}")]
    MultipleSlots {
        info: Info,
        what: &'static str,
        combinator: &'static str,
    },
}

impl LensError {
    pub fn info(&self) -> &Info {
        match self {
            LensError::Regexp { info, .. }
            | LensError::MissingPayload { info, .. }
            | LensError::EmptyLanguage { info, .. }
            | LensError::DefaultMismatch { info, .. }
            | LensError::OverlappingUnion { info, .. }
            | LensError::AmbiguousConcat { info, .. }
            | LensError::AmbiguousIteration { info, .. }
            | LensError::NullableBody { info, .. }
            | LensError::MultipleSlots { info, .. } => info,
        }
    }
}

/// Failure of `parse`, `get` or `put`.
///
/// Get-side errors point into the input text, put-side errors point into the tree; the enum
/// makes sure exactly one of the two locations exists.
#[derive(Debug, Clone, Error)]
pub enum LnsError {
    #[error("{}: {message} (position {pos})", .lens.info())]
    Get {
        lens: Lens,
        pos: usize,
        message: String,
    },

    #[error("{}: {message} (path {path})", .lens.info())]
    Put {
        lens: Lens,
        path: String,
        message: String,
    },
}

impl LnsError {
    pub(crate) fn get(lens: &Lens, pos: usize, message: impl Into<String>) -> Self {
        LnsError::Get {
            lens: lens.clone(),
            pos,
            message: message.into(),
        }
    }

    pub(crate) fn put(lens: &Lens, path: impl Into<String>, message: impl Into<String>) -> Self {
        LnsError::Put {
            lens: lens.clone(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn lens(&self) -> &Lens {
        match self {
            LnsError::Get { lens, .. } | LnsError::Put { lens, .. } => lens,
        }
    }

    /// Byte offset into the input; only get-side errors have one.
    pub fn pos(&self) -> Option<usize> {
        match self {
            LnsError::Get { pos, .. } => Some(*pos),
            LnsError::Put { .. } => None,
        }
    }

    /// Tree path; only put-side errors have one.
    pub fn path(&self) -> Option<&str> {
        match self {
            LnsError::Get { .. } => None,
            LnsError::Put { path, .. } => Some(path),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LnsError::Get { message, .. } | LnsError::Put { message, .. } => message,
        }
    }
}

/// A tree path that does not name what the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("path '{path}' matches {count} nodes")]
    Ambiguous { path: String, count: usize },
}

pub type LensResult<T> = Result<T, LensError>;
pub type LnsResult<T> = Result<T, LnsError>;

/// 1-based line and column of a byte offset, for reporting get errors to people.
pub fn line_col(text: &str, pos: usize) -> (usize, usize) {
    let pos = pos.min(text.len());
    let before = &text.as_bytes()[..pos];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    (line, pos - line_start + 1)
}
