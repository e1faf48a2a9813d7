//! Typechecking of combinators
//!
//! Checks that always run (they make the engines' job well-defined):
//! - a concatenation must not set the label twice or the value twice
//! - the body of an iteration must not set a label or a value at all
//!
//! Checks that run only when the caller asks for them (they cost automaton constructions):
//! - union: the alternatives' ctypes are disjoint
//! - concat: every word of the concatenation splits in exactly one way
//! - star: the body is not nullable and iterations split in exactly one way
//! - maybe: the body is not nullable

use log::debug;

use super::{Info, Lens};
use crate::error::{LensError, LensResult};

pub(crate) fn concat_slots(info: &Info, l: &Lens, r: &Lens) -> LensResult<()> {
    let (l, r) = (l.node(), r.node());
    if l.key.is_some() && r.key.is_some() {
        return Err(reject(LensError::MultipleSlots {
            info: info.clone(),
            what: "keys",
            combinator: "concatenation",
        }));
    }
    if l.value.is_some() && r.value.is_some() {
        return Err(reject(LensError::MultipleSlots {
            info: info.clone(),
            what: "stores",
            combinator: "concatenation",
        }));
    }
    Ok(())
}

pub(crate) fn iter_slots(info: &Info, child: &Lens) -> LensResult<()> {
    let node = child.node();
    let what = if node.key.is_some() {
        "keys"
    } else if node.value.is_some() {
        "stores"
    } else {
        return Ok(());
    };
    Err(reject(LensError::MultipleSlots {
        info: info.clone(),
        what,
        combinator: "iteration",
    }))
}

pub(crate) fn union(info: &Info, l: &Lens, r: &Lens) -> LensResult<()> {
    match l.ctype().overlap(r.ctype()) {
        Some(example) => Err(reject(LensError::OverlappingUnion {
            info: info.clone(),
            left: l.ctype().to_string(),
            right: r.ctype().to_string(),
            example,
        })),
        None => Ok(()),
    }
}

pub(crate) fn concat(info: &Info, l: &Lens, r: &Lens) -> LensResult<()> {
    match l.ctype().ambiguous_concat(r.ctype()) {
        Some(example) => Err(reject(LensError::AmbiguousConcat {
            info: info.clone(),
            left: l.ctype().to_string(),
            right: r.ctype().to_string(),
            example,
        })),
        None => Ok(()),
    }
}

pub(crate) fn iter(info: &Info, child: &Lens) -> LensResult<()> {
    nonempty(info, child, "iteration")?;
    match child.ctype().ambiguous_iter() {
        Some(example) => Err(reject(LensError::AmbiguousIteration {
            info: info.clone(),
            child: child.ctype().to_string(),
            example,
        })),
        None => Ok(()),
    }
}

pub(crate) fn maybe(info: &Info, child: &Lens) -> LensResult<()> {
    nonempty(info, child, "optional")
}

fn nonempty(info: &Info, child: &Lens, what: &'static str) -> LensResult<()> {
    if child.ctype().matches_empty() {
        return Err(reject(LensError::NullableBody {
            info: info.clone(),
            what,
            child: child.ctype().to_string(),
        }));
    }
    Ok(())
}

fn reject(err: LensError) -> LensError {
    debug!("lens rejected: {err}");
    err
}
