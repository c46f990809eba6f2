// src/pool/dep.rs

//! Dependency relations
//!
//! A `Dep` names a capability, optionally qualified by a version
//! constraint or an architecture. Deps are interned by the pool so that
//! equality is an integer comparison.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::version::evrcmp;

use super::StringId;

/// Comparison operator of a versioned relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

const BIT_GT: u8 = 1;
const BIT_EQ: u8 = 2;
const BIT_LT: u8 = 4;

impl RelOp {
    fn bits(self) -> u8 {
        match self {
            RelOp::Eq => BIT_EQ,
            RelOp::Gt => BIT_GT,
            RelOp::Ge => BIT_GT | BIT_EQ,
            RelOp::Lt => BIT_LT,
            RelOp::Le => BIT_LT | BIT_EQ,
        }
    }

    /// Parse an operator token as written in repository metadata.
    /// rpm-md spells them `EQ`/`GE`/…, the text formats use `=`/`>=`/….
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "=" | "==" | "EQ" => Ok(RelOp::Eq),
            ">" | "GT" => Ok(RelOp::Gt),
            ">=" | "GE" => Ok(RelOp::Ge),
            "<" | "LT" => Ok(RelOp::Lt),
            "<=" | "LE" => Ok(RelOp::Le),
            other => Err(Error::Parse(format!("unknown relation operator `{other}`"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelOp::Eq => "=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
        }
    }
}

impl std::fmt::Display for RelOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Qualifier attached to a capability name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepRel {
    /// Version constraint, e.g. `libfoo >= 2.1`.
    Version(RelOp, StringId),
    /// Exact-architecture selection, e.g. `rpm.x86_64`. Only produced
    /// for the package-manager pin; never written in metadata.
    Arch(StringId),
}

/// An interned capability reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dep {
    pub name: StringId,
    pub rel: Option<DepRel>,
}

impl Dep {
    pub fn is_versioned(&self) -> bool {
        matches!(self.rel, Some(DepRel::Version(..)))
    }
}

/// Does a concrete evr satisfy `op evr`? Used for name/evr matching of
/// obsoletes and for name-selection job targets.
pub fn evr_satisfies(have: &str, op: RelOp, want: &str) -> bool {
    let r = evrcmp(have, want);
    match r {
        Ordering::Less => op.bits() & BIT_LT != 0,
        Ordering::Equal => op.bits() & BIT_EQ != 0,
        Ordering::Greater => op.bits() & BIT_GT != 0,
    }
}

/// Do two constrained ranges overlap? Used to decide whether a versioned
/// provide can satisfy a versioned requirement.
pub fn ranges_intersect(op_a: RelOp, evr_a: &str, op_b: RelOp, evr_b: &str) -> bool {
    let (a, b) = (op_a.bits(), op_b.bits());
    match evrcmp(evr_a, evr_b) {
        // a's bound lies above b's: they meet if a extends down or b up.
        Ordering::Greater => a & BIT_LT != 0 || b & BIT_GT != 0,
        Ordering::Less => a & BIT_GT != 0 || b & BIT_LT != 0,
        Ordering::Equal => {
            a & b & BIT_EQ != 0 || a & b & BIT_GT != 0 || a & b & BIT_LT != 0
        }
    }
}
