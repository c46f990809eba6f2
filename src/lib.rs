// src/lib.rs

//! Repocheck
//!
//! Batch installability auditing for package repositories: every
//! package in the checked repositories gets a verdict on whether it can
//! be installed on the target architecture, with diagnostics for the
//! ones that cannot.
//!
//! # Architecture
//!
//! - Pool: interned package universe, built by the loaders, read-only
//!   once prepared
//! - Loaders: one per metadata format (rpm-md, Debian, susetags, Arch,
//!   native), auto-detected from the file name
//! - Solver: backtracking install resolution with typed failure rules
//! - Check: candidate selection, obsolescence pre-check, weak-solve
//!   pruning, per-candidate diagnosis

pub mod arch;
pub mod check;
pub mod compression;
mod error;
pub mod pool;
pub mod repo;
pub mod solver;
pub mod version;

pub use check::{package_manager_pin, run, CheckOptions, RunStatus};
pub use error::{Error, Result};
pub use pool::{Dep, DepId, DepRel, Package, PackageId, Pool, RelOp, RepoId, StringId};
pub use repo::RepoFormat;
pub use solver::{Job, Problem, RuleInfo, RuleKind, Solver};
