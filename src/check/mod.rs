// src/check/mod.rs

//! The install-check pipeline
//!
//! Candidate selection, the optional obsolescence pre-check, the
//! weak-solve pruning loop, and the per-candidate diagnostic pass, in
//! that order. Everything here reads the pool; the only mutable state
//! is the candidate list itself.

pub mod candidates;
pub mod obsoletes;
pub mod prune;
pub mod report;

use std::io::Write;

use tracing::{debug, info};

use crate::error::Result;
use crate::pool::{DepId, Pool};
use crate::solver::Solver;

/// Run configuration, assembled by the CLI.
#[derive(Debug, Default, Clone)]
pub struct CheckOptions {
    /// Also audit src/nosrc packages.
    pub with_src: bool,
    /// Run the obsolescence checker.
    pub with_obsoletes: bool,
    /// Whitespace-separated substrings; matching candidates are skipped.
    pub exclude: Option<String>,
    /// Package-manager pin, from [`package_manager_pin`].
    pub pin: Option<DepId>,
}

/// Overall verdict of a run, in exit-code form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every audited candidate is installable.
    Clean,
    /// At least one candidate failed its install check.
    InstallFailures,
    /// At least one obsolescence conflict was found. Takes precedence
    /// over install failures in the exit code.
    ObsoleteConflicts,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::InstallFailures => 1,
            RunStatus::ObsoleteConflicts => 2,
        }
    }
}

/// Find the package manager's own identity for the target architecture.
///
/// Every solve pins it so the checked system is self-consistent. Returns
/// `None` when no installable `rpm` package exists at the target arch,
/// in which case solves simply run unpinned.
pub fn package_manager_pin(pool: &mut Pool) -> Option<DepId> {
    let target = pool.target_arch()?;
    let target_str = pool.str(target).to_string();
    let found = pool.packages().any(|(id, pkg)| {
        pkg.arch == target && pool.str(pkg.name) == "rpm" && pool.installable(id)
    });
    if !found {
        return None;
    }
    Some(pool.dep_arch("rpm", &target_str))
}

/// Audit every candidate in the pool and write diagnostics to `out`.
pub fn run(pool: &Pool, opts: &CheckOptions, out: &mut dyn Write) -> Result<RunStatus> {
    let mut cand = candidates::select(pool, opts.with_src);
    info!("selected {} candidates to check", cand.len());

    let mut obsolete_conflicts = false;
    if opts.with_obsoletes {
        obsolete_conflicts = obsoletes::check(pool, &cand, out)?;
    }

    let mut solver = Solver::new(pool);
    solver.set_ignore_recommended(true);

    prune::prune(&mut solver, &mut cand, opts.pin);
    debug!("{} candidates left after pruning", cand.len());

    let failures = report::check_candidates(
        pool,
        &mut solver,
        &cand,
        opts.pin,
        opts.exclude.as_deref(),
        out,
    )?;

    Ok(if obsolete_conflicts {
        RunStatus::ObsoleteConflicts
    } else if failures {
        RunStatus::InstallFailures
    } else {
        RunStatus::Clean
    })
}
