// src/check/report.rs

//! Per-candidate diagnosis
//!
//! Every candidate that survived pruning gets an individual required
//! solve. On failure the resolver's rules are classified: framework
//! noise is suppressed, a few kinds get tailored lines, and everything
//! else falls through to the rendered explanation so new rule kinds
//! degrade gracefully.

use std::io::Write;

use tracing::debug;

use crate::error::Result;
use crate::pool::{DepId, PackageId, Pool};
use crate::solver::{Job, RuleInfo, RuleKind, Solver};

/// True when the candidate's identity string contains any of the
/// whitespace-separated patterns. Case-sensitive; an empty pattern list
/// matches nothing.
pub fn is_excluded(pool: &Pool, p: PackageId, pattern: &str) -> bool {
    let ident = pool.package_str(p);
    pattern.split_whitespace().any(|pat| ident.contains(pat))
}

/// Solve each candidate individually and print diagnostics for the
/// failures. Returns whether any candidate failed.
pub fn check_candidates(
    pool: &Pool,
    solver: &mut Solver<'_>,
    cand: &[PackageId],
    pin: Option<DepId>,
    exclude: Option<&str>,
    out: &mut dyn Write,
) -> Result<bool> {
    let mut failed = false;
    for &p in cand {
        if let Some(pattern) = exclude {
            if is_excluded(pool, p, pattern) {
                debug!("skipping excluded candidate {}", pool.package_str(p));
                continue;
            }
        }
        let mut job = Job::new();
        job.install(p);
        if let Some(pin) = pin {
            job.install_name(pin);
        }
        if solver.solve(&job) == 0 {
            continue;
        }
        failed = true;
        writeln!(out, "can't install {}:", pool.package_str(p))?;
        for problem in solver.problems() {
            for rule in problem.rules() {
                print_rule(pool, solver, rule, out)?;
            }
        }
    }
    Ok(failed)
}

fn print_rule(
    pool: &Pool,
    solver: &Solver<'_>,
    rule: &RuleInfo,
    out: &mut dyn Write,
) -> Result<()> {
    match rule.kind {
        // Framework noise: these never originate from the dependency
        // graph itself and add no diagnostic value.
        RuleKind::Distupgrade
        | RuleKind::Job
        | RuleKind::JobProvidedBySystem
        | RuleKind::JobUnknownPackage
        | RuleKind::JobUnsupported => {}
        RuleKind::Update => {
            if let Some(source) = rule.source {
                writeln!(out, "  {} can not be updated", pool.package_str(source))?;
            }
        }
        RuleKind::PkgNothingProvidesDep => {
            writeln!(out, "  {}", solver.render(rule))?;
            // When the version constraint is what fails, show what the
            // bare capability name resolves to.
            if let Some(dep) = rule.dep {
                if pool.dep(dep).is_versioned() {
                    let name = pool.dep(dep).name;
                    for &provider in pool.providers_of_name(name) {
                        writeln!(out, "    (we have {})", pool.package_str(provider))?;
                    }
                }
            }
        }
        _ => writeln!(out, "  {}", solver.render(rule))?,
    }
    Ok(())
}
