// src/check/obsoletes.rs

//! Obsolescence pre-check
//!
//! Reports every package that would be displaced by an obsoletes
//! relation of a candidate. Independent of the resolver and of the
//! install verdicts: a conflict found here escalates the run status but
//! never removes the candidate from further processing.

use std::io::Write;

use crate::error::Result;
use crate::pool::{PackageId, Pool};

/// Check all candidates' obsoletes relations. Returns whether any
/// conflict was reported.
pub fn check(pool: &Pool, cand: &[PackageId], out: &mut dyn Write) -> Result<bool> {
    let mut found = false;
    for &p in cand {
        for &obs in &pool.package(p).obsoletes {
            for victim in pool.whatprovides(obs) {
                if pool.repo_of(victim).background {
                    continue;
                }
                if pool.identical(p, victim) {
                    continue;
                }
                if !pool.obsoletes_match(p, obs, victim) {
                    continue;
                }
                found = true;
                writeln!(out, "can't install {}:", pool.package_str(victim))?;
                writeln!(out, "  package is obsoleted by {}", pool.package_str(p))?;
            }
        }
    }
    Ok(found)
}
