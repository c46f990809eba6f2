// src/check/candidates.rs

//! Candidate selection
//!
//! Builds the initial set of packages awaiting a verdict. Background
//! repositories are never audited, non-installable packages are
//! skipped, and foreign-architecture packages that would lose to a
//! same-name target-arch package are filtered out up front: checking
//! them would only reproduce the implicit architecture preference as a
//! misleading failure.

use crate::pool::{PackageId, Pool};

/// Select the packages to audit, in pool order, duplicate-free.
pub fn select(pool: &Pool, with_src: bool) -> Vec<PackageId> {
    let mut cand = Vec::new();
    for (id, pkg) in pool.packages() {
        if pool.repo(pkg.repo).background {
            continue;
        }
        if pool.is_source(id) {
            // Source packages bypass the remaining filters; only their
            // dependencies are checked, not their own architecture fit.
            if with_src {
                cand.push(id);
            }
            continue;
        }
        if !pool.installable(id) {
            continue;
        }
        if let Some(target) = pool.target_arch() {
            if pkg.arch != target && !pool.is_noarch(id) {
                let preferred = pool.providers_of_name(pkg.name).iter().any(|&q| {
                    let other = pool.package(q);
                    other.name == pkg.name && other.arch == target
                });
                if preferred {
                    continue;
                }
            }
        }
        cand.push(id);
    }
    cand
}
