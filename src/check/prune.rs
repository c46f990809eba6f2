// src/check/prune.rs

//! Pruning loop
//!
//! One individual solve per candidate is correct but wasteful when most
//! candidates are trivially installable. Each pass here submits a
//! single query with one weak install per remaining candidate; every
//! candidate the solver actually schedules is provably installable and
//! drops out. The loop ends when the set is empty or a pass removes
//! nothing, at which point the survivors interact badly with each other
//! and need individual diagnosis.

use tracing::debug;

use crate::pool::{DepId, PackageId};
use crate::solver::{Job, Solver};

/// Shrink the candidate set to the packages that need an individual
/// solve. Terminates after at most `cand.len()` passes since every
/// pass but the last removes at least one candidate.
pub fn prune(solver: &mut Solver<'_>, cand: &mut Vec<PackageId>, pin: Option<DepId>) {
    while !cand.is_empty() {
        let mut job = Job::new();
        for &p in cand.iter() {
            job.weak_install(p);
        }
        if let Some(pin) = pin {
            job.install_name(pin);
        }
        solver.solve(&job);

        let before = cand.len();
        cand.retain(|&p| solver.decision_level(p) <= 0);
        debug!(
            "pruning pass removed {} candidates, {} remaining",
            before - cand.len(),
            cand.len()
        );
        if cand.len() == before {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{PackageData, Pool};

    fn add(pool: &mut Pool, repo: crate::pool::RepoId, name: &str, requires: &[&str]) -> PackageId {
        let requires = requires.iter().map(|r| pool.parse_dep(r).unwrap()).collect();
        let data = PackageData {
            name: pool.intern(name),
            evr: pool.intern("1.0-1"),
            arch: pool.intern("x86_64"),
            requires,
            ..Default::default()
        };
        pool.add_package(repo, data)
    }

    #[test]
    fn test_satisfiable_universe_drains_in_one_pass() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("main", false);
        add(&mut pool, repo, "a", &["b"]);
        add(&mut pool, repo, "b", &[]);
        add(&mut pool, repo, "c", &[]);
        pool.prepare();

        let mut cand = crate::check::candidates::select(&pool, false);
        let mut solver = Solver::new(&pool);
        solver.set_ignore_recommended(true);
        prune(&mut solver, &mut cand, None);
        assert!(cand.is_empty());
    }

    #[test]
    fn test_broken_candidate_survives_pruning() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("main", false);
        let broken = add(&mut pool, repo, "broken", &["missing"]);
        add(&mut pool, repo, "fine", &[]);
        pool.prepare();

        let mut cand = crate::check::candidates::select(&pool, false);
        let mut solver = Solver::new(&pool);
        solver.set_ignore_recommended(true);
        prune(&mut solver, &mut cand, None);
        assert_eq!(cand, vec![broken]);
    }

    #[test]
    fn test_idempotent_after_fixpoint() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("main", false);
        add(&mut pool, repo, "broken", &["missing"]);
        add(&mut pool, repo, "alsobroken", &["missing >= 2"]);
        pool.prepare();

        let mut cand = crate::check::candidates::select(&pool, false);
        let mut solver = Solver::new(&pool);
        solver.set_ignore_recommended(true);
        prune(&mut solver, &mut cand, None);
        let fixpoint = cand.clone();
        prune(&mut solver, &mut cand, None);
        assert_eq!(cand, fixpoint);
    }

    #[test]
    fn test_mutually_exclusive_candidates_resolve_over_passes() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("main", false);
        let con = pool.parse_dep("b").unwrap();
        let data = PackageData {
            name: pool.intern("a"),
            evr: pool.intern("1.0-1"),
            arch: pool.intern("x86_64"),
            conflicts: vec![con],
            ..Default::default()
        };
        pool.add_package(repo, data);
        add(&mut pool, repo, "b", &[]);
        pool.prepare();

        // Each is installable alone; the combined weak solve schedules
        // one per pass until the set drains.
        let mut cand = crate::check::candidates::select(&pool, false);
        let mut solver = Solver::new(&pool);
        solver.set_ignore_recommended(true);
        prune(&mut solver, &mut cand, None);
        assert!(cand.is_empty());
    }
}
