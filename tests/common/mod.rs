// tests/common/mod.rs

//! Shared test utilities for building universes and running checks.

// Not every integration test uses every helper.
#![allow(dead_code)]

use repocheck::check::{self, CheckOptions, RunStatus};
use repocheck::pool::{PackageData, PackageId, Pool, RepoId};

/// A pool with the target architecture set and one checked repository.
pub fn universe(arch: &str) -> (Pool, RepoId) {
    let mut pool = Pool::new();
    pool.set_arch(arch);
    let repo = pool.add_repo("main", false);
    (pool, repo)
}

/// Add a package with relation lists given in textual form.
pub fn add_pkg(
    pool: &mut Pool,
    repo: RepoId,
    name: &str,
    evr: &str,
    arch: &str,
    requires: &[&str],
    conflicts: &[&str],
    obsoletes: &[&str],
) -> PackageId {
    let requires = requires.iter().map(|d| pool.parse_dep(d).unwrap()).collect();
    let conflicts = conflicts.iter().map(|d| pool.parse_dep(d).unwrap()).collect();
    let obsoletes = obsoletes.iter().map(|d| pool.parse_dep(d).unwrap()).collect();
    let data = PackageData {
        name: pool.intern(name),
        evr: pool.intern(evr),
        arch: pool.intern(arch),
        requires,
        conflicts,
        obsoletes,
        ..Default::default()
    };
    pool.add_package(repo, data)
}

/// Shorthand for a leaf package with no relations.
pub fn add_leaf(pool: &mut Pool, repo: RepoId, name: &str, evr: &str, arch: &str) -> PackageId {
    add_pkg(pool, repo, name, evr, arch, &[], &[], &[])
}

/// Prepare the pool, resolve the package-manager pin, run the full
/// check pipeline and capture its report.
pub fn run_check(mut pool: Pool, mut opts: CheckOptions) -> (RunStatus, String) {
    pool.add_file_provides();
    pool.prepare();
    opts.pin = check::package_manager_pin(&mut pool);
    let mut out = Vec::new();
    let status = check::run(&pool, &opts, &mut out).unwrap();
    (status, String::from_utf8(out).unwrap())
}
