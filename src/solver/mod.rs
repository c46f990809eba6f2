// src/solver/mod.rs

//! Install resolution
//!
//! A backtracking resolver over the pool, scoped to what install
//! auditing needs: schedule a package and its dependency closure, honor
//! conflicts/obsoletes/same-name/architecture rules, and on failure
//! report typed rules the checker can classify. It is not an upgrade or
//! dist-upgrade engine.
//!
//! Jobs are transient: every [`Solver::solve`] call resets all state
//! from the previous one. Weak installs may be left undecided without
//! failing the query; required installs produce one [`Problem`] each on
//! failure.

use crate::pool::{DepId, PackageId, Pool};

/// What a job item asks the solver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    /// Must be scheduled; failure produces a problem.
    Install,
    /// Best effort; failure leaves the target undecided.
    WeakInstall,
}

/// What a job item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTarget {
    Package(PackageId),
    /// Any package matching a name selection (used for the
    /// package-manager pin).
    Name(DepId),
}

/// One `(action, target)` pair of a resolution query.
#[derive(Debug, Clone, Copy)]
pub struct JobItem {
    pub action: JobAction,
    pub target: JobTarget,
}

/// An ordered resolution query, rebuilt fresh for every solve.
#[derive(Debug, Default, Clone)]
pub struct Job {
    items: Vec<JobItem>,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, p: PackageId) {
        self.items.push(JobItem {
            action: JobAction::Install,
            target: JobTarget::Package(p),
        });
    }

    pub fn weak_install(&mut self, p: PackageId) {
        self.items.push(JobItem {
            action: JobAction::WeakInstall,
            target: JobTarget::Package(p),
        });
    }

    pub fn install_name(&mut self, dep: DepId) {
        self.items.push(JobItem {
            action: JobAction::Install,
            target: JobTarget::Name(dep),
        });
    }

    pub fn items(&self) -> &[JobItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Origin of an unsatisfiable rule.
///
/// Closed set of classifications the diagnostics understand; consumers
/// must keep a default arm so new kinds only degrade to the generic
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The package cannot be installed on this target at all.
    PkgNotInstallable,
    /// A requirement has no provider whatsoever.
    PkgNothingProvidesDep,
    /// A requirement has providers, but none of them can be installed.
    PkgRequires,
    /// Two packages conflict.
    PkgConflicts,
    /// One package obsoletes the other.
    PkgObsoletes,
    /// Two packages of the same name cannot coexist.
    PkgSameName,
    /// A better-architecture package of the same name exists.
    PkgInferiorArch,
    /// An installed package cannot be updated.
    Update,
    /// Dist-upgrade bookkeeping.
    Distupgrade,
    /// The caller's own job directive.
    Job,
    /// The job is already satisfied by the running system.
    JobProvidedBySystem,
    /// The job names a package that does not exist.
    JobUnknownPackage,
    /// The job kind is not supported by this solver build.
    JobUnsupported,
}

/// One unsatisfiable rule: kind plus the packages and the capability it
/// involves. Fields not applicable to the kind are `None`.
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub kind: RuleKind,
    pub source: Option<PackageId>,
    pub target: Option<PackageId>,
    pub dep: Option<DepId>,
}

/// Everything the solver knows about one failed required job item.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    rules: Vec<RuleInfo>,
}

impl Problem {
    pub fn rules(&self) -> &[RuleInfo] {
        &self.rules
    }
}

/// The resolver. Borrows the pool read-only for its whole lifetime.
pub struct Solver<'a> {
    pool: &'a Pool,
    ignore_recommended: bool,
    decisions: Vec<i32>,
    trail: Vec<PackageId>,
    level: i32,
    problems: Vec<Problem>,
}

impl<'a> Solver<'a> {
    pub fn new(pool: &'a Pool) -> Self {
        Self {
            pool,
            ignore_recommended: false,
            decisions: Vec::new(),
            trail: Vec::new(),
            level: 0,
            problems: Vec::new(),
        }
    }

    /// Leave "recommends"-class soft dependencies out of the
    /// installability contract.
    pub fn set_ignore_recommended(&mut self, on: bool) {
        self.ignore_recommended = on;
    }

    /// Solve a query. Returns the number of problems; zero means every
    /// required item was scheduled.
    pub fn solve(&mut self, job: &Job) -> usize {
        self.decisions = vec![0; self.pool.npackages()];
        self.trail.clear();
        self.problems.clear();
        self.level = 0;

        for item in job.items() {
            self.level += 1;
            match (item.action, item.target) {
                (JobAction::Install, JobTarget::Package(p)) => {
                    let mut rules = Vec::new();
                    if !self.try_install_root(p, &mut rules) {
                        self.problems.push(Problem { rules });
                    }
                }
                (JobAction::WeakInstall, JobTarget::Package(p)) => {
                    let mut rules = Vec::new();
                    self.try_install_root(p, &mut rules);
                }
                (JobAction::Install, JobTarget::Name(dep)) => {
                    if let Some(problem) = self.install_by_name(dep) {
                        self.problems.push(problem);
                    }
                }
                (JobAction::WeakInstall, JobTarget::Name(dep)) => {
                    self.install_by_name(dep);
                }
            }
        }
        self.problems.len()
    }

    /// Decision level of a package in the current solution. Greater
    /// than zero means scheduled for installation.
    pub fn decision_level(&self, p: PackageId) -> i32 {
        self.decisions.get(p.index()).copied().unwrap_or(0)
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    fn install_by_name(&mut self, dep: DepId) -> Option<Problem> {
        let pool = self.pool;
        let candidates: Vec<PackageId> = pool
            .select_by_name(dep)
            .into_iter()
            .filter(|&p| pool.installable(p))
            .collect();
        if candidates.is_empty() {
            return Some(Problem {
                rules: vec![RuleInfo {
                    kind: RuleKind::JobUnknownPackage,
                    source: None,
                    target: None,
                    dep: Some(dep),
                }],
            });
        }
        if candidates.iter().any(|&p| self.decisions[p.index()] > 0) {
            return None;
        }
        let mut rules = vec![RuleInfo {
            kind: RuleKind::Job,
            source: None,
            target: None,
            dep: Some(dep),
        }];
        for &p in &candidates {
            if self.try_install_root(p, &mut rules) {
                return None;
            }
        }
        Some(Problem { rules })
    }

    fn try_install(&mut self, p: PackageId, rules: &mut Vec<RuleInfo>) -> bool {
        self.try_install_at(p, rules, false)
    }

    // Job-targeted packages are roots: a source package named directly
    // by a job has its dependencies checked even though it is not
    // installable as a dependency of anything else.
    fn try_install_root(&mut self, p: PackageId, rules: &mut Vec<RuleInfo>) -> bool {
        self.try_install_at(p, rules, true)
    }

    /// Try to schedule `p` and its dependency closure. On failure the
    /// trail is restored to its state at entry and `rules` holds the
    /// reasons.
    fn try_install_at(&mut self, p: PackageId, rules: &mut Vec<RuleInfo>, root: bool) -> bool {
        let pool = self.pool;
        if self.decisions[p.index()] > 0 {
            return true;
        }
        if !pool.installable(p) && !(root && pool.is_source(p)) {
            rules.push(RuleInfo {
                kind: RuleKind::PkgNotInstallable,
                source: Some(p),
                target: None,
                dep: None,
            });
            return false;
        }
        if let Some(rule) = self.inferior_arch(p) {
            rules.push(rule);
            return false;
        }
        if let Some(rule) = self.clashes_with_installed(p) {
            rules.push(rule);
            return false;
        }

        let mark = self.trail.len();
        self.decisions[p.index()] = self.level;
        self.trail.push(p);

        for &req in &pool.package(p).requires {
            if self.dep_satisfied(req) {
                continue;
            }
            let providers: Vec<PackageId> = pool
                .whatprovides(req)
                .into_iter()
                .filter(|&q| pool.installable(q))
                .collect();
            if providers.is_empty() {
                rules.push(RuleInfo {
                    kind: RuleKind::PkgNothingProvidesDep,
                    source: Some(p),
                    target: None,
                    dep: Some(req),
                });
                self.rollback(mark);
                return false;
            }
            let mut sub = Vec::new();
            let satisfied = providers.iter().any(|&q| self.try_install(q, &mut sub));
            if !satisfied {
                rules.push(RuleInfo {
                    kind: RuleKind::PkgRequires,
                    source: Some(p),
                    target: None,
                    dep: Some(req),
                });
                rules.append(&mut sub);
                self.rollback(mark);
                return false;
            }
        }

        if !self.ignore_recommended {
            for &rec in &pool.package(p).recommends {
                if self.dep_satisfied(rec) {
                    continue;
                }
                let weak_mark = self.trail.len();
                let mut sub = Vec::new();
                let provider = pool
                    .whatprovides(rec)
                    .into_iter()
                    .find(|&q| pool.installable(q));
                if let Some(q) = provider {
                    if !self.try_install(q, &mut sub) {
                        self.rollback(weak_mark);
                    }
                }
            }
        }

        true
    }

    // A non-target-arch package loses to an implicit preference rule
    // when a same-name package exists at the exact target arch.
    fn inferior_arch(&self, p: PackageId) -> Option<RuleInfo> {
        let pool = self.pool;
        let target = pool.target_arch()?;
        let pkg = pool.package(p);
        if pkg.arch == target || pool.is_noarch(p) || pool.is_source(p) {
            return None;
        }
        let preferred = pool
            .providers_of_name(pkg.name)
            .iter()
            .any(|&q| pool.package(q).name == pkg.name && pool.package(q).arch == target);
        if preferred {
            Some(RuleInfo {
                kind: RuleKind::PkgInferiorArch,
                source: Some(p),
                target: None,
                dep: None,
            })
        } else {
            None
        }
    }

    fn clashes_with_installed(&self, p: PackageId) -> Option<RuleInfo> {
        let pool = self.pool;
        let pkg = pool.package(p);
        for &q in &self.trail {
            let other = pool.package(q);
            if other.name == pkg.name {
                return Some(RuleInfo {
                    kind: RuleKind::PkgSameName,
                    source: Some(p),
                    target: Some(q),
                    dep: None,
                });
            }
            for &con in &pkg.conflicts {
                if pool.provides_dep(q, con) {
                    return Some(RuleInfo {
                        kind: RuleKind::PkgConflicts,
                        source: Some(p),
                        target: Some(q),
                        dep: Some(con),
                    });
                }
            }
            for &con in &other.conflicts {
                if pool.provides_dep(p, con) {
                    return Some(RuleInfo {
                        kind: RuleKind::PkgConflicts,
                        source: Some(q),
                        target: Some(p),
                        dep: Some(con),
                    });
                }
            }
            for &obs in &pkg.obsoletes {
                if pool.obsoletes_match(p, obs, q) {
                    return Some(RuleInfo {
                        kind: RuleKind::PkgObsoletes,
                        source: Some(p),
                        target: Some(q),
                        dep: Some(obs),
                    });
                }
            }
            for &obs in &other.obsoletes {
                if pool.obsoletes_match(q, obs, p) {
                    return Some(RuleInfo {
                        kind: RuleKind::PkgObsoletes,
                        source: Some(q),
                        target: Some(p),
                        dep: Some(obs),
                    });
                }
            }
        }
        None
    }

    fn dep_satisfied(&self, dep: DepId) -> bool {
        self.pool
            .whatprovides(dep)
            .into_iter()
            .any(|q| self.decisions[q.index()] > 0)
    }

    fn rollback(&mut self, mark: usize) {
        for p in self.trail.drain(mark..) {
            self.decisions[p.index()] = 0;
        }
    }

    /// Render one rule as explanation text.
    pub fn render(&self, info: &RuleInfo) -> String {
        let pool = self.pool;
        let pkg = |p: Option<PackageId>| {
            p.map_or_else(|| "<unknown>".to_string(), |p| pool.package_str(p))
        };
        let dep = |d: Option<DepId>| d.map_or_else(|| "<unknown>".to_string(), |d| pool.dep_str(d));
        match info.kind {
            RuleKind::PkgNotInstallable => {
                format!("package {} is not installable", pkg(info.source))
            }
            RuleKind::PkgNothingProvidesDep => format!(
                "nothing provides {} needed by {}",
                dep(info.dep),
                pkg(info.source)
            ),
            RuleKind::PkgRequires => format!(
                "package {} requires {}, but none of the providers can be installed",
                pkg(info.source),
                dep(info.dep)
            ),
            RuleKind::PkgConflicts => format!(
                "package {} conflicts with {} provided by {}",
                pkg(info.source),
                dep(info.dep),
                pkg(info.target)
            ),
            RuleKind::PkgObsoletes => format!(
                "package {} obsoletes {} provided by {}",
                pkg(info.source),
                dep(info.dep),
                pkg(info.target)
            ),
            RuleKind::PkgSameName => format!(
                "cannot install both {} and {}",
                pkg(info.source),
                pkg(info.target)
            ),
            RuleKind::PkgInferiorArch => {
                format!("{} has inferior architecture", pkg(info.source))
            }
            RuleKind::Update => format!("problem with installed package {}", pkg(info.source)),
            RuleKind::Distupgrade => format!(
                "{} does not belong to a distupgrade repository",
                pkg(info.source)
            ),
            RuleKind::Job => "conflicting requests".to_string(),
            RuleKind::JobProvidedBySystem => {
                format!("{} is provided by the system", dep(info.dep))
            }
            RuleKind::JobUnknownPackage => {
                format!("package {} does not exist", dep(info.dep))
            }
            RuleKind::JobUnsupported => "unsupported request".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{PackageData, Pool, RelOp};

    struct Builder {
        pool: Pool,
        repo: crate::pool::RepoId,
    }

    impl Builder {
        fn new() -> Self {
            let mut pool = Pool::new();
            pool.set_arch("x86_64");
            let repo = pool.add_repo("test", false);
            Self { pool, repo }
        }

        fn pkg(&mut self, name: &str, evr: &str, requires: &[&str], conflicts: &[&str]) -> PackageId {
            let requires = requires
                .iter()
                .map(|r| self.pool.parse_dep(r).unwrap())
                .collect();
            let conflicts = conflicts
                .iter()
                .map(|c| self.pool.parse_dep(c).unwrap())
                .collect();
            let data = PackageData {
                name: self.pool.intern(name),
                evr: self.pool.intern(evr),
                arch: self.pool.intern("x86_64"),
                requires,
                conflicts,
                ..Default::default()
            };
            self.pool.add_package(self.repo, data)
        }

        fn done(mut self) -> Pool {
            self.pool.prepare();
            self.pool
        }
    }

    #[test]
    fn test_simple_chain_installs() {
        let mut b = Builder::new();
        let app = b.pkg("app", "1-1", &["libfoo"], &[]);
        let lib = b.pkg("libfoo", "2-1", &[], &[]);
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install(app);
        assert_eq!(solver.solve(&job), 0);
        assert!(solver.decision_level(app) > 0);
        assert!(solver.decision_level(lib) > 0);
    }

    #[test]
    fn test_missing_dep_reports_nothing_provides() {
        let mut b = Builder::new();
        let app = b.pkg("app", "1-1", &["libmissing >= 2.0"], &[]);
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install(app);
        assert_eq!(solver.solve(&job), 1);
        assert_eq!(solver.decision_level(app), 0);
        let rules = solver.problems()[0].rules();
        assert!(rules
            .iter()
            .any(|r| r.kind == RuleKind::PkgNothingProvidesDep && r.source == Some(app)));
    }

    #[test]
    fn test_weak_install_failure_is_silent() {
        let mut b = Builder::new();
        let broken = b.pkg("broken", "1-1", &["nope"], &[]);
        let fine = b.pkg("fine", "1-1", &[], &[]);
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.weak_install(broken);
        job.weak_install(fine);
        assert_eq!(solver.solve(&job), 0);
        assert_eq!(solver.decision_level(broken), 0);
        assert!(solver.decision_level(fine) > 0);
    }

    #[test]
    fn test_conflict_between_closure_members() {
        let mut b = Builder::new();
        let app = b.pkg("app", "1-1", &["liba", "libb"], &[]);
        b.pkg("liba", "1-1", &[], &["libb"]);
        b.pkg("libb", "1-1", &[], &[]);
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install(app);
        assert_eq!(solver.solve(&job), 1);
        let rules = solver.problems()[0].rules();
        assert!(rules.iter().any(|r| r.kind == RuleKind::PkgConflicts));
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let mut b = Builder::new();
        let a = b.pkg("a", "1-1", &["b"], &[]);
        let bb = b.pkg("b", "1-1", &["a"], &[]);
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install(a);
        assert_eq!(solver.solve(&job), 0);
        assert!(solver.decision_level(bb) > 0);
    }

    #[test]
    fn test_backtracks_to_workable_provider() {
        let mut b = Builder::new();
        // Both providers of cap are considered; the first is broken.
        let app = b.pkg("app", "1-1", &["cap"], &[]);
        let broken = {
            let prov = b.pool.dep_version("cap", RelOp::Eq, "1");
            let req = b.pool.parse_dep("missing").unwrap();
            let data = PackageData {
                name: b.pool.intern("provider-broken"),
                evr: b.pool.intern("1-1"),
                arch: b.pool.intern("x86_64"),
                provides: vec![prov],
                requires: vec![req],
                ..Default::default()
            };
            b.pool.add_package(b.repo, data)
        };
        let good = {
            let prov = b.pool.dep_version("cap", RelOp::Eq, "1");
            let data = PackageData {
                name: b.pool.intern("provider-good"),
                evr: b.pool.intern("1-1"),
                arch: b.pool.intern("x86_64"),
                provides: vec![prov],
                ..Default::default()
            };
            b.pool.add_package(b.repo, data)
        };
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install(app);
        assert_eq!(solver.solve(&job), 0);
        assert_eq!(solver.decision_level(broken), 0);
        assert!(solver.decision_level(good) > 0);
    }

    #[test]
    fn test_same_name_cannot_coexist() {
        let mut b = Builder::new();
        let app = b.pkg("app", "1-1", &["tool = 1", "tool = 2"], &[]);
        b.pkg("tool", "1-1", &[], &[]);
        b.pkg("tool", "2-1", &[], &[]);
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install(app);
        assert_eq!(solver.solve(&job), 1);
        let rules = solver.problems()[0].rules();
        assert!(rules.iter().any(|r| r.kind == RuleKind::PkgSameName));
    }

    #[test]
    fn test_install_by_name_picks_matching_arch() {
        let mut b = Builder::new();
        let data = PackageData {
            name: b.pool.intern("rpm"),
            evr: b.pool.intern("4.19-1"),
            arch: b.pool.intern("i686"),
            ..Default::default()
        };
        let compat = b.pool.add_package(b.repo, data);
        let native = b.pkg("rpm", "4.19-1", &[], &[]);
        let mut pool = b.done();
        let pin = pool.dep_arch("rpm", "x86_64");
        pool.prepare();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install_name(pin);
        assert_eq!(solver.solve(&job), 0);
        assert!(solver.decision_level(native) > 0);
        assert_eq!(solver.decision_level(compat), 0);
    }

    #[test]
    fn test_solve_resets_previous_state() {
        let mut b = Builder::new();
        let a = b.pkg("a", "1-1", &[], &[]);
        let c = b.pkg("c", "1-1", &[], &[]);
        let pool = b.done();

        let mut solver = Solver::new(&pool);
        let mut job = Job::new();
        job.install(a);
        assert_eq!(solver.solve(&job), 0);
        assert!(solver.decision_level(a) > 0);

        let mut job = Job::new();
        job.install(c);
        assert_eq!(solver.solve(&job), 0);
        assert_eq!(solver.decision_level(a), 0);
        assert!(solver.decision_level(c) > 0);
    }
}
