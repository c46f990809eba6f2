// src/pool/mod.rs

//! The package universe
//!
//! Everything the checker and the solver look at lives here: interned
//! strings, packages with their relation lists, the repositories they
//! came from, and the capability → providers index. The pool is built up
//! by the repository loaders, sealed with [`Pool::prepare`], and treated
//! as read-only from then on.
//!
//! Names, versions, architectures and capabilities are referenced by
//! integer handle everywhere so that the hot comparisons in the pruning
//! loop are integer comparisons.

pub mod dep;

use std::collections::HashMap;

pub use dep::{Dep, DepRel, RelOp};

use crate::arch::{self, ArchPolicy};
use crate::version::evrcmp;

/// Handle of an interned string.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

/// Handle of an interned dependency relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId(u32);

/// Handle of a package. Valid for the lifetime of the pool; never
/// reused or invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a loaded repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepoId(u32);

#[derive(Default)]
struct Interner {
    strings: Vec<String>,
    ids: HashMap<String, StringId>,
}

impl Interner {
    fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        id
    }

    fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.0 as usize]
    }
}

/// One repository's identity within the pool.
#[derive(Debug, Clone)]
pub struct Repository {
    pub name: String,
    /// Background repositories satisfy dependencies but their packages
    /// are never audited (`--nocheck`).
    pub background: bool,
}

/// An immutable package record.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: StringId,
    pub evr: StringId,
    pub arch: StringId,
    pub repo: RepoId,
    pub provides: Vec<DepId>,
    pub requires: Vec<DepId>,
    pub conflicts: Vec<DepId>,
    pub obsoletes: Vec<DepId>,
    pub recommends: Vec<DepId>,
    pub files: Vec<StringId>,
}

/// Loader-side package description handed to [`Pool::add_package`].
#[derive(Debug, Default, Clone)]
pub struct PackageData {
    pub name: StringId,
    pub evr: StringId,
    pub arch: StringId,
    pub provides: Vec<DepId>,
    pub requires: Vec<DepId>,
    pub conflicts: Vec<DepId>,
    pub obsoletes: Vec<DepId>,
    pub recommends: Vec<DepId>,
    pub files: Vec<StringId>,
}

/// The package universe for one run.
pub struct Pool {
    strings: Interner,
    deps: Vec<Dep>,
    dep_ids: HashMap<Dep, DepId>,
    packages: Vec<Package>,
    repos: Vec<Repository>,
    /// provides-name → providers, built by `prepare()`.
    whatprovides: HashMap<StringId, Vec<PackageId>>,
    /// arch string → chain score, cached per distinct arch by `prepare()`.
    arch_scores: HashMap<StringId, Option<usize>>,
    policy: Option<ArchPolicy>,
    target_arch: Option<StringId>,
    /// Obsoletes match any provider, not just name/evr matches.
    pub obsolete_uses_provides: bool,
    /// Obsoletes only match packages of an overlapping 32/64-bit color.
    pub obsolete_uses_colors: bool,
}

impl Pool {
    pub fn new() -> Self {
        Self {
            strings: Interner::default(),
            deps: Vec::new(),
            dep_ids: HashMap::new(),
            packages: Vec::new(),
            repos: Vec::new(),
            whatprovides: HashMap::new(),
            arch_scores: HashMap::new(),
            policy: None,
            target_arch: None,
            obsolete_uses_provides: false,
            obsolete_uses_colors: false,
        }
    }

    /// Set the target architecture the audit runs against.
    pub fn set_arch(&mut self, target: &str) {
        self.policy = Some(ArchPolicy::new(target));
        self.target_arch = Some(self.strings.intern(target));
        self.arch_scores.clear();
    }

    pub fn target_arch(&self) -> Option<StringId> {
        self.target_arch
    }

    // ---- interning ----------------------------------------------------

    pub fn intern(&mut self, s: &str) -> StringId {
        self.strings.intern(s)
    }

    pub fn str(&self, id: StringId) -> &str {
        self.strings.resolve(id)
    }

    pub fn add_dep(&mut self, dep: Dep) -> DepId {
        if let Some(&id) = self.dep_ids.get(&dep) {
            return id;
        }
        let id = DepId(self.deps.len() as u32);
        self.deps.push(dep);
        self.dep_ids.insert(dep, id);
        id
    }

    pub fn dep(&self, id: DepId) -> &Dep {
        &self.deps[id.0 as usize]
    }

    /// Intern a bare capability name.
    pub fn dep_plain(&mut self, name: &str) -> DepId {
        let name = self.strings.intern(name);
        self.add_dep(Dep { name, rel: None })
    }

    /// Intern a versioned capability.
    pub fn dep_version(&mut self, name: &str, op: RelOp, evr: &str) -> DepId {
        let name = self.strings.intern(name);
        let evr = self.strings.intern(evr);
        self.add_dep(Dep {
            name,
            rel: Some(DepRel::Version(op, evr)),
        })
    }

    /// Intern a name-at-architecture selection (the package-manager pin).
    pub fn dep_arch(&mut self, name: &str, target: &str) -> DepId {
        let name = self.strings.intern(name);
        let target = self.strings.intern(target);
        self.add_dep(Dep {
            name,
            rel: Some(DepRel::Arch(target)),
        })
    }

    /// Parse a textual relation like `libfoo >= 2.1` or `bash`.
    /// Used by the text-based repository formats.
    pub fn parse_dep(&mut self, s: &str) -> crate::error::Result<DepId> {
        let mut parts = s.split_whitespace();
        let name = match parts.next() {
            Some(n) => n,
            None => return Err(crate::error::Error::Parse("empty dependency".into())),
        };
        match (parts.next(), parts.next()) {
            (None, _) => Ok(self.dep_plain(name)),
            (Some(op), Some(evr)) => {
                let op = RelOp::parse(op)?;
                Ok(self.dep_version(name, op, evr))
            }
            (Some(op), None) => Err(crate::error::Error::Parse(format!(
                "dependency `{s}` has operator `{op}` but no version"
            ))),
        }
    }

    // ---- construction -------------------------------------------------

    pub fn add_repo(&mut self, name: &str, background: bool) -> RepoId {
        let id = RepoId(self.repos.len() as u32);
        self.repos.push(Repository {
            name: name.to_string(),
            background,
        });
        id
    }

    pub fn add_package(&mut self, repo: RepoId, data: PackageData) -> PackageId {
        let PackageData {
            name,
            evr,
            arch,
            mut provides,
            requires,
            conflicts,
            obsoletes,
            recommends,
            files,
        } = data;
        // Every package provides its own name at its own version.
        if !provides.iter().any(|&d| self.dep(d).name == name) {
            let self_prov = self.add_dep(Dep {
                name,
                rel: Some(DepRel::Version(RelOp::Eq, evr)),
            });
            provides.push(self_prov);
        }
        let id = PackageId(self.packages.len() as u32);
        self.packages.push(Package {
            name,
            evr,
            arch,
            repo,
            provides,
            requires,
            conflicts,
            obsoletes,
            recommends,
            files,
        });
        id
    }

    /// Turn file-path requirements into provides on the packages whose
    /// file lists contain them. Must run before `prepare()`.
    pub fn add_file_provides(&mut self) {
        let mut wanted: Vec<StringId> = Vec::new();
        for pkg in &self.packages {
            for &d in pkg
                .requires
                .iter()
                .chain(&pkg.conflicts)
                .chain(&pkg.obsoletes)
                .chain(&pkg.recommends)
            {
                let name = self.deps[d.0 as usize].name;
                if self.strings.resolve(name).starts_with('/') && !wanted.contains(&name) {
                    wanted.push(name);
                }
            }
        }
        if wanted.is_empty() {
            return;
        }
        for i in 0..self.packages.len() {
            let hits: Vec<StringId> = self.packages[i]
                .files
                .iter()
                .copied()
                .filter(|f| wanted.contains(f))
                .collect();
            for f in hits {
                let dep = self.add_dep(Dep { name: f, rel: None });
                if !self.packages[i].provides.contains(&dep) {
                    self.packages[i].provides.push(dep);
                }
            }
        }
    }

    /// Build the capability index and the per-arch score cache. Call
    /// once after all repositories are loaded; the pool is read-only
    /// afterwards.
    pub fn prepare(&mut self) {
        self.whatprovides.clear();
        for (i, pkg) in self.packages.iter().enumerate() {
            let id = PackageId(i as u32);
            for &d in &pkg.provides {
                let name = self.deps[d.0 as usize].name;
                let entry = self.whatprovides.entry(name).or_default();
                if entry.last() != Some(&id) {
                    entry.push(id);
                }
            }
        }
        self.arch_scores.clear();
        if let Some(policy) = &self.policy {
            for pkg in &self.packages {
                let arch = pkg.arch;
                if !self.arch_scores.contains_key(&arch) {
                    let score = policy.score(self.strings.resolve(arch));
                    self.arch_scores.insert(arch, score);
                }
            }
        }
    }

    // ---- queries ------------------------------------------------------

    pub fn npackages(&self) -> usize {
        self.packages.len()
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    /// Loader-side mutable access, for metadata extensions that arrive
    /// after the package record (rpm-md filelists). Not valid once
    /// `prepare()` has run.
    pub(crate) fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[id.index()]
    }

    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(i as u32), p))
    }

    pub fn repo(&self, id: RepoId) -> &Repository {
        &self.repos[id.0 as usize]
    }

    pub fn repo_of(&self, id: PackageId) -> &Repository {
        self.repo(self.package(id).repo)
    }

    /// All packages providing the bare capability name.
    pub fn providers_of_name(&self, name: StringId) -> &[PackageId] {
        self.whatprovides.get(&name).map_or(&[], |v| v.as_slice())
    }

    /// All packages whose provides satisfy the full relation.
    pub fn whatprovides(&self, dep: DepId) -> Vec<PackageId> {
        let want = self.deps[dep.0 as usize];
        match want.rel {
            Some(DepRel::Arch(arch)) => self
                .providers_of_name(want.name)
                .iter()
                .copied()
                .filter(|&p| {
                    let pkg = self.package(p);
                    pkg.name == want.name && pkg.arch == arch
                })
                .collect(),
            _ => self
                .providers_of_name(want.name)
                .iter()
                .copied()
                .filter(|&p| self.provides_dep(p, dep))
                .collect(),
        }
    }

    /// Does this package's provides list satisfy the relation?
    pub fn provides_dep(&self, p: PackageId, dep: DepId) -> bool {
        let want = self.deps[dep.0 as usize];
        let pkg = self.package(p);
        let (op, evr) = match want.rel {
            None => {
                return pkg
                    .provides
                    .iter()
                    .any(|&pd| self.deps[pd.0 as usize].name == want.name)
            }
            Some(DepRel::Version(op, evr)) => (op, evr),
            Some(DepRel::Arch(arch)) => return pkg.name == want.name && pkg.arch == arch,
        };
        let want_evr = self.strings.resolve(evr);
        pkg.provides.iter().any(|&pd| {
            let prov = &self.deps[pd.0 as usize];
            if prov.name != want.name {
                return false;
            }
            match prov.rel {
                // Unversioned provides do not satisfy versioned requires.
                None => false,
                Some(DepRel::Version(pop, pevr)) => {
                    dep::ranges_intersect(pop, self.strings.resolve(pevr), op, want_evr)
                }
                Some(DepRel::Arch(_)) => false,
            }
        })
    }

    /// Does `owner`'s obsoletes relation `obs` displace `victim`,
    /// honoring the configured matching modes?
    pub fn obsoletes_match(&self, owner: PackageId, obs: DepId, victim: PackageId) -> bool {
        if !self.provides_dep(victim, obs) {
            return false;
        }
        if !self.obsolete_uses_provides && !self.match_nevr(victim, obs) {
            return false;
        }
        if self.obsolete_uses_colors && !self.colormatch(owner, victim) {
            return false;
        }
        true
    }

    /// Does the package's own name/evr match the relation? Obsoletes are
    /// matched this way unless `obsolete_uses_provides` is set.
    pub fn match_nevr(&self, p: PackageId, dep: DepId) -> bool {
        let want = self.deps[dep.0 as usize];
        let pkg = self.package(p);
        if pkg.name != want.name {
            return false;
        }
        match want.rel {
            None => true,
            Some(DepRel::Version(op, evr)) => dep::evr_satisfies(
                self.strings.resolve(pkg.evr),
                op,
                self.strings.resolve(evr),
            ),
            Some(DepRel::Arch(arch)) => pkg.arch == arch,
        }
    }

    /// Packages selected by name (not by provides), honoring an arch or
    /// version qualifier. Job targets for the package-manager pin use
    /// this.
    pub fn select_by_name(&self, dep: DepId) -> Vec<PackageId> {
        let want = self.deps[dep.0 as usize];
        self.providers_of_name(want.name)
            .iter()
            .copied()
            .filter(|&p| self.package(p).name == want.name && self.match_nevr(p, dep))
            .collect()
    }

    /// Can the resolver install this package at all on the target?
    pub fn installable(&self, p: PackageId) -> bool {
        let pkg = self.package(p);
        let arch = self.strings.resolve(pkg.arch);
        if arch::is_source_arch(arch) {
            return false;
        }
        match (&self.policy, self.arch_scores.get(&pkg.arch)) {
            (None, _) => true,
            (Some(_), Some(score)) => score.is_some(),
            // Arch string not seen by prepare(); fall back to the policy.
            (Some(policy), None) => policy.score(arch).is_some(),
        }
    }

    pub fn is_source(&self, p: PackageId) -> bool {
        arch::is_source_arch(self.strings.resolve(self.package(p).arch))
    }

    pub fn is_noarch(&self, p: PackageId) -> bool {
        arch::is_noarch(self.strings.resolve(self.package(p).arch))
    }

    /// No observable difference an installer would act on: same identity
    /// and the same relation lists.
    pub fn identical(&self, a: PackageId, b: PackageId) -> bool {
        if a == b {
            return true;
        }
        let (pa, pb) = (self.package(a), self.package(b));
        pa.name == pb.name
            && pa.arch == pb.arch
            && evrcmp(self.strings.resolve(pa.evr), self.strings.resolve(pb.evr))
                == std::cmp::Ordering::Equal
            && pa.provides == pb.provides
            && pa.requires == pb.requires
            && pa.conflicts == pb.conflicts
            && pa.obsoletes == pb.obsoletes
            && pa.recommends == pb.recommends
    }

    /// Do the two packages' 32/64-bit colors overlap?
    pub fn colormatch(&self, a: PackageId, b: PackageId) -> bool {
        let ca = arch::color(self.strings.resolve(self.package(a).arch));
        let cb = arch::color(self.strings.resolve(self.package(b).arch));
        ca & cb != 0
    }

    // ---- rendering ----------------------------------------------------

    /// Identity string of a package: `name-evr.arch`.
    pub fn package_str(&self, p: PackageId) -> String {
        let pkg = self.package(p);
        format!(
            "{}-{}.{}",
            self.strings.resolve(pkg.name),
            self.strings.resolve(pkg.evr),
            self.strings.resolve(pkg.arch)
        )
    }

    /// Human-readable form of a dependency relation.
    pub fn dep_str(&self, dep: DepId) -> String {
        let d = self.deps[dep.0 as usize];
        let name = self.strings.resolve(d.name);
        match d.rel {
            None => name.to_string(),
            Some(DepRel::Version(op, evr)) => {
                format!("{} {} {}", name, op, self.strings.resolve(evr))
            }
            Some(DepRel::Arch(arch)) => format!("{}.{}", name, self.strings.resolve(arch)),
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(pool: &mut Pool, repo: RepoId, name: &str, evr: &str, arch: &str) -> PackageId {
        let data = PackageData {
            name: pool.intern(name),
            evr: pool.intern(evr),
            arch: pool.intern(arch),
            ..Default::default()
        };
        pool.add_package(repo, data)
    }

    #[test]
    fn test_interning_is_stable() {
        let mut pool = Pool::new();
        let a = pool.intern("glibc");
        let b = pool.intern("glibc");
        assert_eq!(a, b);
        assert_eq!(pool.str(a), "glibc");
    }

    #[test]
    fn test_self_provide_added() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("test", false);
        let p = pkg(&mut pool, repo, "bash", "5.2-1", "x86_64");
        pool.prepare();

        let dep = pool.dep_version("bash", RelOp::Ge, "5.0");
        assert_eq!(pool.whatprovides(dep), vec![p]);
    }

    #[test]
    fn test_unversioned_provide_does_not_satisfy_versioned_require() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("test", false);
        let prov = pool.dep_plain("webserver");
        let data = PackageData {
            name: pool.intern("nginx"),
            evr: pool.intern("1.24.0-1"),
            arch: pool.intern("x86_64"),
            provides: vec![prov],
            ..Default::default()
        };
        pool.add_package(repo, data);
        pool.prepare();

        let plain = pool.dep_plain("webserver");
        assert_eq!(pool.whatprovides(plain).len(), 1);
        let versioned = pool.dep_version("webserver", RelOp::Ge, "1.0");
        assert!(pool.whatprovides(versioned).is_empty());
    }

    #[test]
    fn test_whatprovides_versioned() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("test", false);
        pkg(&mut pool, repo, "libfoo", "1.0-1", "x86_64");
        let newer = pkg(&mut pool, repo, "libfoo", "2.0-1", "x86_64");
        pool.prepare();

        let dep = pool.dep_version("libfoo", RelOp::Ge, "1.5");
        assert_eq!(pool.whatprovides(dep), vec![newer]);
    }

    #[test]
    fn test_installable_respects_arch_chain() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("test", false);
        let native = pkg(&mut pool, repo, "a", "1-1", "x86_64");
        let compat = pkg(&mut pool, repo, "b", "1-1", "i686");
        let foreign = pkg(&mut pool, repo, "c", "1-1", "s390x");
        let noarch = pkg(&mut pool, repo, "d", "1-1", "noarch");
        let source = pkg(&mut pool, repo, "e", "1-1", "src");
        pool.prepare();

        assert!(pool.installable(native));
        assert!(pool.installable(compat));
        assert!(!pool.installable(foreign));
        assert!(pool.installable(noarch));
        assert!(!pool.installable(source));
    }

    #[test]
    fn test_match_nevr() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("test", false);
        let p = pkg(&mut pool, repo, "kernel", "6.1.0-3", "x86_64");
        pool.prepare();

        let hit = pool.dep_version("kernel", RelOp::Lt, "6.2");
        let miss = pool.dep_version("kernel", RelOp::Lt, "6.0");
        let other = pool.dep_version("kernel-devel", RelOp::Lt, "6.2");
        assert!(pool.match_nevr(p, hit));
        assert!(!pool.match_nevr(p, miss));
        assert!(!pool.match_nevr(p, other));
    }

    #[test]
    fn test_file_provides() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("test", false);
        let sh = pool.intern("/bin/sh");
        let data = PackageData {
            name: pool.intern("bash"),
            evr: pool.intern("5.2-1"),
            arch: pool.intern("x86_64"),
            files: vec![sh],
            ..Default::default()
        };
        let bash = pool.add_package(repo, data);

        let needs_sh = pool.dep_plain("/bin/sh");
        let data = PackageData {
            name: pool.intern("scriptlet"),
            evr: pool.intern("1-1"),
            arch: pool.intern("noarch"),
            requires: vec![needs_sh],
            ..Default::default()
        };
        pool.add_package(repo, data);

        pool.add_file_provides();
        pool.prepare();
        assert_eq!(pool.whatprovides(needs_sh), vec![bash]);
    }

    #[test]
    fn test_identical_ignores_handle_but_not_relations() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("a", false);
        let other = pool.add_repo("b", true);
        let p1 = pkg(&mut pool, repo, "tool", "1.0-1", "x86_64");
        let p2 = pkg(&mut pool, other, "tool", "1.0-1", "x86_64");
        let req = pool.dep_plain("libc");
        let data = PackageData {
            name: pool.intern("tool"),
            evr: pool.intern("1.0-1"),
            arch: pool.intern("x86_64"),
            requires: vec![req],
            ..Default::default()
        };
        let p3 = pool.add_package(repo, data);
        pool.prepare();

        assert!(pool.identical(p1, p2));
        assert!(!pool.identical(p1, p3));
    }

    #[test]
    fn test_package_str() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("test", false);
        let p = pkg(&mut pool, repo, "bash", "5.2-1", "x86_64");
        assert_eq!(pool.package_str(p), "bash-5.2-1.x86_64");
    }
}
