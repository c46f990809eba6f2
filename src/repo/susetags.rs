// src/repo/susetags.rs

//! SUSE susetags loader
//!
//! The `packages` file is line-oriented: `=Pkg:` starts a package with
//! `name version release arch`, and `+Tag:`/`-Tag:` pairs bracket
//! dependency sections with one relation per line.

use std::io::{BufRead, BufReader, Read};

use crate::error::{Error, Result};
use crate::pool::{DepId, PackageData, Pool, RepoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Requires,
    Provides,
    Conflicts,
    Obsoletes,
    Recommends,
}

#[derive(Default)]
struct PkgBuilder {
    name: String,
    evr: String,
    arch: String,
    provides: Vec<DepId>,
    requires: Vec<DepId>,
    conflicts: Vec<DepId>,
    obsoletes: Vec<DepId>,
    recommends: Vec<DepId>,
}

/// Load a susetags `packages` stream into the given repository.
pub fn load(pool: &mut Pool, repo: RepoId, reader: impl Read) -> Result<()> {
    let reader = BufReader::new(reader);
    let mut pkg: Option<PkgBuilder> = None;
    let mut section: Option<Section> = None;

    for line in reader.lines() {
        let line = line?;
        if let Some(rest) = line.strip_prefix("=Pkg:") {
            if let Some(p) = pkg.take() {
                finish_package(pool, repo, p)?;
            }
            pkg = Some(start_package(rest)?);
            section = None;
            continue;
        }
        if let Some(tag) = line.strip_prefix('+') {
            section = match tag.trim_end_matches(':') {
                "Req" | "Prq" => Some(Section::Requires),
                "Prv" => Some(Section::Provides),
                "Con" => Some(Section::Conflicts),
                "Obs" => Some(Section::Obsoletes),
                "Rec" => Some(Section::Recommends),
                _ => None,
            };
            continue;
        }
        if line.starts_with('-') {
            section = None;
            continue;
        }
        if let (Some(p), Some(s)) = (pkg.as_mut(), section) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let dep = pool.parse_dep(line)?;
            match s {
                Section::Requires => p.requires.push(dep),
                Section::Provides => p.provides.push(dep),
                Section::Conflicts => p.conflicts.push(dep),
                Section::Obsoletes => p.obsoletes.push(dep),
                Section::Recommends => p.recommends.push(dep),
            }
        }
    }
    if let Some(p) = pkg.take() {
        finish_package(pool, repo, p)?;
    }
    Ok(())
}

fn start_package(rest: &str) -> Result<PkgBuilder> {
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(Error::Parse(format!("malformed =Pkg: line `{rest}`")));
    }
    Ok(PkgBuilder {
        name: fields[0].to_string(),
        evr: format!("{}-{}", fields[1], fields[2]),
        arch: fields[3].to_string(),
        ..Default::default()
    })
}

fn finish_package(pool: &mut Pool, repo: RepoId, p: PkgBuilder) -> Result<()> {
    let data = PackageData {
        name: pool.intern(&p.name),
        evr: pool.intern(&p.evr),
        arch: pool.intern(&p.arch),
        provides: p.provides,
        requires: p.requires,
        conflicts: p.conflicts,
        obsoletes: p.obsoletes,
        recommends: p.recommends,
        files: Vec::new(),
    };
    pool.add_package(repo, data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::RelOp;

    const PACKAGES: &str = "\
=Ver: 2.0
=Pkg: vim 9.0 1.1 x86_64
+Req:
libncurses6 >= 6.0
/bin/sh
-Req:
+Prv:
vi
-Prv:
=Pkg: libncurses6 6.4 2.1 x86_64
";

    #[test]
    fn test_load_susetags() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("suse", false);
        load(&mut pool, repo, PACKAGES.as_bytes()).unwrap();
        pool.prepare();

        assert_eq!(pool.npackages(), 2);
        let (vim, pkg) = pool.packages().next().unwrap();
        assert_eq!(pool.package_str(vim), "vim-9.0-1.1.x86_64");
        assert_eq!(pkg.requires.len(), 2);

        let dep = pool.dep_version("libncurses6", RelOp::Ge, "6.0");
        assert_eq!(pool.whatprovides(dep).len(), 1);
        let vi = pool.dep_plain("vi");
        assert_eq!(pool.whatprovides(vi).len(), 1);
    }

    #[test]
    fn test_src_packages_kept_with_arch() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("suse", false);
        let input = "=Pkg: vim 9.0 1.1 src\n";
        load(&mut pool, repo, input.as_bytes()).unwrap();
        let (p, _) = pool.packages().next().unwrap();
        assert!(pool.is_source(p));
    }
}
