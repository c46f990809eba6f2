// src/repo/debian.rs

//! Debian `Packages` index loader
//!
//! Parses the control-stanza format: one paragraph per package, fields
//! folded over continuation lines, relation fields separated by commas.
//! Only the fields that matter for installability are read.

use std::io::{BufRead, BufReader, Read};

use crate::error::{Error, Result};
use crate::pool::{DepId, PackageData, Pool, RelOp, RepoId};

/// Load a `Packages` stream into the given repository.
pub fn load(pool: &mut Pool, repo: RepoId, reader: impl Read) -> Result<()> {
    let reader = BufReader::new(reader);
    let mut stanza: Vec<(String, String)> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            if !stanza.is_empty() {
                finish_stanza(pool, repo, &stanza)?;
                stanza.clear();
            }
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation of the previous field.
            if let Some((_, value)) = stanza.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| Error::Parse(format!("malformed control line `{line}`")))?;
        stanza.push((key.to_string(), value.trim().to_string()));
    }
    if !stanza.is_empty() {
        finish_stanza(pool, repo, &stanza)?;
    }
    Ok(())
}

fn finish_stanza(pool: &mut Pool, repo: RepoId, stanza: &[(String, String)]) -> Result<()> {
    let field = |name: &str| {
        stanza
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    };

    let name = match field("Package") {
        Some(n) => n,
        None => return Err(Error::Parse("control stanza without Package field".into())),
    };
    let version = field("Version").unwrap_or("");
    let arch = field("Architecture").unwrap_or("all");

    let mut requires = parse_relations(pool, field("Depends"))?;
    requires.extend(parse_relations(pool, field("Pre-Depends"))?);
    let mut conflicts = parse_relations(pool, field("Conflicts"))?;
    conflicts.extend(parse_relations(pool, field("Breaks"))?);
    let provides = parse_relations(pool, field("Provides"))?;
    let obsoletes = parse_relations(pool, field("Replaces"))?;
    let recommends = parse_relations(pool, field("Recommends"))?;

    let data = PackageData {
        name: pool.intern(name),
        evr: pool.intern(version),
        arch: pool.intern(arch),
        provides,
        requires,
        conflicts,
        obsoletes,
        recommends,
        files: Vec::new(),
    };
    pool.add_package(repo, data);
    Ok(())
}

// "libc6 (>= 2.34), debconf (>= 0.5) | debconf-2.0": one dep per comma
// group; of an alternative list only the first entry is recorded.
fn parse_relations(pool: &mut Pool, field: Option<&str>) -> Result<Vec<DepId>> {
    let mut deps = Vec::new();
    let field = match field {
        Some(f) => f,
        None => return Ok(deps),
    };
    for group in field.split(',') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let first = group.split('|').next().unwrap_or(group).trim();
        deps.push(parse_relation(pool, first)?);
    }
    Ok(deps)
}

fn parse_relation(pool: &mut Pool, s: &str) -> Result<DepId> {
    let (name, rest) = match s.split_once('(') {
        Some((name, rest)) => (name.trim(), Some(rest)),
        None => (s.trim(), None),
    };
    // Multi-arch qualifiers are not part of the capability name.
    let name = name.strip_suffix(":any").unwrap_or(name);
    match rest {
        None => Ok(pool.dep_plain(name)),
        Some(rest) => {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| Error::Parse(format!("unterminated version relation `{s}`")))?;
            let mut parts = inner.split_whitespace();
            let op = parts
                .next()
                .ok_or_else(|| Error::Parse(format!("empty version relation `{s}`")))?;
            let ver = parts
                .next()
                .ok_or_else(|| Error::Parse(format!("relation `{s}` has no version")))?;
            // dpkg spells strict comparisons << and >>.
            let op = match op {
                "<<" => RelOp::Lt,
                ">>" => RelOp::Gt,
                other => RelOp::parse(other)?,
            };
            Ok(pool.dep_version(name, op, ver))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGES: &str = "\
Package: nginx
Version: 1.24.0-2
Architecture: amd64
Depends: libc6 (>= 2.34), libssl3 (>= 3.0.0) | libssl1.1
Provides: httpd
Description: small and powerful web server
 extended description over
 several lines

Package: libc6
Version: 2.38-3
Architecture: amd64

Package: tzdata
Version: 2024a-1
Architecture: all
";

    #[test]
    fn test_load_packages() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("debian", false);
        load(&mut pool, repo, PACKAGES.as_bytes()).unwrap();
        pool.prepare();

        assert_eq!(pool.npackages(), 3);
        let (nginx, pkg) = pool.packages().next().unwrap();
        assert_eq!(pool.package_str(nginx), "nginx-1.24.0-2.amd64");
        // Two Depends groups; the alternative only contributes its first entry.
        assert_eq!(pkg.requires.len(), 2);
        let libc = pool.dep_version("libc6", RelOp::Ge, "2.34");
        assert_eq!(pool.whatprovides(libc).len(), 1);
    }

    #[test]
    fn test_unversioned_provides() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("debian", false);
        load(&mut pool, repo, PACKAGES.as_bytes()).unwrap();
        pool.prepare();

        let httpd = pool.dep_plain("httpd");
        assert_eq!(pool.whatprovides(httpd).len(), 1);
    }

    #[test]
    fn test_dpkg_operator_spellings() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("debian", false);
        let input = "Package: a\nVersion: 1\nArchitecture: amd64\nDepends: b (<< 2), c (>> 1)\n";
        load(&mut pool, repo, input.as_bytes()).unwrap();
        let (_, pkg) = pool.packages().next().unwrap();
        assert_eq!(pkg.requires.len(), 2);
    }
}
