// src/repo/arch_repo.rs

//! Arch repository database loader
//!
//! A `.db.tar` archive holds one directory per package with `desc` and
//! (older databases) `depends` members. Both use the same `%SECTION%`
//! block format; newer databases fold the dependency sections into
//! `desc` directly, so the two files are simply concatenated before
//! parsing.

use std::collections::BTreeMap;
use std::io::Read;

use tar::Archive;

use crate::error::{Error, Result};
use crate::pool::{DepId, PackageData, Pool, RelOp, RepoId};

/// Load a `.db.tar` stream into the given repository.
pub fn load(pool: &mut Pool, repo: RepoId, reader: impl Read) -> Result<()> {
    let mut archive = Archive::new(reader);
    // Entry order inside the tar is arbitrary; collect per-package text
    // first. BTreeMap keeps package order stable across runs.
    let mut entries: BTreeMap<String, String> = BTreeMap::new();

    for entry in archive.entries().map_err(tar_err)? {
        let mut entry = entry.map_err(tar_err)?;
        let (dir, member) = {
            let path = entry.path().map_err(tar_err)?;
            let mut components = path.components();
            let dir = match components.next() {
                Some(c) => c.as_os_str().to_string_lossy().into_owned(),
                None => continue,
            };
            let member = match components.next() {
                Some(c) => c.as_os_str().to_string_lossy().into_owned(),
                None => continue, // the package directory itself
            };
            (dir, member)
        };
        if member != "desc" && member != "depends" {
            continue;
        }
        let mut text = String::new();
        entry.read_to_string(&mut text).map_err(tar_err)?;
        let slot = entries.entry(dir).or_default();
        slot.push_str(&text);
        slot.push('\n');
    }

    for (dir, text) in entries {
        add_package(pool, repo, &dir, &text)?;
    }
    Ok(())
}

fn tar_err(e: impl std::fmt::Display) -> Error {
    Error::Parse(format!("invalid Arch database: {e}"))
}

fn add_package(pool: &mut Pool, repo: RepoId, dir: &str, text: &str) -> Result<()> {
    let mut name = String::new();
    let mut version = String::new();
    let mut arch = String::new();
    let mut provides = Vec::new();
    let mut requires = Vec::new();
    let mut conflicts = Vec::new();
    let mut obsoletes = Vec::new();

    let mut section = String::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('%') && line.ends_with('%') && line.len() > 2 {
            section = line[1..line.len() - 1].to_string();
            continue;
        }
        match section.as_str() {
            "NAME" => name = line.to_string(),
            "VERSION" => version = line.to_string(),
            "ARCH" => arch = line.to_string(),
            "DEPENDS" => requires.push(parse_dep(pool, line)?),
            "PROVIDES" => provides.push(parse_dep(pool, line)?),
            "CONFLICTS" => conflicts.push(parse_dep(pool, line)?),
            "REPLACES" => obsoletes.push(parse_dep(pool, line)?),
            _ => {}
        }
    }

    if name.is_empty() || version.is_empty() {
        return Err(Error::Parse(format!(
            "Arch database entry `{dir}` lacks %NAME% or %VERSION%"
        )));
    }
    let data = PackageData {
        name: pool.intern(&name),
        evr: pool.intern(&version),
        arch: pool.intern(if arch.is_empty() { "any" } else { &arch }),
        provides,
        requires,
        conflicts,
        obsoletes,
        recommends: Vec::new(),
        files: Vec::new(),
    };
    pool.add_package(repo, data);
    Ok(())
}

// Arch relations are written without spaces: `glibc>=2.38`. An optional
// description after `: ` is dropped.
fn parse_dep(pool: &mut Pool, line: &str) -> Result<DepId> {
    let line = match line.split_once(": ") {
        Some((dep, _desc)) => dep,
        None => line,
    };
    for op_str in [">=", "<=", "=", ">", "<"] {
        if let Some(pos) = line.find(op_str) {
            let name = &line[..pos];
            let ver = &line[pos + op_str.len()..];
            if name.is_empty() || ver.is_empty() {
                return Err(Error::Parse(format!("malformed Arch relation `{line}`")));
            }
            let op = RelOp::parse(op_str)?;
            return Ok(pool.dep_version(name, op, ver));
        }
    }
    Ok(pool.dep_plain(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_db() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut add = |path: &str, content: &str| {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        };
        add(
            "pacman-6.1.0-1/desc",
            "%NAME%\npacman\n\n%VERSION%\n6.1.0-1\n\n%ARCH%\nx86_64\n",
        );
        add(
            "pacman-6.1.0-1/depends",
            "%DEPENDS%\nglibc\nlibarchive>=3.7\n\n%PROVIDES%\nlibalpm.so=14\n",
        );
        add(
            "glibc-2.39-1/desc",
            "%NAME%\nglibc\n\n%VERSION%\n2.39-1\n\n%ARCH%\nx86_64\n",
        );
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_load_db_tar() {
        let mut pool = Pool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("core", false);
        load(&mut pool, repo, build_db().as_slice()).unwrap();
        pool.prepare();

        assert_eq!(pool.npackages(), 2);
        let glibc = pool.dep_plain("glibc");
        assert_eq!(pool.whatprovides(glibc).len(), 1);
        let alpm = pool.dep_version("libalpm.so", RelOp::Eq, "14");
        assert_eq!(pool.whatprovides(alpm).len(), 1);
    }

    #[test]
    fn test_parse_dep_spellings() {
        let mut pool = Pool::new();
        assert!(parse_dep(&mut pool, "glibc").is_ok());
        assert!(parse_dep(&mut pool, "libarchive>=3.7").is_ok());
        assert!(parse_dep(&mut pool, "sh: the shell").is_ok());
        assert!(parse_dep(&mut pool, ">=1.0").is_err());
    }
}
