// src/repo/native.rs

//! Native serialized repository format
//!
//! A CBOR-encoded package list, used as the fallback when no metadata
//! format matches the file name and for repositories piped in on
//! stdin. `save` writes the same encoding, which keeps fixtures and
//! cached repositories cheap to produce.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pool::{DepId, PackageData, Pool, RepoId};

/// Serialized form of one repository.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NativeRepo {
    pub packages: Vec<NativePackage>,
}

/// Serialized form of one package. Relations use the textual
/// `name [op evr]` form.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NativePackage {
    pub name: String,
    pub evr: String,
    pub arch: String,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub obsoletes: Vec<String>,
    #[serde(default)]
    pub recommends: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Load a native repository stream into the given repository.
pub fn load(pool: &mut Pool, repo: RepoId, reader: impl Read) -> Result<()> {
    let native: NativeRepo = ciborium::de::from_reader(reader)
        .map_err(|e| Error::Parse(format!("invalid native repository: {e}")))?;
    for p in native.packages {
        let provides = parse_list(pool, &p.provides)?;
        let requires = parse_list(pool, &p.requires)?;
        let conflicts = parse_list(pool, &p.conflicts)?;
        let obsoletes = parse_list(pool, &p.obsoletes)?;
        let recommends = parse_list(pool, &p.recommends)?;
        let files = p.files.iter().map(|f| pool.intern(f)).collect();
        let data = PackageData {
            name: pool.intern(&p.name),
            evr: pool.intern(&p.evr),
            arch: pool.intern(&p.arch),
            provides,
            requires,
            conflicts,
            obsoletes,
            recommends,
            files,
        };
        pool.add_package(repo, data);
    }
    Ok(())
}

fn parse_list(pool: &mut Pool, list: &[String]) -> Result<Vec<DepId>> {
    list.iter().map(|d| pool.parse_dep(d)).collect()
}

/// Write a repository in the native encoding.
pub fn save(native: &NativeRepo, writer: impl Write) -> Result<()> {
    ciborium::ser::into_writer(native, writer)
        .map_err(|e| Error::Parse(format!("could not encode repository: {e}")))
}
