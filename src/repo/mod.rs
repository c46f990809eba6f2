// src/repo/mod.rs

//! Repository loading
//!
//! One loader per supported metadata format, all feeding the same pool.
//! The format is chosen from the file name with any compression suffix
//! stripped; anything unrecognized is treated as the native serialized
//! format, which is also what stdin carries.

pub mod arch_repo;
pub mod debian;
pub mod native;
pub mod rpmmd;
pub mod susetags;

use std::io::Read;

use crate::compression::strip_suffix;
use crate::error::Result;
use crate::pool::{Pool, RepoId};

/// Detected repository metadata format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoFormat {
    /// rpm-md `primary.xml`, optionally extended by `filelists.xml`
    RpmMd,
    /// Debian `Packages` control stanzas
    Debian,
    /// SUSE susetags `packages` file
    Susetags,
    /// Arch `.db.tar` database
    ArchDb,
    /// Native serialized repository (CBOR)
    Native,
}

impl RepoFormat {
    /// Pick the loader for a repository argument.
    pub fn detect(path: &str) -> Self {
        let stem = strip_suffix(path);
        if stem.ends_with("primary.xml") {
            RepoFormat::RpmMd
        } else if stem.ends_with("Packages") {
            RepoFormat::Debian
        } else if stem.ends_with("packages") {
            RepoFormat::Susetags
        } else if stem.ends_with(".db.tar") {
            RepoFormat::ArchDb
        } else {
            RepoFormat::Native
        }
    }
}

/// Does this argument name an rpm-md filelists extension? Such a file is
/// only meaningful directly after a `primary.xml` argument.
pub fn is_filelists(path: &str) -> bool {
    strip_suffix(path).ends_with("filelists.xml")
}

/// Load one repository stream into the pool.
pub fn load(pool: &mut Pool, repo: RepoId, format: RepoFormat, reader: Box<dyn Read>) -> Result<()> {
    match format {
        RepoFormat::RpmMd => rpmmd::load_primary(pool, repo, reader),
        RepoFormat::Debian => debian::load(pool, repo, reader),
        RepoFormat::Susetags => susetags::load(pool, repo, reader),
        RepoFormat::ArchDb => arch_repo::load(pool, repo, reader),
        RepoFormat::Native => native::load(pool, repo, reader),
    }
}
