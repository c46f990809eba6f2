// src/repo/rpmmd.rs

//! rpm-md repository loader
//!
//! Streams a `primary.xml` package index into the pool. A
//! `filelists.xml` extension can be merged afterwards so that file-path
//! dependencies (`/usr/bin/env` and friends) find their providers.

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::pool::{DepId, PackageData, PackageId, Pool, RelOp, RepoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
}

#[derive(Debug, Clone, Copy)]
enum TextField {
    Name,
    Arch,
    File,
}

#[derive(Default)]
struct PkgBuilder {
    name: String,
    arch: String,
    evr: String,
    provides: Vec<DepId>,
    requires: Vec<DepId>,
    conflicts: Vec<DepId>,
    obsoletes: Vec<DepId>,
    recommends: Vec<DepId>,
    files: Vec<String>,
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Parse(format!("invalid rpm-md XML: {e}"))
}

fn make_evr(epoch: &str, ver: &str, rel: &str) -> String {
    let mut s = String::new();
    if !epoch.is_empty() && epoch != "0" {
        s.push_str(epoch);
        s.push(':');
    }
    s.push_str(ver);
    if !rel.is_empty() {
        s.push('-');
        s.push_str(rel);
    }
    s
}

fn version_attrs(e: &BytesStart<'_>) -> Result<String> {
    let (mut epoch, mut ver, mut rel) = (String::new(), String::new(), String::new());
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?;
        match attr.key.local_name().as_ref() {
            b"epoch" => epoch = value.into_owned(),
            b"ver" => ver = value.into_owned(),
            b"rel" => rel = value.into_owned(),
            _ => {}
        }
    }
    Ok(make_evr(&epoch, &ver, &rel))
}

fn entry_dep(pool: &mut Pool, e: &BytesStart<'_>) -> Result<Option<DepId>> {
    let mut name = String::new();
    let mut flags = String::new();
    let (mut epoch, mut ver, mut rel) = (String::new(), String::new(), String::new());
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?;
        match attr.key.local_name().as_ref() {
            b"name" => name = value.into_owned(),
            b"flags" => flags = value.into_owned(),
            b"epoch" => epoch = value.into_owned(),
            b"ver" => ver = value.into_owned(),
            b"rel" => rel = value.into_owned(),
            _ => {}
        }
    }
    if name.is_empty() {
        return Ok(None);
    }
    let dep = if flags.is_empty() {
        pool.dep_plain(&name)
    } else {
        let op = RelOp::parse(&flags)?;
        pool.dep_version(&name, op, &make_evr(&epoch, &ver, &rel))
    };
    Ok(Some(dep))
}

fn file_kind_is_regular(e: &BytesStart<'_>) -> Result<bool> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.local_name().as_ref() == b"type" {
            let value = attr.unescape_value().map_err(xml_err)?;
            return Ok(value != "dir" && value != "ghost");
        }
    }
    Ok(true)
}

/// Load a `primary.xml` stream into the given repository.
pub fn load_primary(pool: &mut Pool, repo: RepoId, reader: impl Read) -> Result<()> {
    let mut reader = Reader::from_reader(BufReader::new(reader));
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut pkg: Option<PkgBuilder> = None;
    let mut section: Option<Section> = None;
    let mut text: Option<TextField> = None;
    let mut keep_file = true;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"package" => {
                    pkg = Some(PkgBuilder::default());
                    section = None;
                }
                b"name" if pkg.is_some() && section.is_none() => text = Some(TextField::Name),
                b"arch" if pkg.is_some() && section.is_none() => text = Some(TextField::Arch),
                b"version" if section.is_none() => {
                    if let Some(p) = pkg.as_mut() {
                        p.evr = version_attrs(&e)?;
                    }
                }
                b"provides" => section = Some(Section::Provides),
                b"requires" => section = Some(Section::Requires),
                b"conflicts" => section = Some(Section::Conflicts),
                b"obsoletes" => section = Some(Section::Obsoletes),
                b"recommends" => section = Some(Section::Recommends),
                b"entry" => {
                    if let (Some(p), Some(s)) = (pkg.as_mut(), section) {
                        if let Some(dep) = entry_dep(pool, &e)? {
                            match s {
                                Section::Provides => p.provides.push(dep),
                                Section::Requires => p.requires.push(dep),
                                Section::Conflicts => p.conflicts.push(dep),
                                Section::Obsoletes => p.obsoletes.push(dep),
                                Section::Recommends => p.recommends.push(dep),
                            }
                        }
                    }
                }
                b"file" if pkg.is_some() => {
                    keep_file = file_kind_is_regular(&e)?;
                    text = Some(TextField::File);
                }
                _ => {}
            },
            Event::Text(t) => {
                if let (Some(p), Some(field)) = (pkg.as_mut(), text) {
                    let value = t.unescape().map_err(xml_err)?;
                    match field {
                        TextField::Name => p.name = value.into_owned(),
                        TextField::Arch => p.arch = value.into_owned(),
                        TextField::File => {
                            if keep_file {
                                p.files.push(value.into_owned());
                            }
                        }
                    }
                }
                text = None;
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"package" => {
                    if let Some(p) = pkg.take() {
                        finish_package(pool, repo, p)?;
                    }
                }
                b"provides" | b"requires" | b"conflicts" | b"obsoletes" | b"recommends" => {
                    section = None;
                }
                b"name" | b"arch" | b"file" => text = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn finish_package(pool: &mut Pool, repo: RepoId, p: PkgBuilder) -> Result<()> {
    if p.name.is_empty() {
        return Err(Error::Parse("rpm-md package without a name".into()));
    }
    let files = p.files.iter().map(|f| pool.intern(f)).collect();
    let data = PackageData {
        name: pool.intern(&p.name),
        evr: pool.intern(&p.evr),
        arch: pool.intern(&p.arch),
        provides: p.provides,
        requires: p.requires,
        conflicts: p.conflicts,
        obsoletes: p.obsoletes,
        recommends: p.recommends,
        files,
    };
    pool.add_package(repo, data);
    Ok(())
}

/// Merge a `filelists.xml` stream into packages already loaded from the
/// matching `primary.xml`. Packages are matched by name, architecture
/// and evr; entries without a counterpart are ignored.
pub fn load_filelists(pool: &mut Pool, repo: RepoId, reader: impl Read) -> Result<()> {
    let mut index: HashMap<(String, String, String), PackageId> = HashMap::new();
    for (id, p) in pool.packages() {
        if p.repo == repo {
            index.insert(
                (
                    pool.str(p.name).to_string(),
                    pool.str(p.arch).to_string(),
                    pool.str(p.evr).to_string(),
                ),
                id,
            );
        }
    }

    let mut reader = Reader::from_reader(BufReader::new(reader));
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<(String, String, String)> = None;
    let mut in_file = false;
    let mut keep_file = true;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"package" => {
                    let (mut name, mut arch) = (String::new(), String::new());
                    for attr in e.attributes() {
                        let attr = attr.map_err(xml_err)?;
                        let value = attr.unescape_value().map_err(xml_err)?;
                        match attr.key.local_name().as_ref() {
                            b"name" => name = value.into_owned(),
                            b"arch" => arch = value.into_owned(),
                            _ => {}
                        }
                    }
                    current = Some((name, arch, String::new()));
                }
                b"version" => {
                    if let Some(c) = current.as_mut() {
                        c.2 = version_attrs(&e)?;
                    }
                }
                b"file" => {
                    keep_file = file_kind_is_regular(&e)?;
                    in_file = true;
                }
                _ => {}
            },
            Event::Text(t) => {
                if in_file && keep_file {
                    if let Some(c) = &current {
                        if let Some(&id) = index.get(c) {
                            let value = t.unescape().map_err(xml_err)?;
                            let file = pool.intern(&value);
                            let files = &mut pool.package_mut(id).files;
                            if !files.contains(&file) {
                                files.push(file);
                            }
                        }
                    }
                }
                in_file = false;
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"package" => current = None,
                b"file" => in_file = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}
