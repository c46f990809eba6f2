// src/version.rs

//! Version handling for package dependencies
//!
//! This module provides parsing and comparison for rpm-style
//! `[epoch:]version[-release]` strings, including the segment-wise
//! comparison rules (`~` sorts before everything, `^` after the base
//! version, numeric segments beat alphabetic ones).

use std::cmp::Ordering;

/// A borrowed view of an `[epoch:]version[-release]` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evr<'a> {
    pub epoch: Option<&'a str>,
    pub version: &'a str,
    pub release: Option<&'a str>,
}

impl<'a> Evr<'a> {
    /// Split an evr string into its components.
    ///
    /// Examples:
    /// - "1.2.3" → epoch=None, version="1.2.3", release=None
    /// - "2:1.2.3" → epoch=Some("2"), version="1.2.3", release=None
    /// - "1:2.3.4-5.el8" → epoch=Some("1"), version="2.3.4", release=Some("5.el8")
    ///
    /// A malformed epoch is left in the version component rather than
    /// rejected; repository metadata is taken as-is.
    pub fn parse(s: &'a str) -> Self {
        let (epoch, rest) = match s.find(':') {
            Some(pos) if s[..pos].chars().all(|c| c.is_ascii_digit()) => {
                (Some(&s[..pos]), &s[pos + 1..])
            }
            _ => (None, s),
        };
        let (version, release) = match rest.find('-') {
            Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
            None => (rest, None),
        };
        Self {
            epoch,
            version,
            release,
        }
    }
}

/// Compare two version segments the way rpm does.
///
/// The strings are walked in parallel, splitting them into maximal runs
/// of digits or letters. Digit runs compare numerically (leading zeros
/// stripped), letter runs lexically, and a digit run always beats a
/// letter run. `~` sorts before the end of the string, `^` after it.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        // Separators carry no ordering weight of their own.
        while let [c, rest @ ..] = a {
            if c.is_ascii_alphanumeric() || *c == b'~' || *c == b'^' {
                break;
            }
            a = rest;
        }
        while let [c, rest @ ..] = b {
            if c.is_ascii_alphanumeric() || *c == b'~' || *c == b'^' {
                break;
            }
            b = rest;
        }

        // Tilde sorts lower than anything, including the end of the string.
        match (a.first() == Some(&b'~'), b.first() == Some(&b'~')) {
            (true, true) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        // Caret sorts higher than the end of the string but lower than
        // any further segment.
        match (a.first() == Some(&b'^'), b.first() == Some(&b'^')) {
            (true, true) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (true, false) => {
                return if b.is_empty() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, true) => {
                return if a.is_empty() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, false) => {}
        }

        if a.is_empty() || b.is_empty() {
            break;
        }

        let numeric = a[0].is_ascii_digit();
        let seg_a = take_segment(&mut a, numeric);
        let seg_b = take_segment(&mut b, numeric);

        // Type mismatch: the numeric segment is newer.
        if seg_b.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let seg_a = trim_zeros(seg_a);
            let seg_b = trim_zeros(seg_b);
            seg_a
                .len()
                .cmp(&seg_b.len())
                .then_with(|| seg_a.cmp(seg_b))
        } else {
            seg_a.cmp(seg_b)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    a.len().cmp(&b.len())
}

// Takes the leading run of digits (or letters) off the front of `s`.
// Asking for the class the other string does not start with yields an
// empty run, which the caller treats as a segment-type mismatch.
fn take_segment<'a>(s: &mut &'a [u8], numeric: bool) -> &'a [u8] {
    let len = s
        .iter()
        .take_while(|c| {
            if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            }
        })
        .count();
    let (seg, rest) = s.split_at(len);
    *s = rest;
    seg
}

fn trim_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().take_while(|&&c| c == b'0').count();
    &s[start..]
}

/// Compare two full evr strings.
///
/// A missing epoch counts as zero. The release is compared only when both
/// sides carry one, so a dependency written without a release matches any
/// build of the version it names.
pub fn evrcmp(a: &str, b: &str) -> Ordering {
    let ea = Evr::parse(a);
    let eb = Evr::parse(b);

    let ord = vercmp(ea.epoch.unwrap_or("0"), eb.epoch.unwrap_or("0"));
    if ord != Ordering::Equal {
        return ord;
    }
    let ord = vercmp(ea.version, eb.version);
    if ord != Ordering::Equal {
        return ord;
    }
    match (ea.release, eb.release) {
        (Some(ra), Some(rb)) => vercmp(ra, rb),
        _ => Ordering::Equal,
    }
}
