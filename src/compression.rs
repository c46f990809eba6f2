// src/compression.rs

//! Transparent decompression of repository inputs
//!
//! Repository arguments may point at gzip, xz or zstd compressed files;
//! the compression suffix is stripped before format detection so that
//! `primary.xml.gz` and `primary.xml` load the same way.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Supported compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// No compression (raw data)
    None,
    /// Gzip compression (.gz)
    Gzip,
    /// XZ/LZMA compression (.xz)
    Xz,
    /// Zstandard compression (.zst)
    Zstd,
}

impl CompressionFormat {
    /// Detect compression format from a file name.
    pub fn from_extension(path: &str) -> Self {
        if path.ends_with(".gz") || path.ends_with(".tgz") {
            Self::Gzip
        } else if path.ends_with(".xz") {
            Self::Xz
        } else if path.ends_with(".zst") || path.ends_with(".zstd") {
            Self::Zstd
        } else {
            Self::None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}

/// The file name with any recognized compression suffix removed.
/// Format detection works on this stem.
pub fn strip_suffix(path: &str) -> &str {
    for suffix in [".gz", ".xz", ".zst", ".zstd"] {
        if let Some(stem) = path.strip_suffix(suffix) {
            return stem;
        }
    }
    path
}

/// Wrap a reader in the decoder for the given format.
pub fn decoder<'a, R: Read + 'a>(
    reader: R,
    format: CompressionFormat,
) -> io::Result<Box<dyn Read + 'a>> {
    match format {
        CompressionFormat::None => Ok(Box::new(reader)),
        CompressionFormat::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
        CompressionFormat::Xz => Ok(Box::new(xz2::read::XzDecoder::new(reader))),
        CompressionFormat::Zstd => Ok(Box::new(zstd::Decoder::new(reader)?)),
    }
}

/// Open a repository file, transparently decompressing by suffix.
pub fn open(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    let format = CompressionFormat::from_extension(&path.to_string_lossy());
    decoder(file, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            CompressionFormat::from_extension("primary.xml.gz"),
            CompressionFormat::Gzip
        );
        assert_eq!(
            CompressionFormat::from_extension("Packages.xz"),
            CompressionFormat::Xz
        );
        assert_eq!(
            CompressionFormat::from_extension("core.db.tar.zst"),
            CompressionFormat::Zstd
        );
        assert_eq!(
            CompressionFormat::from_extension("primary.xml"),
            CompressionFormat::None
        );
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(strip_suffix("primary.xml.gz"), "primary.xml");
        assert_eq!(strip_suffix("Packages.xz"), "Packages");
        assert_eq!(strip_suffix("repo.solv"), "repo.solv");
        assert_eq!(strip_suffix("core.db.tar.zst"), "core.db.tar");
    }

    #[test]
    fn test_gzip_roundtrip_through_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        enc.write_all(b"hello repo").unwrap();
        enc.finish().unwrap();

        let mut out = String::new();
        open(&path).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello repo");
    }
}
