//! Content digests used to decide whether two files hold the same bytes.
//!
//! The hash only serves equality testing between a source file and an
//! existing target file, so any fixed-output hash works. The algorithm is a
//! pluggable [`ContentDigest`]; [`HashAlgorithm`] selects one of the shipped
//! implementations from configuration.

use crate::{Error, Result};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer used while streaming a file through a hasher (64 KiB)
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Fixed-size digest of a file's full byte stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDigest(Vec<u8>);

impl FileDigest {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl std::fmt::Display for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A hash function that can summarize a byte stream
pub trait ContentDigest: Send + Sync {
    /// Short algorithm name, used in logs
    fn name(&self) -> &'static str;

    /// Consume the reader to the end and return its digest
    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<FileDigest>;

    /// Digest the full contents of the file at `path`
    fn digest_file(&self, path: &Path) -> Result<FileDigest> {
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
        self.digest_reader(&mut file).map_err(|e| Error::io(path, e))
    }
}

/// BLAKE3, the default
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Digest;

impl ContentDigest for Blake3Digest {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<FileDigest> {
        let mut hasher = blake3::Hasher::new();
        io::copy(reader, &mut hasher)?;
        Ok(FileDigest::new(hasher.finalize().as_bytes().to_vec()))
    }
}

/// Any RustCrypto `Digest` implementation (SHA-256, MD5, ...)
#[derive(Debug, Clone)]
pub struct RustCryptoDigest<D> {
    name: &'static str,
    _hasher: std::marker::PhantomData<fn() -> D>,
}

impl<D> RustCryptoDigest<D> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _hasher: std::marker::PhantomData,
        }
    }
}

impl<D: Digest> ContentDigest for RustCryptoDigest<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<FileDigest> {
        let mut hasher = D::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(FileDigest::new(hasher.finalize().to_vec()))
    }
}

pub type Sha256Digest = RustCryptoDigest<Sha256>;
pub type Md5Digest = RustCryptoDigest<Md5>;

/// Digest algorithms selectable from the command line or config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
    Md5,
}

impl HashAlgorithm {
    /// Build the digester for this algorithm
    pub fn digester(self) -> Box<dyn ContentDigest> {
        match self {
            HashAlgorithm::Blake3 => Box::new(Blake3Digest),
            HashAlgorithm::Sha256 => Box::new(Sha256Digest::new("sha256")),
            HashAlgorithm::Md5 => Box::new(Md5Digest::new("md5")),
        }
    }
}

/// Whether the file at `path` has the digest `expected`.
///
/// Fails if the file cannot be opened or read to the end.
pub fn file_matches(
    path: &Path,
    expected: &FileDigest,
    digester: &dyn ContentDigest,
) -> Result<bool> {
    Ok(digester.digest_file(path)? == *expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        let data = b"hello world";

        let blake = Blake3Digest.digest_reader(&mut &data[..]).unwrap();
        assert_eq!(
            blake.to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );

        let sha = Sha256Digest::new("sha256")
            .digest_reader(&mut &data[..])
            .unwrap();
        assert_eq!(
            sha.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );

        let md5 = Md5Digest::new("md5").digest_reader(&mut &data[..]).unwrap();
        assert_eq!(md5.to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[rstest]
    #[case(HashAlgorithm::Blake3)]
    #[case(HashAlgorithm::Sha256)]
    #[case(HashAlgorithm::Md5)]
    fn test_file_matches(#[case] algorithm: HashAlgorithm) {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.bin");
        let b = temp_dir.path().join("b.bin");
        let c = temp_dir.path().join("c.bin");

        // Larger than one read buffer so streaming is exercised
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&a, &payload).unwrap();
        fs::write(&b, &payload).unwrap();
        let mut altered = payload.clone();
        altered[150_000] ^= 0xff;
        fs::write(&c, &altered).unwrap();

        let digester = algorithm.digester();
        let expected = digester.digest_file(&a).unwrap();
        assert!(file_matches(&b, &expected, digester.as_ref()).unwrap());
        assert!(!file_matches(&c, &expected, digester.as_ref()).unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present.txt");
        let missing = temp_dir.path().join("missing.txt");
        fs::write(&present, b"data").unwrap();

        let expected = Blake3Digest.digest_file(&present).unwrap();
        let err = file_matches(&missing, &expected, &Blake3Digest).unwrap_err();
        match err {
            Error::Io { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_files_match() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        fs::write(&a, b"").unwrap();
        fs::write(&b, b"").unwrap();

        let expected = Blake3Digest.digest_file(&a).unwrap();
        assert!(file_matches(&b, &expected, &Blake3Digest).unwrap());
    }
}
