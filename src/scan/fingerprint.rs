// file: src/scan/fingerprint.rs
// description: streaming content digests with a configurable algorithm
// reference: https://docs.rs/sha2, https://docs.rs/md-5

use crate::error::{Result, TroviError};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::digest::DynDigest;
use sha2::{Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
    Sha512,
}

impl From<&str> for HashAlgorithm {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "md5" | "" => Self::Md5,
            "sha256" => Self::Sha256,
            "sha512" => Self::Sha512,
            other => {
                warn!("Unknown hash algorithm {:?}, falling back to md5", other);
                Self::Md5
            }
        }
    }
}

impl From<String> for HashAlgorithm {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<HashAlgorithm> for String {
    fn from(algorithm: HashAlgorithm) -> Self {
        algorithm.to_string()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

impl HashAlgorithm {
    fn hasher(self) -> Box<dyn DynDigest + Send> {
        match self {
            Self::Md5 => Box::new(Md5::default()),
            Self::Sha256 => Box::new(Sha256::default()),
            Self::Sha512 => Box::new(Sha512::default()),
        }
    }
}

/// Owns one hash state. Not shared between workers; each builds its own.
pub struct Fingerprinter {
    algorithm: HashAlgorithm,
    hasher: Box<dyn DynDigest + Send>,
}

impl Fingerprinter {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            hasher: algorithm.hasher(),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn digest_file(&mut self, path: &Path) -> Result<String> {
        let file = File::open(path).map_err(|e| TroviError::file(path, e))?;
        self.stream(path, file, |_| {})
    }

    /// Digest and file bytes from a single read pass.
    pub fn digest_file_with_content(&mut self, path: &Path) -> Result<(String, Vec<u8>)> {
        let file = File::open(path).map_err(|e| TroviError::file(path, e))?;
        let capacity = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let mut content = Vec::with_capacity(capacity);
        let digest = self.stream(path, file, |chunk| content.extend_from_slice(chunk))?;
        Ok((digest, content))
    }

    pub fn digest_bytes(&mut self, bytes: &[u8]) -> String {
        self.hasher.update(bytes);
        hex::encode(self.hasher.finalize_reset())
    }

    fn stream<R: Read>(
        &mut self,
        path: &Path,
        mut reader: R,
        mut sink: impl FnMut(&[u8]),
    ) -> Result<String> {
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // drop partial state so the next file starts clean
                    self.hasher.reset();
                    return Err(TroviError::file(path, e));
                }
            };
            self.hasher.update(&buffer[..read]);
            sink(&buffer[..read]);
        }
        Ok(hex::encode(self.hasher.finalize_reset()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        let mut md5 = Fingerprinter::new(HashAlgorithm::Md5);
        let mut sha256 = Fingerprinter::new(HashAlgorithm::Sha256);

        assert_eq!(md5.digest_bytes(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            sha256.digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_lengths_per_algorithm() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        for (algorithm, hex_len) in [
            (HashAlgorithm::Md5, 32),
            (HashAlgorithm::Sha256, 64),
            (HashAlgorithm::Sha512, 128),
        ] {
            let digest = Fingerprinter::new(algorithm).digest_file(&path).unwrap();
            assert_eq!(digest.len(), hex_len, "{}", algorithm);
        }
    }

    #[test]
    fn test_reused_instance_resets_between_files() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.txt");
        let second = temp.path().join("second.txt");
        fs::write(&first, "one").unwrap();
        fs::write(&second, "two").unwrap();

        let mut shared = Fingerprinter::new(HashAlgorithm::Sha256);
        let a1 = shared.digest_file(&first).unwrap();
        let b1 = shared.digest_file(&second).unwrap();
        let a2 = shared.digest_file(&first).unwrap();

        assert_eq!(a1, a2);
        assert_eq!(b1, Fingerprinter::new(HashAlgorithm::Sha256).digest_file(&second).unwrap());
    }

    #[test]
    fn test_content_pass_matches_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let mut fingerprinter = Fingerprinter::new(HashAlgorithm::Md5);
        let (digest, content) = fingerprinter.digest_file_with_content(&path).unwrap();

        assert_eq!(content, data);
        assert_eq!(digest, fingerprinter.digest_file(&path).unwrap());
    }

    #[test]
    fn test_missing_file_is_error() {
        let mut fingerprinter = Fingerprinter::new(HashAlgorithm::Md5);
        let err = fingerprinter
            .digest_file(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, TroviError::FileOperation { .. }));
    }

    #[test]
    fn test_unknown_name_falls_back_to_md5() {
        assert_eq!(HashAlgorithm::from("crc32"), HashAlgorithm::Md5);
        assert_eq!(HashAlgorithm::from("SHA512"), HashAlgorithm::Sha512);
        assert_eq!(HashAlgorithm::from(""), HashAlgorithm::Md5);
    }
}
