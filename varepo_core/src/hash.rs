//! Content hashing used as the identity key of file-backed artifacts.

use crate::config::Config;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Digest;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Hash digest size in bytes (both algorithms produce 256-bit hashes).
pub const HASH_SIZE: usize = 32;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    Blake3,
    /// SHA-256.
    Sha256,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
            Algorithm::Sha256 => "sha256",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" | "blake3" => Ok(Algorithm::Blake3),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }
}

/// A 32-byte content digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a hex string (64 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::invalid_hash(format!("Invalid hex: {}", e)))?;

        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes);
        Ok(Hash(hash))
    }

    /// Convert to lowercase hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Hash raw bytes.
    pub fn hash_bytes(algorithm: Algorithm, data: &[u8]) -> Self {
        let mut hasher = Hasher::with_algorithm(algorithm);
        hasher.update(data);
        hasher.finalize()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Hash::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}

enum DigestState {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
}

/// Incremental hasher reading through a fixed-size buffer.
pub struct Hasher {
    state: DigestState,
    buffer_size: usize,
}

impl Hasher {
    /// Create a hasher from the repository config.
    pub fn new(config: &Config) -> Self {
        let mut hasher = Self::with_algorithm(config.algorithm);
        hasher.buffer_size = config.buffer_size.max(1);
        hasher
    }

    /// Create a hasher for the given algorithm with the default buffer.
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        let state = match algorithm {
            Algorithm::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
            Algorithm::Sha256 => DigestState::Sha256(sha2::Sha256::new()),
        };
        Self {
            state,
            buffer_size: crate::config::DEFAULT_BUFFER_SIZE,
        }
    }

    /// Feed bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            DigestState::Blake3(hasher) => {
                hasher.update(data);
            }
            DigestState::Sha256(hasher) => hasher.update(data),
        }
    }

    /// Consume the hasher and produce the digest.
    pub fn finalize(self) -> Hash {
        match self.state {
            DigestState::Blake3(hasher) => Hash(*hasher.finalize().as_bytes()),
            DigestState::Sha256(hasher) => Hash(hasher.finalize().into()),
        }
    }

    /// Stream a reader into the digest.
    pub fn hash_reader<R: Read>(mut self, mut reader: R) -> Result<Hash> {
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.update(&buffer[..read]);
        }
        Ok(self.finalize())
    }

    /// Stream a file into the digest.
    pub fn hash_file(self, path: &Path) -> Result<Hash> {
        let file = File::open(path)?;
        self.hash_reader(file)
    }
}

/// Compute the content identity of a file as a lowercase hex string.
///
/// Any failure (unknown algorithm name, open or read error) is reported as
/// [`Error::ContentHash`] carrying `path`. Callers decide whether to retry.
pub fn content_hash(path: &Path, algorithm: &str) -> Result<String> {
    let compute = || -> Result<Hash> {
        let algorithm = Algorithm::parse(algorithm)?;
        Hasher::with_algorithm(algorithm).hash_file(path)
    };

    match compute() {
        Ok(hash) => Ok(hash.to_hex()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "content hash failed");
            Err(Error::content_hash(path, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_hash_empty() {
        let hash = Hash::hash_bytes(Algorithm::Blake3, b"");
        assert_eq!(hash.to_hex().len(), 64);
    }

    #[test]
    fn test_hash_hello_world_blake3() {
        let hash = Hash::hash_bytes(Algorithm::Blake3, b"hello world");
        assert_eq!(
            hash.to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_hash_hello_world_sha256() {
        let hash = Hash::hash_bytes(Algorithm::Sha256, b"hello world");
        assert_eq!(
            hash.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_hash_from_hex_roundtrip() {
        let original = Hash::hash_bytes(Algorithm::Blake3, b"test data");
        let parsed = Hash::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_hash_from_hex_invalid() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_small_buffer_matches_one_shot() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let config = Config {
            buffer_size: 7,
            ..Config::default()
        };
        let streamed = Hasher::new(&config).hash_reader(Cursor::new(&data)).unwrap();
        assert_eq!(streamed, Hash::hash_bytes(Algorithm::Blake3, &data));
    }

    #[test]
    fn test_content_hash_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let first = content_hash(&path, "sha256").unwrap();
        let second = content_hash(&path, "sha256").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, first.to_lowercase());

        std::fs::write(&path, b"hello worle").unwrap();
        assert_ne!(content_hash(&path, "sha256").unwrap(), first);
    }

    #[test]
    fn test_content_hash_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.txt");

        match content_hash(&path, "blake3-256") {
            Err(Error::ContentHash { path: failed, source }) => {
                assert_eq!(failed, path);
                assert!(matches!(*source, Error::Io { .. }));
            }
            other => panic!("expected ContentHash error, got {:?}", other),
        }
    }

    #[test]
    fn test_content_hash_unknown_algorithm() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, b"data").unwrap();

        match content_hash(&path, "md5") {
            Err(Error::ContentHash { source, .. }) => {
                assert!(matches!(*source, Error::UnsupportedAlgorithm { .. }));
            }
            other => panic!("expected ContentHash error, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_serde_as_hex() {
        let hash = Hash::hash_bytes(Algorithm::Blake3, b"x");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Hashing the same data always produces the same hash
        #[test]
        fn prop_hash_deterministic(data: Vec<u8>) {
            for algorithm in [Algorithm::Blake3, Algorithm::Sha256] {
                let hash1 = Hash::hash_bytes(algorithm, &data);
                let hash2 = Hasher::with_algorithm(algorithm).hash_reader(Cursor::new(&data))?;
                prop_assert_eq!(hash1, hash2);
            }
        }

        /// Flipping a single byte changes the digest
        #[test]
        fn prop_single_byte_change(data in prop::collection::vec(any::<u8>(), 1..512), index: usize) {
            let mut changed = data.clone();
            let i = index % changed.len();
            changed[i] = changed[i].wrapping_add(1);
            prop_assert_ne!(
                Hash::hash_bytes(Algorithm::Blake3, &data),
                Hash::hash_bytes(Algorithm::Blake3, &changed)
            );
        }

        /// Invalid hex length always fails
        #[test]
        fn prop_invalid_hex_length_fails(s in "[0-9a-f]{0,63}|[0-9a-f]{65,128}") {
            prop_assert!(Hash::from_hex(&s).is_err());
        }
    }
}
