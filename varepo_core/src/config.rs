//! Repository core configuration.

use crate::error::{Error, Result};
use crate::hash::Algorithm;
use std::fs;
use std::path::Path;

/// Default read buffer for streaming hashes (8 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Settings consumed by the content hasher.
///
/// Stored as `key=value` lines:
///
/// ```text
/// version=1
/// algo=blake3-256
/// buffer=8192
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Config format version (only `1` is supported).
    pub version: u32,
    /// Digest algorithm used for content identity.
    pub algorithm: Algorithm,
    /// Read buffer size in bytes for streaming hashes.
    pub buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            algorithm: Algorithm::Blake3,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Create a config for the given algorithm with the default buffer.
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Read and parse a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse config text.
    pub fn parse(content: &str) -> Result<Self> {
        let mut version = None;
        let mut algo = None;
        let mut buffer = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    "buffer" => buffer = Some(value.trim()),
                    _ => {}
                }
            }
        }

        if version != Some("1") {
            return Err(Error::invalid_config(format!(
                "Unsupported config version: {:?}",
                version
            )));
        }

        let algo_str = algo.ok_or_else(|| Error::invalid_config("Missing algo in config"))?;
        let algorithm = Algorithm::parse(algo_str)?;

        let buffer_size = match buffer {
            None => DEFAULT_BUFFER_SIZE,
            Some(raw) => {
                let size = raw
                    .parse::<usize>()
                    .map_err(|_| Error::invalid_config(format!("Invalid buffer size: {}", raw)))?;
                if size == 0 {
                    return Err(Error::invalid_config("Buffer size must be positive"));
                }
                size
            }
        };

        Ok(Self {
            version: 1,
            algorithm,
            buffer_size,
        })
    }

    /// Render the config back to its text form.
    pub fn to_text(&self) -> String {
        format!(
            "version={}\nalgo={}\nbuffer={}\n",
            self.version,
            self.algorithm.as_str(),
            self.buffer_size
        )
    }
}
