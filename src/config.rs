//! Worker configuration with environment overrides.

use crate::error::DecryptError;
use crate::range::DEFAULT_CHUNK_SIZE;

/// Environment variable overriding [`WorkerConfig::chunk_size`].
pub const CHUNK_SIZE_ENV: &str = "CTRSEEK_CHUNK_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum size of each plaintext chunk read from disk.
    pub chunk_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl WorkerConfig {
    /// Defaults overridden by `CTRSEEK_CHUNK_SIZE`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: env_usize(CHUNK_SIZE_ENV).unwrap_or(defaults.chunk_size),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn validate(&self) -> Result<(), DecryptError> {
        if self.chunk_size == 0 {
            return Err(DecryptError::InvalidConfig(
                "chunk_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.chunk_size, 64 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = WorkerConfig::default().with_chunk_size(0);
        assert!(matches!(config.validate(), Err(DecryptError::InvalidConfig(_))));
    }
}
