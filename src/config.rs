//! Socket tuning knobs.

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Default size of a single `recv` increment.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Default ceiling on bytes pulled into the accumulator per read pump.
pub const DEFAULT_MAX_READ_BUFFER: usize = 64 * 1024;

/// Configuration for a [`LocalSocket`](crate::LocalSocket).
///
/// Missing fields fall back to their defaults when deserialized.
///
/// # Example
///
/// ```
/// use localwire::SocketConfig;
///
/// let config = SocketConfig::from_json(r#"{"read_chunk_size": 4096}"#).unwrap();
/// assert_eq!(config.read_chunk_size, 4096);
/// assert_eq!(config.max_read_buffer, localwire::config::DEFAULT_MAX_READ_BUFFER);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Bytes requested per `recv`.
    pub read_chunk_size: usize,
    /// Upper bound on bytes read in one pump. Never below `read_chunk_size`.
    pub max_read_buffer: usize,
    /// Largest payload a peer may announce before the frame is rejected.
    pub max_payload_size: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_read_buffer: DEFAULT_MAX_READ_BUFFER,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl SocketConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Clamp fields into a usable range.
    pub(crate) fn normalized(mut self) -> Self {
        self.read_chunk_size = self.read_chunk_size.max(1);
        self.max_read_buffer = self.max_read_buffer.max(self.read_chunk_size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocalwireError;

    #[test]
    fn test_defaults() {
        let config = SocketConfig::default();
        assert_eq!(config.read_chunk_size, 1024);
        assert_eq!(config.max_read_buffer, 65536);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_from_json_partial() {
        let config = SocketConfig::from_json(r#"{"max_payload_size": 100}"#).unwrap();
        assert_eq!(config.max_payload_size, 100);
        assert_eq!(config.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
    }

    #[test]
    fn test_from_json_clamps() {
        let config =
            SocketConfig::from_json(r#"{"read_chunk_size": 0, "max_read_buffer": 0}"#).unwrap();
        assert_eq!(config.read_chunk_size, 1);
        assert_eq!(config.max_read_buffer, 1);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = SocketConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, LocalwireError::Config(_)));
    }
}
