use crate::ip::IP_DATA_MAX_LEN;
use crate::tcp::header::TCP_MIN_HEADER_LEN;
use std::time::Duration;

pub const DEFAULT_WINDOW: u16 = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;
pub const DEFAULT_MAX_SEGMENT_SIZE: usize = IP_DATA_MAX_LEN - TCP_MIN_HEADER_LEN;

/// Tunables shared by the handshake and the established connection.
///
/// Every wait for a segment is bounded twice: by `timeout` of wall-clock time
/// and by `max_attempts` receive calls, whichever runs out first. A discarded
/// segment and an idle receive both use up an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConfig {
    pub window: u16,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub max_segment_size: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            window: DEFAULT_WINDOW,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
        }
    }
}

impl TcpConfig {
    pub fn window(&mut self, window: u16) -> &mut Self {
        self.window = window;
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    pub fn max_attempts(&mut self, max_attempts: u32) -> &mut Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Clamped to at least one byte and at most what fits in one IP datagram.
    pub fn max_segment_size(&mut self, max_segment_size: usize) -> &mut Self {
        self.max_segment_size = max_segment_size.clamp(1, DEFAULT_MAX_SEGMENT_SIZE);
        self
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TcpConfig::default();
        assert_eq!(config.window, 1000);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.max_attempts, 64);
        assert_eq!(config.max_segment_size, 1220);
    }

    #[test]
    fn test_setters_chain() {
        let mut config = TcpConfig::default();
        config
            .window(4096)
            .timeout(Duration::from_millis(250))
            .max_attempts(3)
            .max_segment_size(100_000);

        assert_eq!(config.window, 4096);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_segment_size, DEFAULT_MAX_SEGMENT_SIZE);

        config.max_segment_size(0);
        assert_eq!(config.max_segment_size, 1);
    }
}
