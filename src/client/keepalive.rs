// ABOUTME: Keep-alive settings for long-running carrier links
// ABOUTME: Periodic enquire_link is fire-and-forget; a dead link is detected by the reader instead

use std::time::Duration;

/// Configuration for periodic enquire_link on a carrier link.
///
/// The SMSC answers with enquire_link_resp, which the reader absorbs. No
/// response is awaited: a broken link surfaces as a read or write error.
///
/// # Example
///
/// ```rust
/// use smpp_gateway::client::KeepAliveConfig;
/// use std::time::Duration;
///
/// // Default configuration (30s interval)
/// let config = KeepAliveConfig::default();
/// assert_eq!(config.interval, Duration::from_secs(30));
///
/// // Disabled keep-alive
/// let config = KeepAliveConfig::disabled();
/// assert!(!config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveConfig {
    /// Interval between enquire_link PDUs (default: 30 seconds)
    pub interval: Duration,

    /// Whether keep-alive is enabled (default: true)
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    /// Create a new keep-alive configuration with custom interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Create a disabled keep-alive configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Interval to tick on, or `None` when disabled.
    ///
    /// A zero interval is treated as disabled rather than a busy loop.
    pub fn active_interval(&self) -> Option<Duration> {
        (self.enabled && !self.interval.is_zero()).then_some(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_or_disabled_interval_is_inactive() {
        assert_eq!(
            KeepAliveConfig::default().active_interval(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(KeepAliveConfig::disabled().active_interval(), None);
        assert_eq!(KeepAliveConfig::new(Duration::ZERO).active_interval(), None);
    }
}
