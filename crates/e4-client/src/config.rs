//! Client runtime configuration.

use std::time::Duration;

/// Default maximum age of an accepted command (10 minutes).
pub const DEFAULT_MAX_COMMAND_AGE: Duration = Duration::from_secs(10 * 60);

/// Default tolerated clock skew for commands stamped in the future (60
/// seconds).
pub const DEFAULT_MAX_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Client runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Commands stamped earlier than `now - max_command_age` are rejected.
    pub max_command_age: Duration,

    /// Commands stamped later than `now + max_clock_skew` are rejected.
    pub max_clock_skew: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { max_command_age: DEFAULT_MAX_COMMAND_AGE, max_clock_skew: DEFAULT_MAX_CLOCK_SKEW }
    }
}
