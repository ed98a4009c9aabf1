//! Wall-clock port used for cache ages and token expiry.

use chrono::{DateTime, Utc};

/// Source of "now".
///
/// Cache expiry and OAuth token validity both read time through this port,
/// so tests and cassette playback can pin "now" to a fixed instant.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
