//! Install statistics.

use std::time::Duration;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStats {
    /// Name of the store that was populated.
    pub cache_name: String,
    /// Number of assets written to the store.
    pub assets_stored: usize,
    /// Sum of all stored body sizes in bytes.
    pub total_bytes: u64,
    /// Wall time from opening the store to the last insert.
    pub elapsed: Duration,
}

impl InstallStats {
    /// Returns the average fetch throughput in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}
