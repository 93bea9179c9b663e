//! Connection statistics.

use std::time::Duration;

/// Counters kept by a connection handler.
///
/// Timestamps are readings of the handler's own clock, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Number of times the link came up.
    pub connect_count: u64,
    /// Number of times an established link went away.
    pub disconnect_count: u64,
    /// Number of failed bring-up steps reported as errors.
    pub error_count: u64,
    /// Number of times the Init handler ran.
    pub bring_up_attempts: u64,
    /// Number of successful writes.
    pub writes: u64,
    /// Number of failed writes.
    pub write_failures: u64,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Total bytes read.
    pub bytes_read: u64,
    /// Clock reading when the link last came up.
    pub last_connected_ms: Option<u64>,
    /// Clock reading when the link last went down.
    pub last_disconnected_ms: Option<u64>,
    /// Clock reading of the last error event.
    pub last_error_ms: Option<u64>,
}

impl ConnectionStats {
    /// Record that the link came up.
    pub fn record_connect(&mut self, now_ms: u64) {
        self.connect_count += 1;
        self.last_connected_ms = Some(now_ms);
    }

    /// Record that the link went down.
    pub fn record_disconnect(&mut self, now_ms: u64) {
        self.disconnect_count += 1;
        self.last_disconnected_ms = Some(now_ms);
    }

    /// Record a bring-up failure.
    pub fn record_error(&mut self, now_ms: u64) {
        self.error_count += 1;
        self.last_error_ms = Some(now_ms);
    }

    /// Record an Init handler run.
    pub fn record_bring_up(&mut self) {
        self.bring_up_attempts += 1;
    }

    /// Record a completed write.
    pub fn record_write(&mut self, bytes: usize) {
        self.writes += 1;
        self.bytes_written += bytes as u64;
    }

    /// Record a rejected write.
    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    /// Record a received byte.
    pub fn record_read(&mut self) {
        self.bytes_read += 1;
    }

    /// Time since the link last came up, if it is currently considered up.
    pub fn uptime(&self, now_ms: u64) -> Option<Duration> {
        let connected = self.last_connected_ms?;
        if self.last_disconnected_ms.is_some_and(|down| down >= connected) {
            return None;
        }
        Some(Duration::from_millis(now_ms.wrapping_sub(connected)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_stats() {
        let mut stats = ConnectionStats::default();

        stats.record_connect(1_000);
        assert_eq!(stats.connect_count, 1);
        assert_eq!(stats.uptime(4_000), Some(Duration::from_secs(3)));

        stats.record_write(100);
        stats.record_write_failure();
        stats.record_read();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.bytes_written, 100);
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.bytes_read, 1);

        stats.record_disconnect(5_000);
        assert_eq!(stats.disconnect_count, 1);
        assert_eq!(stats.uptime(6_000), None);

        stats.record_error(5_500);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.last_error_ms, Some(5_500));
    }
}
