use std::time::{SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in seconds, truncated to the 32 bits the
/// handshake carries. A clock set before the epoch yields 0.
pub fn current_timestamp_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Milliseconds elapsed between two 32-bit frame timestamps, wrapping
pub fn time_delta_ms(start: u32, end: u32) -> u32 {
    end.wrapping_sub(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(current_timestamp_secs() > 1_577_836_800);
    }

    #[test]
    fn test_time_delta() {
        assert_eq!(time_delta_ms(1000, 1500), 500);

        // Wraps around the 32-bit boundary
        assert_eq!(time_delta_ms(u32::MAX - 9, 10), 20);
    }
}
