//! Conversions between fractional unix timestamps and `SystemTime`.
//!
//! The vault's session storage and the browser's cookie store both encode
//! instants as seconds-since-epoch with an optional fractional part.

use std::num::ParseFloatError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Parse a unix timestamp string (possibly fractional) into a `SystemTime`.
pub fn unix_str_to_system_time(unix: &str) -> Result<SystemTime, ParseFloatError> {
    let unix: f64 = unix.trim().parse()?;
    Ok(unix_float_to_system_time(unix))
}

/// Convert fractional seconds-since-epoch into a `SystemTime`, keeping the
/// fractional part as a nanosecond remainder.
pub fn unix_float_to_system_time(unix: f64) -> SystemTime {
    if unix <= 0.0 {
        return UNIX_EPOCH;
    }

    let secs = unix.trunc() as u64;
    let nanos = ((unix - unix.trunc()) * NANOS_PER_SEC) as u32;

    UNIX_EPOCH + Duration::new(secs, nanos)
}

/// Convert a `SystemTime` back into fractional seconds-since-epoch.
/// Times before the epoch collapse to 0.
pub fn system_time_to_unix_float(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as f64 + f64::from(elapsed.subsec_nanos()) / NANOS_PER_SEC,
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_whole_seconds() {
        let time = unix_float_to_system_time(1_700_000_000.0);
        assert_eq!(
            time.duration_since(UNIX_EPOCH).unwrap(),
            Duration::from_secs(1_700_000_000)
        );
    }

    #[test]
    fn keeps_fractional_part_as_nanos() {
        // 0.25 is exactly representable in binary floating point.
        let time = unix_float_to_system_time(1_700_000_000.25);
        let elapsed = time.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(elapsed.as_secs(), 1_700_000_000);
        assert_eq!(elapsed.subsec_nanos(), 250_000_000);
    }

    #[test]
    fn round_trips_representable_values() {
        for unix in [0.5, 59.0, 1_111_111_109.0, 1_700_000_000.25] {
            let back = system_time_to_unix_float(unix_float_to_system_time(unix));
            assert_eq!(back, unix, "round trip of {unix}");
        }
    }

    #[test]
    fn round_trips_within_a_nanosecond_at_small_magnitudes() {
        let unix = 59.123_456_789;
        let back = system_time_to_unix_float(unix_float_to_system_time(unix));
        assert!((back - unix).abs() <= 1e-9, "got {back}");
    }

    #[test]
    fn clamps_non_positive_to_epoch() {
        assert_eq!(unix_float_to_system_time(-1.0), UNIX_EPOCH);
        assert_eq!(unix_float_to_system_time(0.0), UNIX_EPOCH);
    }

    #[test]
    fn parses_timestamp_strings() {
        let time = unix_str_to_system_time("1700000000.5").unwrap();
        let elapsed = time.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(elapsed.subsec_nanos(), 500_000_000);

        assert!(unix_str_to_system_time("not-a-number").is_err());
        assert!(unix_str_to_system_time("").is_err());
    }
}
