//! Utility functions for timestamp handling.
//!
//! Backend events carry timestamps either as RFC 3339 strings or as Unix
//! numbers of varying precision; this module normalizes both to
//! [`Timestamp`].

pub mod timestamps;

pub use timestamps::{iso_timestamp, now_utc, parse_timestamp, Timestamp, UnixPrecision};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.contains(':'));
    }
}
