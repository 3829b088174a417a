//! ABOUTME: Core error type and tracing utilities
//! ABOUTME: Foundation crate used by all other chpool-exporter components

pub mod error;
pub mod telemetry;

pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Stat("pool closed".to_string());
        assert_eq!(err.to_string(), "Pool stat error: pool closed");

        let err = Error::Config("bad namespace".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad namespace");

        let err = Error::Registry("lock poisoned".to_string());
        assert_eq!(err.to_string(), "Registry error: lock poisoned");

        let err = Error::Validation("metrics.namespace".to_string());
        assert_eq!(err.to_string(), "Validation error: metrics.namespace");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
