/// Domain-level failure: bad input to the planner or an unparseable
/// kind/channel name.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Failure reported by a record, preference or directory store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing database or service failed.
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored row could not be mapped back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Wrap any backend error (e.g. `sqlx::Error`).
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        Self::Corrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_becomes_corrupt_row() {
        let err = StoreError::from(CoreError::Validation("Unknown channel 'fax'".to_string()));
        assert_eq!(
            err.to_string(),
            "Corrupt row: Validation failed: Unknown channel 'fax'"
        );
    }

    #[test]
    fn backend_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = StoreError::backend(io);
        assert_eq!(err.to_string(), "Store backend error: connection reset");
        assert!(std::error::Error::source(&err).is_some());
    }
}
