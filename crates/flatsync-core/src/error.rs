//! Error taxonomy for the flatsync engine.

/// Errors produced by the engine.
///
/// The variants partition failures by the phase that produced them, which is
/// what decides their propagation: format and schema errors are fatal before
/// any write, validation failures are droppable under continue-on-error, and
/// write errors interact with the per-batch transaction policy.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Payload does not parse under the declared format
    #[error("format error: {0}")]
    Format(String),

    /// Target table or columns could not be resolved or provisioned
    #[error("schema error: {0}")]
    Schema(String),

    /// A validation rule was violated in strict mode
    #[error("validation error: {0}")]
    Validation(String),

    /// Constraint violation or statement error during a write
    #[error("write error: {0}")]
    Write(String),

    /// Missing, unreadable, or undecodable input
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The run's cancellation token was triggered between batches
    #[error("operation cancelled")]
    Cancelled,
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_taxonomy_prefix() {
        let e = EngineError::Format("unexpected token".to_string());
        assert_eq!(e.to_string(), "format error: unexpected token");

        let e = EngineError::Write("UNIQUE constraint failed".to_string());
        assert_eq!(e.to_string(), "write error: UNIQUE constraint failed");

        assert_eq!(EngineError::Cancelled.to_string(), "operation cancelled");
    }

    #[test]
    fn test_io_error_converts() {
        fn read() -> EngineResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(read(), Err(EngineError::Io(_))));
    }
}
