//! Error types for the borg engine.

use borg_gen::GenerationError;
use borg_text::finalize;
use thiserror::Error;

/// Errors surfaced by the engine facade.
#[derive(Debug, Error)]
pub enum BorgError {
    /// Reading or writing the corpus failed.
    #[error("corpus I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Reply generation ran past its limit.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl BorgError {
    /// The finalized partial reply, if generation was cut short.
    pub fn partial_reply(&self) -> Option<String> {
        match self {
            BorgError::Generation(e) => Some(finalize(&e.partial().join(" "))),
            BorgError::Io(_) => None,
        }
    }
}

/// Result type for engine operations.
pub type BorgResult<T> = Result<T, BorgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = BorgError::from(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "corpus I/O failed: disk full");

        let err = BorgError::from(GenerationError::TokenLimit {
            limit: 4,
            partial: vec![],
        });
        assert_eq!(err.to_string(), "reply grew past 4 tokens");
    }

    #[test]
    fn partial_reply_is_finalized() {
        let err = BorgError::from(GenerationError::TokenLimit {
            limit: 3,
            partial: vec!["well".into(), ",".into(), "hello".into()],
        });
        assert_eq!(err.partial_reply().as_deref(), Some("well, hello"));

        let err = BorgError::from(std::io::Error::other("nope"));
        assert_eq!(err.partial_reply(), None);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BorgError>();
    }
}
