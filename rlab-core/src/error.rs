//! Errors of this crate.
use thiserror::Error;

/// Errors raised by the core types.
#[derive(Debug, Error)]
pub enum RlabError {
    /// The replay buffer holds fewer transitions than the requested batch.
    ///
    /// Callers are expected to guard sampling with an occupancy check; hitting
    /// this is a contract violation of the driving loop, not a condition to
    /// recover from.
    #[error("replay buffer holds {len} transitions, cannot sample a batch of {batch_size}")]
    InsufficientTransitions {
        /// Number of transitions currently stored.
        len: usize,
        /// Requested batch size.
        batch_size: usize,
    },

    /// A selector string did not name any known algorithm.
    #[error("unknown agent kind: {0}")]
    UnknownAgentKind(String),

    /// A record entry was read as the wrong value type.
    #[error("record value type mismatch, expected {0}")]
    RecordValueTypeError(String),

    /// A record entry was not found.
    #[error("key {0} is not found in the record")]
    RecordKeyError(String),
}
