use thiserror::Error;

use crate::types::Seqno;

/// Errors that can occur during SequenceBuffer operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Attempted to buffer a seqno that is already buffered
    #[error("Duplicate seqno {seqno} not allowed in SequenceBuffer")]
    DuplicateSeqno { seqno: Seqno },
}
