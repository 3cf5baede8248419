use thiserror::Error;

/// Errors that can occur while encoding or decoding packets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Serialization failed
    #[error("Failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    /// Received bytes could not be read (SECURITY: potentially malicious packet)
    #[error("Failed to decode {what} from {length} bytes: {reason}. This may indicate a malformed or malicious packet")]
    Decode {
        what: &'static str,
        length: usize,
        reason: String,
    },
}
