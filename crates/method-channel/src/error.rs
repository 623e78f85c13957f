use thiserror::Error;

/// Error code reported when a required argument is missing or mistyped.
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

/// Per-call failures surfaced to the caller. None of these are retried and
/// none are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A required identifier was missing, null, or not a string.
    #[error("{message}")]
    InvalidArgument { message: String },

    /// No handler on this channel understands the method.
    #[error("method '{method}' is not implemented on channel '{channel}'")]
    NotImplemented { channel: String, method: String },
}

impl ChannelError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_implemented(channel: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NotImplemented {
            channel: channel.into(),
            method: method.into(),
        }
    }
}
