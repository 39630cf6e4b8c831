use core::fmt;
use std::io;

use thiserror::Error;

use crate::session::SessionState;

/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two IPMB checksum domains failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// Checksum over the responder address and netFn/LUN byte.
    Header,
    /// Checksum over the message body through the end of the command payload.
    Trailing,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Trailing => f.write_str("trailing"),
        }
    }
}

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (socket, OS, etc.).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// No response arrived before the per-state deadline.
    #[error("timeout waiting for response")]
    Timeout,

    /// Fewer bytes were available than the layer being decoded requires.
    #[error("truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the layer requires.
        needed: usize,
        /// Bytes that were left in the buffer.
        available: usize,
    },

    /// A header or trailing checksum did not sum to zero.
    #[error("{0} checksum mismatch")]
    ChecksumMismatch(ChecksumKind),

    /// The peer answered a command with a non-zero completion code.
    #[error("command {command:#04x} failed with completion code {completion_code:#04x}")]
    CompletionCode {
        /// Command the completion code belongs to.
        command: u8,
        /// Raw completion code returned by the BMC.
        completion_code: u8,
    },

    /// The peer does not advertise MD5 authentication on the channel.
    #[error("remote does not support MD5 authentication")]
    UnsupportedAuthentication,

    /// An inbound MD5 auth code did not match the expected value.
    #[error("inbound auth code mismatch")]
    AuthCodeMismatch,

    /// Peer responded with an unexpected or invalid packet.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Unsupported protocol feature.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The session exhausted its failure budget or hit a fatal error.
    #[error("session abandoned")]
    SessionAbandoned,
}

impl Error {
    /// Whether this error ends the session immediately instead of being counted.
    pub(crate) fn is_fatal_at(&self, state: SessionState) -> bool {
        match self {
            Self::UnsupportedAuthentication | Self::SessionAbandoned => true,
            Self::CompletionCode { .. } => state == SessionState::AwaitingAuthCapabilities,
            _ => false,
        }
    }

    /// Short, stable label used in logs and metrics.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Timeout => "timeout",
            Self::Truncated { .. } => "truncated",
            Self::ChecksumMismatch(_) => "checksum",
            Self::CompletionCode { .. } => "completion_code",
            Self::UnsupportedAuthentication => "unsupported_authentication",
            Self::AuthCodeMismatch => "auth_code",
            Self::Protocol(_) => "protocol",
            Self::Unsupported(_) => "unsupported",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::SessionAbandoned => "abandoned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_code_is_fatal_only_during_capability_discovery() {
        let err = Error::CompletionCode {
            command: 0x38,
            completion_code: 0xC1,
        };
        assert!(err.is_fatal_at(SessionState::AwaitingAuthCapabilities));
        assert!(!err.is_fatal_at(SessionState::AwaitingSessionChallenge));
        assert!(!err.is_fatal_at(SessionState::AwaitingChassisControlResponse));
    }

    #[test]
    fn unsupported_authentication_is_always_fatal() {
        assert!(Error::UnsupportedAuthentication.is_fatal_at(SessionState::AwaitingSetPrivilege));
        assert!(!Error::Timeout.is_fatal_at(SessionState::AwaitingAuthCapabilities));
        assert!(
            !Error::ChecksumMismatch(ChecksumKind::Trailing)
                .is_fatal_at(SessionState::AwaitingAuthCapabilities)
        );
    }

    #[test]
    fn display_includes_codes() {
        let err = Error::CompletionCode {
            command: 0x3A,
            completion_code: 0x81,
        };
        assert_eq!(
            err.to_string(),
            "command 0x3a failed with completion code 0x81"
        );
        assert_eq!(
            Error::ChecksumMismatch(ChecksumKind::Header).to_string(),
            "header checksum mismatch"
        );
    }
}
