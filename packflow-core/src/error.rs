//! Error types for packflow codec sessions.
//!
//! Every failure is terminal for the invocation that produced it. The
//! variants mirror the failure classes a caller must be able to tell apart:
//! engine construction, input stream, output stream, corrupt data, memory
//! exhaustion and any other engine-reported condition.

use std::io;
use thiserror::Error;

/// The main error type for packflow operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The engine could not be constructed (invalid preset, bad configuration).
    #[error("Initialization error: {message}")]
    Init {
        /// Description of what was rejected.
        message: String,
    },

    /// The input stream reported a fault.
    #[error("Read error: {0}")]
    Read(#[source] io::Error),

    /// The output stream reported a fault.
    #[error("Write error: {0}")]
    Write(#[source] io::Error),

    /// Malformed, truncated or corrupt compressed input.
    #[error("{codec} data error: {message}")]
    Data {
        /// Name of the codec that rejected the data.
        codec: &'static str,
        /// Description of the corruption.
        message: String,
    },

    /// The engine or the bounded allocator could not satisfy a memory request.
    #[error("{codec} memory error: {message}")]
    Memory {
        /// Name of the codec that ran out of memory.
        codec: &'static str,
        /// Description of the request that failed.
        message: String,
    },

    /// Any other engine-reported failure.
    #[error("{codec} engine error: {code}")]
    Engine {
        /// Name of the codec whose engine failed.
        codec: &'static str,
        /// Engine-specific code or name, kept verbatim for diagnostics.
        code: String,
    },
}

/// Result type alias for packflow operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Coarse classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CodecError::Init`].
    Init,
    /// See [`CodecError::Read`].
    Read,
    /// See [`CodecError::Write`].
    Write,
    /// See [`CodecError::Data`].
    Data,
    /// See [`CodecError::Memory`].
    Memory,
    /// See [`CodecError::Engine`].
    Engine,
}

impl CodecError {
    /// Create an initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }

    /// Create a data (corruption) error.
    pub fn data(codec: &'static str, message: impl Into<String>) -> Self {
        Self::Data {
            codec,
            message: message.into(),
        }
    }

    /// Create a memory error.
    pub fn memory(codec: &'static str, message: impl Into<String>) -> Self {
        Self::Memory {
            codec,
            message: message.into(),
        }
    }

    /// Create a generic engine error.
    pub fn engine(codec: &'static str, code: impl Into<String>) -> Self {
        Self::Engine {
            codec,
            code: code.into(),
        }
    }

    /// Create the error reported when the input ends before the stream does.
    pub fn truncated(codec: &'static str) -> Self {
        Self::data(codec, "unexpected end of compressed stream")
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Init { .. } => ErrorKind::Init,
            Self::Read(_) => ErrorKind::Read,
            Self::Write(_) => ErrorKind::Write,
            Self::Data { .. } => ErrorKind::Data,
            Self::Memory { .. } => ErrorKind::Memory,
            Self::Engine { .. } => ErrorKind::Engine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::data("xz", "block check mismatch");
        assert_eq!(err.to_string(), "xz data error: block check mismatch");

        let err = CodecError::engine("zstd", "Operation not authorized");
        assert!(err.to_string().contains("Operation not authorized"));

        let err = CodecError::init("compression level 12 is outside 0-9");
        assert!(err.to_string().starts_with("Initialization error"));
    }

    #[test]
    fn test_kinds() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(CodecError::Write(io_err).kind(), ErrorKind::Write);
        assert_eq!(CodecError::truncated("gzip").kind(), ErrorKind::Data);
        assert_eq!(CodecError::memory("xz-embedded", "x").kind(), ErrorKind::Memory);
    }
}
