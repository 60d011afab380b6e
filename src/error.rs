//! Error types for dspc operations.
//!
//! Every failure the client can produce is classified here so that callers
//! can tell "the VM is gone" apart from "the call failed".

use std::fmt;

use thiserror::Error;

use crate::api::http::TransportError;
use crate::resource::ResourceState;

/// The gateway operation an error happened in, with its target VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Create(String),
    Delete(String),
    List,
    Lookup(String),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Create(name) => write!(f, "create VM '{name}'"),
            Op::Delete(name) => write!(f, "delete VM '{name}'"),
            Op::List => write!(f, "list VMs"),
            Op::Lookup(name) => write!(f, "look up VM '{name}'"),
        }
    }
}

/// Errors that can occur while talking to the DSPC API.
#[derive(Error, Debug)]
pub enum Error {
    /// Endpoint, credential or timeout missing or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Request body could not be serialized; nothing was sent
    #[error("failed to marshal request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The API rejected the request
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// A successful listing did not contain the name
    #[error("VM '{0}' not found. Please verify the VM name exists or check your API endpoint")]
    NotFound(String),

    #[error(
        "update not supported: VM updates are not supported by the DSPC API. \
         Changes require VM recreation"
    )]
    UpdateNotSupported,

    /// A lifecycle step was requested from a state that does not allow it
    #[error("invalid resource state: expected {expected}, got {actual}")]
    InvalidState {
        expected: ResourceState,
        actual: ResourceState,
    },

    /// Gateway failure annotated with the operation and target
    #[error("could not {op}: {source}")]
    Operation {
        op: Op,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn during(self, op: Op) -> Self {
        Error::Operation {
            op,
            source: Box::new(self),
        }
    }

    /// The underlying classified error, looking through operation context.
    pub fn kind(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.kind(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), Error::NotFound(_))
    }

    /// True when the call was cancelled or ran past its deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.kind(),
            Error::Transport(TransportError::Cancelled | TransportError::DeadlineExceeded)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind(),
            Error::Transport(TransportError::DeadlineExceeded | TransportError::TimedOut(_))
        )
    }

    /// HTTP status of an API rejection
    pub fn status(&self) -> Option<u16> {
        match self.kind() {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for dspc operations
pub type Result<T> = std::result::Result<T, Error>;
