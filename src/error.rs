//! Error types for the AgentX sub-agent.
//!
//! Local failures (bad input, malformed frames, lost connections) and remote
//! failures reported by the master agent in a Response PDU share one error
//! enum. Remote error codes that callers can act on (duplicate registration,
//! master unwilling/unable) get their own variants; the rest are carried as
//! [`Error::Protocol`].

use std::{fmt, io};

/// Errors that can occur during AgentX protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A frame or a field inside it could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The peer speaks an unsupported protocol version.
    #[error("Unsupported AgentX version: {0}")]
    Version(u8),
    /// The session is not connected, or the connection was lost.
    #[error("Not connected to master agent")]
    Disconnected,
    /// No response arrived within the timeout.
    #[error("Timed out waiting for response")]
    Timeout,
    /// The transport could not be opened.
    #[error("Failed to connect to master agent: {0}")]
    Connect(#[source] io::Error),
    /// Transport I/O failure that is not a disconnect.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The master agent answered with an error code.
    #[error("Master agent returned error: {0}")]
    Protocol(ResponseError),
    /// The exact same subtree is already registered.
    #[error("Duplicate registration")]
    DuplicateRegistration,
    /// The referenced registration does not exist.
    #[error("Unknown registration")]
    UnknownRegistration,
    /// The master agent refused the request.
    #[error("Master agent is unwilling to perform the request")]
    MasterUnwilling,
    /// The master agent could not process the request.
    #[error("Master agent is unable to perform the request")]
    MasterUnable,
    /// Bad local input, e.g. a malformed OID string.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A variable failed to produce its value.
    #[error("Variable error: {0}")]
    Variable(String),
    /// The background event loop task failed.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes carried in the `res.error` field of a Response PDU
/// (RFC 2741 §6.2.16).
///
/// Besides the AgentX-specific codes (256 and up), Responses to Get and Set
/// requests carry SNMP error-status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseError {
    NoAgentXError,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    NotWritable,
    InconsistentName,
    OpenFailed,
    NotOpen,
    IndexWrongType,
    IndexAlreadyAllocated,
    IndexNoneAvailable,
    IndexNotAllocated,
    UnsupportedContext,
    DuplicateRegistration,
    UnknownRegistration,
    UnknownAgentCaps,
    ParseError,
    RequestDenied,
    ProcessingError,
    /// A code this implementation does not know.
    Other(u16),
}

impl ResponseError {
    /// Returns the wire value.
    pub fn code(self) -> u16 {
        match self {
            ResponseError::NoAgentXError => 0,
            ResponseError::GenErr => 5,
            ResponseError::NoAccess => 6,
            ResponseError::WrongType => 7,
            ResponseError::WrongLength => 8,
            ResponseError::WrongEncoding => 9,
            ResponseError::WrongValue => 10,
            ResponseError::NoCreation => 11,
            ResponseError::InconsistentValue => 12,
            ResponseError::ResourceUnavailable => 13,
            ResponseError::CommitFailed => 14,
            ResponseError::UndoFailed => 15,
            ResponseError::NotWritable => 17,
            ResponseError::InconsistentName => 18,
            ResponseError::OpenFailed => 256,
            ResponseError::NotOpen => 257,
            ResponseError::IndexWrongType => 258,
            ResponseError::IndexAlreadyAllocated => 259,
            ResponseError::IndexNoneAvailable => 260,
            ResponseError::IndexNotAllocated => 261,
            ResponseError::UnsupportedContext => 262,
            ResponseError::DuplicateRegistration => 263,
            ResponseError::UnknownRegistration => 264,
            ResponseError::UnknownAgentCaps => 265,
            ResponseError::ParseError => 266,
            ResponseError::RequestDenied => 267,
            ResponseError::ProcessingError => 268,
            ResponseError::Other(code) => code,
        }
    }

    /// Decodes a wire value. Unknown values map to [`ResponseError::Other`].
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => ResponseError::NoAgentXError,
            5 => ResponseError::GenErr,
            6 => ResponseError::NoAccess,
            7 => ResponseError::WrongType,
            8 => ResponseError::WrongLength,
            9 => ResponseError::WrongEncoding,
            10 => ResponseError::WrongValue,
            11 => ResponseError::NoCreation,
            12 => ResponseError::InconsistentValue,
            13 => ResponseError::ResourceUnavailable,
            14 => ResponseError::CommitFailed,
            15 => ResponseError::UndoFailed,
            17 => ResponseError::NotWritable,
            18 => ResponseError::InconsistentName,
            256 => ResponseError::OpenFailed,
            257 => ResponseError::NotOpen,
            258 => ResponseError::IndexWrongType,
            259 => ResponseError::IndexAlreadyAllocated,
            260 => ResponseError::IndexNoneAvailable,
            261 => ResponseError::IndexNotAllocated,
            262 => ResponseError::UnsupportedContext,
            263 => ResponseError::DuplicateRegistration,
            264 => ResponseError::UnknownRegistration,
            265 => ResponseError::UnknownAgentCaps,
            266 => ResponseError::ParseError,
            267 => ResponseError::RequestDenied,
            268 => ResponseError::ProcessingError,
            other => ResponseError::Other(other),
        }
    }

    /// True for `NoAgentXError`.
    pub fn is_ok(self) -> bool {
        self == ResponseError::NoAgentXError
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        ResponseError::NoAgentXError
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseError::Other(code) => write!(f, "unknown error code {}", code),
            known => write!(f, "{:?} ({})", known, known.code()),
        }
    }
}

/// Translates a Response error code into a local error.
///
/// `NoAgentXError` yields `Ok`. Codes with a dedicated local meaning are
/// translated only when listed in `expected`; any other code the master
/// should not have sent for this request is reported as [`Error::Parse`].
pub(crate) fn check_response(error: ResponseError, expected: &[ResponseError]) -> Result<()> {
    match error {
        ResponseError::NoAgentXError => Ok(()),
        // We checked the connection before sending, so the session was lost
        // while the request was in flight.
        ResponseError::NotOpen => Err(Error::Disconnected),
        ResponseError::ProcessingError => Err(Error::MasterUnable),
        // The master could not parse what we sent.
        ResponseError::ParseError | ResponseError::UnsupportedContext => Err(Error::Parse(
            format!("master agent rejected request: {}", error),
        )),
        e if expected.contains(&e) => Err(match e {
            ResponseError::DuplicateRegistration => Error::DuplicateRegistration,
            ResponseError::UnknownRegistration => Error::UnknownRegistration,
            ResponseError::RequestDenied => Error::MasterUnwilling,
            other => Error::Protocol(other),
        }),
        other => Err(Error::Parse(format!(
            "unexpected error in response: {}",
            other
        ))),
    }
}
