use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

impl HttpError {
    /// Returns true if this error was ultimately caused by the peer going away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            HttpError::RequestError { source } => source.is_disconnect(),
            HttpError::ResponseError { source } => source.is_disconnect(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Returns true if the error is an I/O failure caused by the peer going away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ParseError::Io { source } => is_disconnect_kind(source.kind()),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Returns true if the error is an I/O failure caused by the peer going away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            SendError::Io { source } => is_disconnect_kind(source.kind()),
            _ => false,
        }
    }
}

pub(crate) fn is_disconnect_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}
