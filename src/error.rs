use std::io::{self, ErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The peer went away or stalled; only the current connection is lost.
    #[error("connection unusable: {source}")]
    Unusable {
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure. Not recoverable.
    #[error(transparent)]
    Io(io::Error),

    /// The source file yielded fewer bytes than its size promised.
    #[error("source ended early: expected {expected} bytes, read {read}")]
    SourceShrunk { expected: u64, read: u64 },

    #[error("file of {0} bytes does not fit in a 32-bit length")]
    TooLarge(u64),
}

impl Error {
    /// Classify a socket error as peer-disconnect-like or fatal.
    pub fn classify(e: io::Error) -> Self {
        match e.kind() {
            ErrorKind::TimedOut
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::WriteZero => Error::Unusable { source: e },
            _ => Error::Io(e),
        }
    }

    pub fn is_unusable(&self) -> bool {
        matches!(self, Error::Unusable { .. })
    }
}
