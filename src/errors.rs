use std::io::Error as IOError;
use std::path::PathBuf;

use crate::codec::{EncodingError, LayoutError};
use crate::fixed_str::FixedStrErr;
use crate::uapi::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The chip device could not be opened, or is not a GPIO chip
    #[error("Failed to open GPIO chip {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: IOError,
    },
    #[error("Invalid request: {0}")]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The kernel refused an ioctl
    #[error("{command} rejected: {source}")]
    CommandRejected {
        command: Command,
        #[source]
        source: nix::errno::Errno,
    },
    /// Reading the event stream failed; the stream is finished
    #[error("Failed to read event: {0}")]
    Stream(#[source] IOError),
    #[error(transparent)]
    CallerMisuse(#[from] Misuse),
    #[error(transparent)]
    Io(#[from] IOError),
}

/// An operation that needs a granted request was called without one
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Misuse {
    #[error("Request has not been granted a file descriptor by the kernel")]
    Unclaimed,
    #[error("{0} has already been released")]
    Released(&'static str),
}

impl Error {
    /// The errno behind a kernel rejection, if that is what this is
    pub fn errno(&self) -> Option<nix::errno::Errno> {
        match self {
            Error::CommandRejected { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn is_caller_misuse(&self) -> bool {
        matches!(self, Error::CallerMisuse(_))
    }
}

impl From<FixedStrErr> for Error {
    fn from(err: FixedStrErr) -> Self {
        Error::Encoding(err.into())
    }
}
