use std::fmt;
use std::io;
use std::path::PathBuf;

/// Crate-wide error type.
///
/// Configuration and I/O errors are fatal; data errors (bad lineage strings,
/// unknown taxa) are recovered locally by callers and never reach here except
/// when a caller chooses to escalate them (e.g. an empty taxonomy after a
/// full pass).
#[derive(Debug)]
pub enum Error {
    Config(String),
    Io { path: Option<PathBuf>, source: io::Error },
    Data(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn data<S: Into<String>>(msg: S) -> Self {
        Error::Data(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: Some(path.into()), source }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Io { path: Some(p), source } => {
                write!(f, "io error at {}: {}", p.display(), source)
            }
            Error::Io { path: None, source } => write!(f, "io error: {}", source),
            Error::Data(msg) => write!(f, "data error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io { path: None, source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Data(source.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
