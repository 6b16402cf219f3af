use std::{error::Error, fmt::Display};

/// Failures of the terminal UI.
#[derive(Debug)]
pub enum HunterGuiError {
    /// The terminal could not be set up, drawn to or read from.
    IOError(std::io::Error),
    /// There is nothing to choose from.
    NoPorts,
}

impl Display for HunterGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HunterGuiError::IOError(e) => write!(f, "terminal error: {}", e),
            HunterGuiError::NoPorts => write!(f, "no serial devices found"),
        }
    }
}

impl Error for HunterGuiError {}

impl From<std::io::Error> for HunterGuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}
