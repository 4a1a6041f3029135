use thiserror::Error;

/// An error that occurred while parsing a duration string.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid duration '{0}'")]
    Syntax(String),
    #[error("unit '{0}' not supported")]
    UnitNotSupported(String),
    #[error("duration '{0}' is out of range")]
    OutOfRange(String),
}
