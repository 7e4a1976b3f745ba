use thiserror::Error;

/// Failure taxonomy shared by the arithmetic and buffer-view layers.
///
/// The payload is the user-visible message; `Display` prints it verbatim so
/// callers can match exact text. Every error is raised synchronously at the
/// point of detection and never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed numeric literal text.
    #[error("{0}")]
    Parse(String),
    /// A value is outside the domain of the operation.
    #[error("{0}")]
    Range(String),
    /// The operation is structurally invalid for its target.
    #[error("{0}")]
    Type(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub(crate) fn range(message: impl Into<String>) -> Self {
        Error::Range(message.into())
    }

    pub(crate) fn ty(message: impl Into<String>) -> Self {
        Error::Type(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Parse(m) | Error::Range(m) | Error::Type(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_message() {
        let err = Error::range("0 is an invalid divisor value.");
        assert_eq!(err.to_string(), "0 is an invalid divisor value.");
        assert_eq!(err.message(), "0 is an invalid divisor value.");
    }
}
