use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

use agentkit_model::ModelProviderError;

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The conversation was rejected before reaching the provider.
    Validation,
    /// The provider answered without any text.
    EmptyResponse,
    /// The provider itself failed.
    Provider,
    /// The client could not be configured.
    Configuration,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "Validation error"),
            ErrorKind::EmptyResponse => write!(f, "Empty response"),
            ErrorKind::Provider => write!(f, "Provider error"),
            ErrorKind::Configuration => write!(f, "Configuration error"),
        }
    }
}

/// The error type of the client.
///
/// Only [`ErrorKind::Provider`] errors are ever retried.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
    source: Option<Box<dyn ModelProviderError>>,
}

/// A specialized `Result` for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Creates a new error with the `Validation` kind.
    #[inline]
    pub fn validation() -> Self {
        Self::new(ErrorKind::Validation)
    }

    /// Creates a new error with the `EmptyResponse` kind.
    #[inline]
    pub fn empty_response() -> Self {
        Self::new(ErrorKind::EmptyResponse)
    }

    /// Creates a new error with the `Configuration` kind.
    #[inline]
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Wraps an error raised by the provider boundary.
    #[inline]
    pub fn provider(source: Box<dyn ModelProviderError>) -> Self {
        Self {
            kind: ErrorKind::Provider,
            reason: None,
            source: Some(source),
        }
    }

    #[inline]
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            reason: None,
            source: None,
        }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the provider error behind a `Provider` error.
    #[inline]
    pub fn provider_error(&self) -> Option<&dyn ModelProviderError> {
        self.source.as_deref()
    }

    /// Returns the reason for the error.
    pub fn reason(&self) -> Cow<'_, str> {
        if let Some(reason) = self.reason.as_deref() {
            return Cow::Borrowed(reason);
        }
        match &self.source {
            Some(source) => Cow::Owned(format!("{source}")),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, &self.source) {
            (None, None) => write!(f, "{}", self.kind),
            _ => write!(f, "{}: {}", self.kind, self.reason()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Formatter;

    use agentkit_model::ErrorKind as ProviderErrorKind;

    use super::*;

    #[derive(Debug)]
    struct Unavailable;

    impl Display for Unavailable {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "service unavailable")
        }
    }

    impl StdError for Unavailable {}

    impl ModelProviderError for Unavailable {
        fn kind(&self) -> ProviderErrorKind {
            ProviderErrorKind::RateLimitExceeded
        }
    }

    #[test]
    fn test_display() {
        let err = Error::validation();
        assert_eq!(err.to_string(), "Validation error");
        assert_eq!(err.reason(), "Validation error");

        let err = Error::validation().with_reason("empty conversation");
        assert_eq!(err.to_string(), "Validation error: empty conversation");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_provider_source() {
        let err = Error::provider(Box::new(Unavailable));
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(err.to_string(), "Provider error: service unavailable");
        assert_eq!(
            err.provider_error().unwrap().kind(),
            ProviderErrorKind::RateLimitExceeded
        );
        assert!(err.source().is_some());
    }
}
