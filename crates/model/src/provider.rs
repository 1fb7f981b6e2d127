use std::error::Error;

use crate::error::ErrorKind;
use crate::generation::ResponseMode;
use crate::request::SessionRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a text-generation provider.
///
/// Both operations block the calling thread. Callers that live in an
/// asynchronous context are expected to move the work onto a blocking
/// worker themselves.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the provider should be prepared for being dropped anytime.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// A conversation opened with [`ModelProvider::start_session`].
    type Session: Send;

    /// Opens a session seeded with the history in `req`.
    fn start_session(
        &self,
        req: &SessionRequest<'_>,
    ) -> Result<Self::Session, Self::Error>;

    /// Sends `text` as the current user turn of `session`.
    ///
    /// Implementations should honor `mode`, but callers must handle
    /// whichever [`ModelResponse`] variant comes back.
    fn send(
        &self,
        session: &mut Self::Session,
        text: &str,
        mode: ResponseMode,
    ) -> Result<ModelResponse<Self::Error>, Self::Error>;
}
