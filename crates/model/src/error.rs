use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The provider rejected the request as malformed.
    InvalidRequest,
    /// Any other errors.
    Other,
}

/// The error returned when a model identifier is not in the allow-list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnknownModelError(pub(crate) String);

impl UnknownModelError {
    /// Returns the identifier that was rejected.
    #[inline]
    pub fn identifier(&self) -> &str {
        &self.0
    }
}

impl Display for UnknownModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "model `{}` is not available, options: ", self.0)?;
        let names: Vec<_> =
            crate::ModelId::ALL.iter().map(|id| id.as_str()).collect();
        write!(f, "{}", names.join(", "))
    }
}

impl Error for UnknownModelError {}
