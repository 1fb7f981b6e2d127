//! A model provider for the Gemini REST API.
//!
//! Every call is blocking. The provider is meant to be driven from a
//! regular thread or a blocking worker, never directly from async code.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};

use agentkit_model::{
    ErrorKind, GenerationConfig, ModelId, ModelProvider, ModelProviderError,
    ModelResponse, ResponseMode, SessionRequest,
};
use mime::Mime;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header;

pub use config::{GeminiConfig, GeminiConfigBuilder};
use io::{Chunks, Sse};
use proto::{Content, ErrorResponse, GenerateContentResponse};
use response::SseChunks;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Error type for [`GeminiProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A conversation opened by [`GeminiProvider`].
///
/// The REST API is stateless, so a session is a snapshot of the history
/// plus the HTTP client used to send it. The client is created with the
/// session, which keeps its construction and teardown on the thread that
/// drives the call.
pub struct GeminiSession {
    client: Client,
    model: ModelId,
    api_key: String,
    generation: GenerationConfig,
    history: Vec<Content>,
}

/// Gemini model provider.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self, model: ModelId, mode: ResponseMode) -> String {
        let base_url = &self.config.base_url;
        match mode {
            ResponseMode::Single => {
                format!("{base_url}/models/{model}:generateContent")
            }
            ResponseMode::Stream => {
                format!("{base_url}/models/{model}:streamGenerateContent?alt=sse")
            }
        }
    }
}

impl ModelProvider for GeminiProvider {
    type Error = Error;
    type Session = GeminiSession;

    fn start_session(
        &self,
        req: &SessionRequest<'_>,
    ) -> Result<Self::Session, Self::Error> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        debug!(
            "starting a session for {} with {} history turns",
            req.model,
            req.history.len()
        );
        Ok(GeminiSession {
            client,
            model: req.model,
            api_key: req.api_key.to_owned(),
            generation: *req.generation,
            history: req.history.iter().map(proto::create_content).collect(),
        })
    }

    fn send(
        &self,
        session: &mut Self::Session,
        text: &str,
        mode: ResponseMode,
    ) -> Result<ModelResponse<Self::Error>, Self::Error> {
        let body =
            proto::create_request(&session.history, text, &session.generation);
        let resp = session
            .client
            .post(self.endpoint(session.model, mode))
            .header(API_KEY_HEADER, &session.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        let resp = check_status(resp)?;

        match mode {
            ResponseMode::Single => {
                let resp: GenerateContentResponse = resp.json().map_err(
                    |err| Error::new(format!("{err}"), ErrorKind::Other),
                )?;
                if let Some(reason) = resp.block_reason() {
                    return Err(Error::new(
                        format!("prompt blocked: {reason}"),
                        ErrorKind::Moderated,
                    ));
                }
                Ok(ModelResponse::Single(resp.text()))
            }
            ResponseMode::Stream => {
                let content_type = resp
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok());
                let is_valid_content_type = content_type
                    .and_then(|v| v.parse().ok())
                    .map(|m: Mime| m.subtype() == mime::EVENT_STREAM)
                    .unwrap_or(false);
                if !is_valid_content_type {
                    return Err(Error::new(
                        format!("Unexpected content type: {content_type:?}"),
                        ErrorKind::Other,
                    ));
                }

                // Here we got a successful response.
                let chunks = Chunks::from_response(resp);
                let sse = Sse::new(chunks);
                Ok(ModelResponse::Stream(Box::new(SseChunks::new(sse))))
            }
        }
    }
}

fn check_status(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.json::<ErrorResponse>() {
        Ok(body) => format!("{status}: {}", body.error.message),
        Err(_) => format!("{status}"),
    };
    Err(Error::new(message, error_kind_for_status(status)))
}

#[inline]
fn error_kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
        StatusCode::BAD_REQUEST => ErrorKind::InvalidRequest,
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let provider = GeminiProvider::new(
            GeminiConfigBuilder::new()
                .with_base_url("http://localhost")
                .build(),
        );
        assert_eq!(
            provider.endpoint(ModelId::GeminiPro, ResponseMode::Single),
            "http://localhost/models/gemini-pro:generateContent"
        );
        assert_eq!(
            provider.endpoint(ModelId::GeminiProVision, ResponseMode::Stream),
            "http://localhost/models/gemini-pro-vision:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_kind_for_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorKind::RateLimitExceeded
        );
        assert_eq!(
            error_kind_for_status(StatusCode::BAD_REQUEST),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            error_kind_for_status(StatusCode::SERVICE_UNAVAILABLE),
            ErrorKind::Other
        );
    }
}
