//! Construction-time configuration of a [`ModelClient`](crate::ModelClient).

use std::env;
use std::fmt::{self, Debug};
use std::time::Duration;

use agentkit_model::{GenerationConfig, ModelId, ResponseMode};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Environment variables consulted for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_CONTEXT_WINDOW: usize = 32768;
const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Builder for [`ClientConfig`].
#[derive(Clone, Default)]
pub struct ClientConfigBuilder {
    model: Option<String>,
    api_key: Option<String>,
    generation: Option<GenerationConfig>,
    response_mode: Option<ResponseMode>,
    retry: Option<RetryPolicy>,
    cache_ttl: Option<Duration>,
    min_request_interval: Option<Duration>,
    context_window: Option<usize>,
    max_workers: Option<usize>,
    channel_capacity: Option<usize>,
}

impl ClientConfigBuilder {
    /// Creates a builder with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model identifier. It is checked against the allow-list
    /// when building.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API key instead of reading it from the environment.
    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the sampling parameters.
    #[inline]
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Overrides the model's default response mode.
    #[inline]
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = Some(mode);
        self
    }

    /// Sets the retry policy of provider calls.
    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets how long a completed answer stays cached.
    #[inline]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the minimum spacing between two provider calls.
    #[inline]
    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = Some(interval);
        self
    }

    /// Sets the largest accepted conversation, in approximate tokens.
    #[inline]
    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = Some(tokens);
        self
    }

    /// Sets how many asynchronous calls may run at the same time.
    #[inline]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Sets how many fragments may be buffered for an asynchronous caller.
    #[inline]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    /// Builds the configuration, reading the API key from the environment
    /// if none was given.
    #[inline]
    pub fn build(self) -> Result<ClientConfig> {
        self.build_with_env(|name| env::var(name).ok())
    }

    /// Builds the configuration, resolving environment variables through
    /// `lookup`.
    pub fn build_with_env<L>(self, lookup: L) -> Result<ClientConfig>
    where
        L: Fn(&str) -> Option<String>,
    {
        let model = match self.model {
            Some(model) => model.parse::<ModelId>().map_err(|err| {
                Error::configuration().with_reason(err.to_string())
            })?,
            None => ModelId::default(),
        };

        let api_key = self
            .api_key
            .or_else(|| API_KEY_VARS.iter().find_map(|name| lookup(name)))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration().with_reason(format!(
                    "no API key, set {}",
                    API_KEY_VARS.join(" or ")
                ))
            })?;

        let retry = self.retry.unwrap_or_default();
        if retry.max_attempts == 0 {
            return Err(Error::configuration()
                .with_reason("retry policy needs at least one attempt"));
        }
        let base = retry.backoff_base;
        if base.is_nan() || base.is_infinite() || base < 1.0 {
            return Err(Error::configuration()
                .with_reason("backoff base must be a finite number >= 1"));
        }

        let max_workers = self.max_workers.unwrap_or(DEFAULT_MAX_WORKERS);
        let channel_capacity =
            self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        if max_workers == 0 || channel_capacity == 0 {
            return Err(Error::configuration()
                .with_reason("worker and channel bounds must be positive"));
        }

        Ok(ClientConfig {
            model,
            api_key,
            generation: self.generation.unwrap_or_default(),
            response_mode: self
                .response_mode
                .unwrap_or_else(|| model.default_mode()),
            retry,
            cache_ttl: self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
            min_request_interval: self
                .min_request_interval
                .unwrap_or(DEFAULT_MIN_REQUEST_INTERVAL),
            context_window: self
                .context_window
                .unwrap_or(DEFAULT_CONTEXT_WINDOW),
            max_workers,
            channel_capacity,
        })
    }
}

impl Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("generation", &self.generation)
            .field("response_mode", &self.response_mode)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Immutable configuration of a client instance.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    pub(crate) model: ModelId,
    pub(crate) api_key: String,
    pub(crate) generation: GenerationConfig,
    pub(crate) response_mode: ResponseMode,
    pub(crate) retry: RetryPolicy,
    pub(crate) cache_ttl: Duration,
    pub(crate) min_request_interval: Duration,
    pub(crate) context_window: usize,
    pub(crate) max_workers: usize,
    pub(crate) channel_capacity: usize,
}

impl ClientConfig {
    /// Returns the model this client talks to.
    #[inline]
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Returns the sampling parameters.
    #[inline]
    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Returns the mode provider calls are made with.
    #[inline]
    pub fn response_mode(&self) -> ResponseMode {
        self.response_mode
    }

    /// Returns the retry policy.
    #[inline]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns how long completed answers stay cached.
    #[inline]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Returns the minimum spacing between provider calls.
    #[inline]
    pub fn min_request_interval(&self) -> Duration {
        self.min_request_interval
    }

    /// Returns the largest accepted conversation in approximate tokens.
    #[inline]
    pub fn context_window(&self) -> usize {
        self.context_window
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("model", &self.model)
            .field("api_key", &"<deducted>")
            .field("generation", &self.generation)
            .field("response_mode", &self.response_mode)
            .field("retry", &self.retry)
            .field("cache_ttl", &self.cache_ttl)
            .field("min_request_interval", &self.min_request_interval)
            .field("context_window", &self.context_window)
            .field("max_workers", &self.max_workers)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}
