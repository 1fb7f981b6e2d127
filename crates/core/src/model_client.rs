
use std::fmt::{self, Debug};
use std::mem;
use std::sync::Arc;

use agentkit_model::{
    Message, ModelProvider, ModelResponse, ResponseMode, SessionRequest,
};
use futures_util::StreamExt;
use tokio::sync::Semaphore;
use tracing::Span;

use crate::bridge::{self, FragmentStream};
use crate::cache::{TtlCache, fingerprint};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::formatter::PreparedConversation;
use crate::fragment::Fragment;
use crate::metrics::{Metrics, MetricsRecorder};
use crate::rate_limit::RateLimiter;
use crate::retry::retry_with_backoff;
use crate::stream::{DynProviderError, ResponseProcessor};
use crate::tokens::approximate_tokens;

type DispatchResult =
    Result<ModelResponse<DynProviderError>, DynProviderError>;
#[rustfmt::skip]
type DispatchFn = Arc<
    dyn Fn(&SessionRequest<'_>, &str, ResponseMode) -> DispatchResult
        + Send + Sync
>;

/// A resilient client around a model provider.
///
/// The client validates conversations, answers repeated ones from a cache,
/// spaces and retries provider calls, and reports everything it does in
/// [`Metrics`]. Clones share the same cache, limiter and counters.
///
/// The top-level calls never fail: any error is turned into a single
/// fragment describing it (see [`Fragment::is_error`]).
#[derive(Clone)]
pub struct ModelClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    dispatch_fn: DispatchFn,
    cache: TtlCache,
    limiter: RateLimiter,
    metrics: Arc<MetricsRecorder>,
    workers: Arc<Semaphore>,
}

impl ModelClient {
    /// Creates a client that sends its calls to `provider`.
    pub fn new<P: ModelProvider + 'static>(
        provider: P,
        config: ClientConfig,
    ) -> Self {
        // Sessions are provider specific, so they are opened and used
        // inside the erased closure and never leave it.
        let dispatch_fn: DispatchFn = Arc::new(
            move |req: &SessionRequest<'_>,
                  text: &str,
                  mode: ResponseMode|
                  -> DispatchResult {
                let mut session =
                    provider.start_session(req).map_err(erase_error::<P>)?;
                debug!("opened a session with {} turns", req.history.len());
                let resp = provider
                    .send(&mut session, text, mode)
                    .map_err(erase_error::<P>)?;
                Ok(resp.map_err(erase_error::<P>))
            },
        );

        let inner = ClientInner {
            cache: TtlCache::new(config.cache_ttl),
            limiter: RateLimiter::new(config.min_request_interval),
            metrics: Arc::default(),
            workers: Arc::new(Semaphore::new(config.max_workers)),
            dispatch_fn,
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Starts a call and returns its fragments as a blocking iterator.
    ///
    /// Nothing happens until the iterator is first advanced. Advancing it
    /// blocks the calling thread on rate limiting, retries and the
    /// provider itself.
    #[inline]
    pub fn stream(&self, messages: Vec<Message>) -> ResponseStream {
        ResponseStream {
            inner: Arc::clone(&self.inner),
            state: CallState::Init(messages),
            span: trace_span!("model client req"),
        }
    }

    /// Runs a call to completion and merges its fragments into one.
    ///
    /// The result is an empty fragment if the call produced none.
    pub fn invoke(&self, messages: Vec<Message>) -> Fragment {
        let mut merged: Option<Fragment> = None;
        for fragment in self.stream(messages) {
            merge_into(&mut merged, fragment);
        }
        merged.unwrap_or_default()
    }

    /// Starts a call on a blocking worker and returns its fragments as an
    /// asynchronous stream.
    ///
    /// At most `max_workers` calls run at the same time, later ones wait
    /// for a free slot. Dropping the stream early does not interrupt the
    /// call; the worker finishes it in the background, so the cache and the
    /// metrics are still updated.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn stream_async(&self, messages: Vec<Message>) -> FragmentStream {
        bridge::spawn(
            self.stream(messages),
            Arc::clone(&self.inner.workers),
            self.inner.config.channel_capacity,
        )
    }

    /// The asynchronous counterpart of [`ModelClient::invoke`].
    pub async fn invoke_async(&self, messages: Vec<Message>) -> Fragment {
        let mut fragments = self.stream_async(messages);
        let mut merged: Option<Fragment> = None;
        while let Some(fragment) = fragments.next().await {
            merge_into(&mut merged, fragment);
        }
        merged.unwrap_or_default()
    }

    /// Returns a snapshot of the counters.
    #[inline]
    pub fn metrics(&self) -> Metrics {
        self.inner.metrics.snapshot()
    }

    /// Sets every counter back to zero.
    #[inline]
    pub fn reset_metrics(&self) {
        self.inner.metrics.reset();
    }

    /// Forgets every cached answer.
    #[inline]
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Returns the configuration of this client.
    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl Debug for ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// The fragments of one call, produced on demand.
///
/// The first advance runs validation, the cache lookup and the dispatch.
/// Every call ends with either the success or the failure counter bumped
/// once, unless the iterator is dropped before it is exhausted.
pub struct ResponseStream {
    inner: Arc<ClientInner>,
    state: CallState,
    span: Span,
}

enum CallState {
    Init(Vec<Message>),
    Streamed {
        fragments: ResponseProcessor,
        key: String,
        transcript: String,
    },
    Done,
}

enum Dispatched {
    Cached(String),
    Fresh {
        fragments: ResponseProcessor,
        key: String,
    },
}

impl Iterator for ResponseStream {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        let _entered = self.span.enter();
        loop {
            match mem::replace(&mut self.state, CallState::Done) {
                CallState::Init(messages) => {
                    self.inner.metrics.record_request();
                    trace!("got a request: {messages:?}");
                    match self.inner.dispatch(&messages) {
                        Ok(Dispatched::Cached(text)) => {
                            return Some(Fragment::cached(text));
                        }
                        Ok(Dispatched::Fresh { fragments, key }) => {
                            self.state = CallState::Streamed {
                                fragments,
                                key,
                                transcript: String::new(),
                            };
                        }
                        Err(err) => return Some(self.inner.fail(err)),
                    }
                }
                CallState::Streamed {
                    mut fragments,
                    key,
                    mut transcript,
                } => match fragments.next() {
                    Some(Ok(fragment)) => {
                        transcript.push_str(&fragment.content);
                        self.state = CallState::Streamed {
                            fragments,
                            key,
                            transcript,
                        };
                        return Some(fragment);
                    }
                    Some(Err(err)) => return Some(self.inner.fail(err)),
                    None => {
                        self.inner.store(key, transcript);
                        trace!("finished a request");
                        return None;
                    }
                },
                CallState::Done => return None,
            }
        }
    }
}

impl ClientInner {
    fn validate(&self, conversation: &[Message]) -> Result<()> {
        let tokens: usize = conversation
            .iter()
            .map(|msg| approximate_tokens(msg.content()))
            .sum();
        if tokens > self.config.context_window {
            return Err(Error::validation().with_reason(format!(
                "conversation has {tokens} tokens, the limit is {}",
                self.config.context_window
            )));
        }
        Ok(())
    }

    fn dispatch(&self, messages: &[Message]) -> Result<Dispatched> {
        let conversation = PreparedConversation::new(messages)?;
        self.validate(messages)?;

        let key = fingerprint(messages);
        if let Some(text) = self.cache.get(&key) {
            debug!("answered from the cache");
            self.metrics.record_cache_hit();
            self.metrics.record_success();
            return Ok(Dispatched::Cached(text));
        }

        self.limiter.acquire();

        let req = SessionRequest {
            model: self.config.model,
            api_key: &self.config.api_key,
            generation: &self.config.generation,
            history: conversation.history(),
        };
        let text = &conversation.current().content;
        let mode = self.config.response_mode;
        let resp = retry_with_backoff(
            &self.config.retry,
            |attempt| {
                trace!("sending attempt {attempt} in {mode:?} mode");
                (self.dispatch_fn)(&req, text, mode)
            },
            |err, wait| {
                warn!("provider failed: {err}, retrying in {wait:?}");
                self.metrics.record_retry();
            },
        )
        .map_err(Error::provider)?;
        trace!("got a response: {resp:?}");

        Ok(Dispatched::Fresh {
            fragments: ResponseProcessor::new(resp, Arc::clone(&self.metrics)),
            key,
        })
    }

    fn store(&self, key: String, transcript: String) {
        if transcript.trim().is_empty() {
            return;
        }
        debug!("caching an answer of {} bytes", transcript.len());
        self.cache.set(key, transcript);
    }

    fn fail(&self, err: Error) -> Fragment {
        error!("request failed: {err}");
        self.metrics.record_failure();
        Fragment::error(&err)
    }
}

#[inline]
fn erase_error<P: ModelProvider + 'static>(err: P::Error) -> DynProviderError {
    Box::new(err)
}

fn merge_into(merged: &mut Option<Fragment>, fragment: Fragment) {
    match merged.as_mut() {
        Some(merged) => {
            merged.content.push_str(&fragment.content);
            if fragment.is_error() {
                merged.role = fragment.role;
                merged.metadata = fragment.metadata;
            }
        }
        None => *merged = Some(fragment),
    }
}
