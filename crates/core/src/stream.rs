//! Turns a raw provider answer into a uniform sequence of fragments.

use std::iter::FusedIterator;
use std::sync::Arc;

use agentkit_model::{ChunkStream, ModelProviderError, ModelResponse};

use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::metrics::MetricsRecorder;
use crate::tokens::approximate_tokens;

/// A provider error with its concrete type erased.
pub type DynProviderError = Box<dyn ModelProviderError>;

/// Consumes one [`ModelResponse`] lazily and yields its fragments.
///
/// Blank pieces of text are skipped. Every yielded fragment adds its
/// approximate token count to the metrics, and the success counter is
/// bumped once the response is exhausted without an error. After the first
/// error the processor is finished.
pub struct ResponseProcessor {
    state: State,
    metrics: Arc<MetricsRecorder>,
}

enum State {
    Single(Option<String>),
    Stream { chunks: ChunkStream<DynProviderError>, emitted: bool },
    Finished,
    Done,
}

impl ResponseProcessor {
    /// Creates a processor reporting to `metrics`.
    #[inline]
    pub fn new(
        response: ModelResponse<DynProviderError>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let state = match response {
            ModelResponse::Single(text) => State::Single(text),
            ModelResponse::Stream(chunks) => State::Stream {
                chunks,
                emitted: false,
            },
        };
        Self { state, metrics }
    }

    fn finish(&self) {
        trace!("response finished");
        self.metrics.record_success();
    }

    fn emit(&self, text: String) -> Fragment {
        self.metrics.add_tokens(approximate_tokens(&text));
        Fragment::new(text)
    }

    fn next_from_stream(&mut self) -> Option<Result<Fragment>> {
        loop {
            let State::Stream { chunks, emitted } = &mut self.state else {
                return None;
            };
            match chunks.next() {
                Some(Ok(chunk)) => {
                    let Some(text) = chunk.text else {
                        trace!("skipped a chunk without text");
                        *emitted = true;
                        continue;
                    };
                    *emitted = true;
                    if text.trim().is_empty() {
                        trace!("skipped a blank chunk");
                        continue;
                    }
                    trace!("got a chunk: {text:?}");
                    return Some(Ok(self.emit(text)));
                }
                Some(Err(err)) => {
                    error!("stream failed: {err}");
                    self.state = State::Done;
                    return Some(Err(Error::provider(err)));
                }
                None => {
                    let seen_any = *emitted;
                    self.state = State::Done;
                    if !seen_any {
                        return Some(Err(Error::empty_response()
                            .with_reason("provider returned no chunks")));
                    }
                    self.finish();
                    return None;
                }
            }
        }
    }
}

impl Iterator for ResponseProcessor {
    type Item = Result<Fragment>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Single(text) => {
                let Some(text) = text.filter(|text| !text.trim().is_empty())
                else {
                    return Some(Err(Error::empty_response()
                        .with_reason("provider returned no text")));
                };
                self.state = State::Finished;
                Some(Ok(self.emit(text)))
            }
            state @ State::Stream { .. } => {
                self.state = state;
                self.next_from_stream()
            }
            State::Finished => {
                self.finish();
                None
            }
            State::Done => None,
        }
    }
}

impl FusedIterator for ResponseProcessor {}
