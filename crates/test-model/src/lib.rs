//! A local fake model for testing purpose.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::sleep;
use std::time::Duration;

use agentkit_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelResponse,
    ResponseChunk, ResponseMode, SessionRequest, Turn,
};

pub use preset::*;

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
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A session of [`TestModelProvider`], which only remembers its history.
#[derive(Clone, Debug)]
pub struct TestSession {
    history: Vec<Turn>,
}

impl TestSession {
    /// Returns the history this session was opened with.
    #[inline]
    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

struct ScriptEntry {
    preset: PresetResponse,
    attempts: u64,
}

#[derive(Default)]
struct Inner {
    script: Mutex<HashMap<String, ScriptEntry>>,
    delay: Mutex<Option<Duration>>,
    last_history: Mutex<Vec<Turn>>,
    send_count: AtomicU64,
    session_count: AtomicU64,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to a prompt. Responses are selected by the text of
/// the current turn. If there is no preset for a prompt, an error will be
/// returned.
///
/// Clones share the script and the counters, so a test can keep one clone
/// for inspection after handing another to the code under test.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    inner: Arc<Inner>,
}

impl TestModelProvider {
    /// Registers the response for `prompt`, replacing any previous one.
    #[inline]
    pub fn add_response<S: Into<String>>(
        &self,
        prompt: S,
        preset: PresetResponse,
    ) {
        let entry = ScriptEntry {
            preset,
            attempts: 0,
        };
        lock(&self.inner.script).insert(prompt.into(), entry);
    }

    /// Sleeps for `duration` before producing every chunk.
    #[inline]
    pub fn set_delay(&self, duration: Duration) {
        *lock(&self.inner.delay) = Some(duration);
    }

    /// Returns how many times [`ModelProvider::send`] has been called.
    #[inline]
    pub fn send_count(&self) -> u64 {
        self.inner.send_count.load(Ordering::SeqCst)
    }

    /// Returns how many sessions have been started.
    #[inline]
    pub fn session_count(&self) -> u64 {
        self.inner.session_count.load(Ordering::SeqCst)
    }

    /// Returns the history of the most recently started session.
    #[inline]
    pub fn last_history(&self) -> Vec<Turn> {
        lock(&self.inner.last_history).clone()
    }

    fn next_attempt(&self, prompt: &str) -> Result<PresetResponse, Error> {
        let mut script = lock(&self.inner.script);
        let Some(entry) = script.get_mut(prompt) else {
            return Err(Error::new(
                format!("no preset for `{prompt}`"),
                ErrorKind::Other,
            ));
        };
        entry.attempts += 1;
        match entry.preset.failures {
            Some(0) => Err(Error::new("always failing", ErrorKind::Other)),
            Some(n) if entry.attempts <= n => Err(Error::new(
                format!("failing attempt {}", entry.attempts),
                ErrorKind::RateLimitExceeded,
            )),
            _ => Ok(entry.preset.clone()),
        }
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Session = TestSession;

    fn start_session(
        &self,
        req: &SessionRequest<'_>,
    ) -> Result<Self::Session, Self::Error> {
        self.inner.session_count.fetch_add(1, Ordering::SeqCst);
        *lock(&self.inner.last_history) = req.history.to_vec();
        Ok(TestSession {
            history: req.history.to_vec(),
        })
    }

    fn send(
        &self,
        _session: &mut Self::Session,
        text: &str,
        mode: ResponseMode,
    ) -> Result<ModelResponse<Self::Error>, Self::Error> {
        self.inner.send_count.fetch_add(1, Ordering::SeqCst);
        let preset = self.next_attempt(text)?;

        if mode == ResponseMode::Single {
            let mut payload: Option<String> = None;
            for event in preset.events {
                match event {
                    PresetEvent::Text(t) => {
                        payload.get_or_insert_with(String::new).push_str(&t)
                    }
                    PresetEvent::Blank => {}
                    PresetEvent::Error(message) => {
                        return Err(Error::new(message, ErrorKind::Other));
                    }
                }
            }
            return Ok(ModelResponse::Single(payload));
        }

        let delay = *lock(&self.inner.delay);
        let chunks = preset.events.into_iter().map(move |event| {
            if let Some(delay) = delay {
                sleep(delay);
            }
            match event {
                PresetEvent::Text(t) => Ok(ResponseChunk::with_text(t)),
                PresetEvent::Blank => Ok(ResponseChunk::default()),
                PresetEvent::Error(message) => {
                    Err(Error::new(message, ErrorKind::Other))
                }
            }
        });
        Ok(ModelResponse::from_chunks(chunks))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
