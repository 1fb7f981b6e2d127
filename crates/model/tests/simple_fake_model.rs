use std::error::Error;
use std::fmt::{self, Display, Formatter};

use agentkit_model::{
    ErrorKind, GenerationConfig, ModelId, ModelProvider, ModelProviderError,
    ModelResponse, ResponseChunk, ResponseMode, SessionRequest, Turn,
    TurnRole,
};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct FakeSession {
    history_len: usize,
}

/// Echoes the input back, one word per chunk.
struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Session = FakeSession;

    fn start_session(
        &self,
        req: &SessionRequest<'_>,
    ) -> Result<Self::Session, Self::Error> {
        if req.api_key.is_empty() {
            return Err(FakeModelProviderError(ErrorKind::InvalidRequest));
        }
        Ok(FakeSession {
            history_len: req.history.len(),
        })
    }

    fn send(
        &self,
        session: &mut Self::Session,
        text: &str,
        mode: ResponseMode,
    ) -> Result<ModelResponse<Self::Error>, Self::Error> {
        if text.is_empty() {
            return Err(FakeModelProviderError(ErrorKind::Other));
        }
        let reply = format!("You said {} after {}", text, session.history_len);
        session.history_len += 2;

        Ok(match mode {
            ResponseMode::Single => ModelResponse::Single(Some(reply)),
            ResponseMode::Stream => {
                let words: Vec<_> = reply
                    .split(' ')
                    .map(|w| Ok(ResponseChunk::with_text(format!("{w} "))))
                    .collect();
                ModelResponse::from_chunks(words)
            }
        })
    }
}

fn collect(resp: ModelResponse<FakeModelProviderError>) -> String {
    match resp {
        ModelResponse::Single(text) => text.unwrap_or_default(),
        ModelResponse::Stream(chunks) => chunks
            .map(|chunk| chunk.unwrap().text.unwrap_or_default())
            .collect(),
    }
}

#[test]
fn test_completion() {
    let provider = FakeModelProvider;
    let generation = GenerationConfig::default();
    let history = vec![Turn {
        role: TurnRole::User,
        content: "Hi".to_owned(),
    }];
    let req = SessionRequest {
        model: ModelId::GeminiPro,
        api_key: "key",
        generation: &generation,
        history: &history,
    };

    let mut session = provider.start_session(&req).unwrap();
    let resp = provider
        .send(&mut session, "Good morning", ResponseMode::Single)
        .unwrap();
    assert_eq!(collect(resp), "You said Good morning after 1");

    let resp = provider
        .send(&mut session, "Bye", ResponseMode::Stream)
        .unwrap();
    assert_eq!(collect(resp), "You said Bye after 3 ");
}

#[test]
fn test_error() {
    let provider = FakeModelProvider;
    let generation = GenerationConfig::default();
    let req = SessionRequest {
        model: ModelId::GeminiPro,
        api_key: "",
        generation: &generation,
        history: &[],
    };
    let err = provider.start_session(&req).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}
