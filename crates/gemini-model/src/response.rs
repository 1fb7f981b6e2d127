use agentkit_model::{ErrorKind, ResponseChunk};

use crate::Error;
use crate::io::Sse;
use crate::proto::GenerateContentResponse;

/// Turns the server-sent events of `streamGenerateContent` into chunks.
///
/// The iterator is fused: after the body ends or an error is returned it
/// only yields `None`.
pub struct SseChunks {
    sse: Option<Sse>,
}

impl SseChunks {
    #[inline]
    pub fn new(sse: Sse) -> Self {
        Self { sse: Some(sse) }
    }

    fn next_chunk(sse: &mut Sse) -> Result<Option<ResponseChunk>, Error> {
        let event = match sse.next_event() {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(None),
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {event}");

        let chunk = serde_json::from_str::<GenerateContentResponse>(&event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(reason) = chunk.block_reason() {
            return Err(Error::new(
                format!("prompt blocked: {reason}"),
                ErrorKind::Moderated,
            ));
        }
        Ok(Some(ResponseChunk { text: chunk.text() }))
    }
}

impl Iterator for SseChunks {
    type Item = Result<ResponseChunk, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let sse = self.sse.as_mut()?;
        match Self::next_chunk(sse) {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.sse = None;
                None
            }
            Err(err) => {
                self.sse = None;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use agentkit_model::ModelProviderError;
    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    #[test]
    fn test_simple_events() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(include_bytes!(
                "../fixtures/stream_response.txt"
            ))]
            .into(),
        );
        let chunks: Vec<_> = SseChunks::new(Sse::new(chunks))
            .map(|c| c.unwrap().text)
            .collect();
        assert_eq!(
            chunks,
            [
                Some("Fala, ".to_owned()),
                Some(String::new()),
                Some("galera!".to_owned())
            ]
        );
    }

    #[test]
    fn test_blocked_prompt() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(
                    b"data: {\"promptFeedback\": {\"blockReason\": \"SAFETY\"}}\n\n",
                ),
                Bytes::from_static(b"data: {}\n\n"),
            ]
            .into(),
        );
        let mut chunks = SseChunks::new(Sse::new(chunks));
        let err = chunks.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
        assert!(chunks.next().is_none());
    }
}
