use std::fmt::{self, Debug, Formatter};

/// One partial piece of a streamed answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResponseChunk {
    /// The incremental text, if the chunk carries any.
    pub text: Option<String>,
}

impl ResponseChunk {
    /// Creates a chunk carrying `text`.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// A lazy sequence of chunks. Pulling the next item may block.
pub type ChunkStream<E> =
    Box<dyn Iterator<Item = Result<ResponseChunk, E>> + Send>;

/// A raw answer from the provider.
///
/// The variant is decided by the [`ResponseMode`](crate::ResponseMode) the
/// call was made with, not by inspecting the payload.
pub enum ModelResponse<E> {
    /// A single completed response. The payload may be absent.
    Single(Option<String>),
    /// A sequence of partial chunks.
    Stream(ChunkStream<E>),
}

impl<E: Send + 'static> ModelResponse<E> {
    /// Creates a streamed response from any chunk iterator.
    #[inline]
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Result<ResponseChunk, E>>,
        I::IntoIter: Send + 'static,
    {
        ModelResponse::Stream(Box::new(chunks.into_iter()))
    }

    /// Converts the error type of every chunk in this response.
    pub fn map_err<F, M>(self, f: M) -> ModelResponse<F>
    where
        M: Fn(E) -> F + Send + 'static,
        F: Send + 'static,
    {
        match self {
            ModelResponse::Single(text) => ModelResponse::Single(text),
            ModelResponse::Stream(chunks) => {
                let chunks = chunks.map(move |chunk| chunk.map_err(&f));
                ModelResponse::Stream(Box::new(chunks))
            }
        }
    }
}

impl<E> Debug for ModelResponse<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ModelResponse::Single(text) => {
                f.debug_tuple("Single").field(text).finish()
            }
            ModelResponse::Stream(_) => {
                f.debug_tuple("Stream").finish_non_exhaustive()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_err() {
        let resp: ModelResponse<u8> = ModelResponse::from_chunks(vec![
            Ok(ResponseChunk::with_text("a")),
            Err(7),
        ]);
        let ModelResponse::Stream(mut chunks) = resp.map_err(|e| e as u32 * 2)
        else {
            panic!("expected a stream");
        };
        assert_eq!(chunks.next(), Some(Ok(ResponseChunk::with_text("a"))));
        assert_eq!(chunks.next(), Some(Err(14)));
        assert_eq!(chunks.next(), None);
    }
}
