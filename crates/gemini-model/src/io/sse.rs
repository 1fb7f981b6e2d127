use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain what is already buffered before blocking on more data.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().map_err(Error::ChunksError)?
            else {
                // Trailing data without a terminating blank line is dropped.
                return Ok(None);
            };
            // Normalize `cr lf` line endings to `lf`.
            self.buf.extend(bytes.iter().filter(|b| **b != b'\r'));
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // For `end-of-line`, we only handle line feed. And for event, we
        // only handle field.
        //
        // event         = *( comment / field ) end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        // end-of-line   = ( cr lf / cr / lf )
        let Some(eol_idx) = self.buf.windows(2).position(|w| w == b"\n\n")
        else {
            return Ok(None);
        };

        let Ok(field) = str::from_utf8(&self.buf[0..eol_idx]) else {
            return Err(Error::InvalidPayload);
        };
        let Some((header, data)) = field.split_once(": ") else {
            return Err(Error::InvalidPayload);
        };
        if header != "data" {
            // Other events are not supported.
            return Err(Error::InvalidPayload);
        }
        let data = data.to_owned();

        // Consume the bytes from the buffer.
        self.buf.drain(0..eol_idx + 2);

        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_normal_events() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: hello\n\n"),
                Bytes::from_static(b"data: bye\r\n\r\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().unwrap(), None);
    }

    #[test]
    fn test_quirk_streaming() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data:"),
                Bytes::from_static(b" ol\xc3"),
                Bytes::from_static(b"\xa1\n"),
                Bytes::from_static(b"\ndata: again\n\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().unwrap().unwrap(), "olá");
        assert_eq!(sse.next_event().unwrap().unwrap(), "again");
        assert_eq!(sse.next_event().unwrap(), None);
    }

    #[test]
    fn test_invalid_data() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(b"xxxxxx\n\n")].into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().unwrap_err(), Error::InvalidPayload);

        let chunks =
            Chunks::from_vec_deque(vec![Bytes::from_static(b"xxxxxx\n")].into());
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().unwrap(), None);

        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: hello\n"),
                Bytes::from_static(b"data: bye\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().unwrap(), None);
    }
}
