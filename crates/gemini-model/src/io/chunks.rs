#[cfg(test)]
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;
use reqwest::blocking::Response;

const READ_BUF_SIZE: usize = 4096;

#[derive(Debug, PartialEq, Eq)]
pub struct Error;

/// An adapter for reading byte chunks from a blocking body.
pub enum Chunks {
    Reader(Box<dyn Read + Send>),
    #[cfg(test)]
    VecDeque(VecDeque<Bytes>),
}

impl Chunks {
    pub fn from_response(response: Response) -> Self {
        Chunks::Reader(Box::new(response))
    }

    #[cfg(test)]
    pub fn from_vec_deque(vec: VecDeque<Bytes>) -> Self {
        Chunks::VecDeque(vec)
    }

    pub fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Reader(reader) => {
                let mut buf = [0u8; READ_BUF_SIZE];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => return Ok(None),
                        Ok(n) => {
                            return Ok(Some(Bytes::copy_from_slice(&buf[..n])));
                        }
                        Err(err) if err.kind() == ErrorKind::Interrupted => {}
                        Err(err) => {
                            debug!("failed to read body: {err}");
                            return Err(Error);
                        }
                    }
                }
            }
            #[cfg(test)]
            Chunks::VecDeque(vec) => Ok(vec.pop_front()),
        }
    }
}
