//! A resilient client for conversational model providers.
//!
//! [`ModelClient`] mediates every call to a [`ModelProvider`]: it formats
//! and validates the conversation, answers repeated conversations from a
//! cache, spaces and retries provider calls, turns single or streamed
//! answers into a uniform sequence of [`Fragment`]s, and keeps [`Metrics`].
//! Calls can be consumed as a blocking iterator or as an asynchronous
//! stream.
//!
//! [`ModelProvider`]: agentkit_model::ModelProvider

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod bridge;
pub mod cache;
mod config;
mod error;
pub mod formatter;
mod fragment;
mod metrics;
mod model_client;
pub mod rate_limit;
pub mod retry;
pub mod stream;
mod tokens;

pub use bridge::FragmentStream;
pub use config::{API_KEY_VARS, ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use fragment::Fragment;
pub use metrics::{Metrics, MetricsRecorder};
pub use model_client::{ModelClient, ResponseStream};
pub use tokens::approximate_tokens;
