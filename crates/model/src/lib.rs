//! The boundary between the agent toolkit and a remote language model.
//!
//! This crate establishes a small protocol that every text-generation
//! provider implements, so that the client in `agentkit-core` can talk to
//! a real HTTP backend or an in-process fake without knowing which one it
//! is holding.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. Retrying, caching
//! and rate limiting all live on the caller's side of this boundary.

#![deny(missing_docs)]

mod error;
mod generation;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use generation::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
