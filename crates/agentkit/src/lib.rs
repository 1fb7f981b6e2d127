//! Persona sessions on top of the resilient model client.
//!
//! The crate includes a CLI tool for chatting in the terminal. And you can
//! also use it as a library to keep a conversation with a persona inside
//! your own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod session;
mod shutdown;

pub use session::{Session, SessionBuilder};
pub use shutdown::{CleanupGuard, block_on};

/// Re-exports of [`agentkit_core`] crate.
pub mod core {
    pub use agentkit_core::*;
}

/// Re-exports of [`agentkit_gemini`] crate.
pub mod gemini {
    pub use agentkit_gemini::*;
}

/// Re-exports of [`agentkit_model`] crate.
pub mod model {
    pub use agentkit_model::*;
}
