use std::fmt::{self, Debug, Formatter};

use crate::{GenerationConfig, ModelId, Turn};

/// Everything a provider needs to open a conversation session.
///
/// The request is built per call and borrowed by the provider, so the
/// credential and sampling parameters are always explicit and never
/// stored in process-wide state.
#[derive(Clone, Copy)]
pub struct SessionRequest<'a> {
    /// The model to talk to.
    pub model: ModelId,
    /// The credential for the provider.
    pub api_key: &'a str,
    /// Sampling parameters.
    pub generation: &'a GenerationConfig,
    /// The turns preceding the current one, oldest first.
    pub history: &'a [Turn],
}

impl Debug for SessionRequest<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("model", &self.model)
            .field("api_key", &"<deducted>")
            .field("generation", self.generation)
            .field("history", &self.history)
            .finish()
    }
}
