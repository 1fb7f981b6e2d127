use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownModelError;

/// Sampling parameters forwarded to the provider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Number of highest-probability tokens considered at each step.
    pub top_k: u32,
    /// Upper bound of generated tokens, or the provider default.
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            top_k: 1,
            max_output_tokens: None,
        }
    }
}

/// How the provider should deliver an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// One completed response object.
    Single,
    /// A sequence of partial chunks.
    Stream,
}

/// The models a client may be constructed with.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ModelId {
    /// `gemini-pro`
    #[default]
    #[serde(rename = "gemini-pro")]
    GeminiPro,
    /// `gemini-pro-vision`
    #[serde(rename = "gemini-pro-vision")]
    GeminiProVision,
    /// `gemini-1.5-flash`
    #[serde(rename = "gemini-1.5-flash")]
    GeminiFlash,
    /// `gemini-2.0.0-flash`
    #[serde(rename = "gemini-2.0.0-flash")]
    Gemini2Flash,
}

impl ModelId {
    /// Every identifier in the allow-list.
    pub const ALL: [ModelId; 4] = [
        ModelId::GeminiPro,
        ModelId::GeminiProVision,
        ModelId::GeminiFlash,
        ModelId::Gemini2Flash,
    ];

    /// Returns the identifier the provider knows this model by.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::GeminiPro => "gemini-pro",
            ModelId::GeminiProVision => "gemini-pro-vision",
            ModelId::GeminiFlash => "gemini-1.5-flash",
            ModelId::Gemini2Flash => "gemini-2.0.0-flash",
        }
    }

    /// Returns the response mode used when none is configured explicitly.
    #[inline]
    pub fn default_mode(&self) -> ResponseMode {
        match self {
            ModelId::GeminiProVision => ResponseMode::Stream,
            _ => ResponseMode::Single,
        }
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = UnknownModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownModelError(s.to_owned()))
    }
}
