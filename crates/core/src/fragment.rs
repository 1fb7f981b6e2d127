use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

const ASSISTANT_ROLE: &str = "assistant";

/// One incremental unit of model output.
///
/// Concatenating the contents of all fragments of a call, in the order
/// they were produced, gives the full answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// The text of this fragment.
    pub content: String,
    /// The author, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Extra information about this fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Fragment {
    /// Creates a fragment with only text.
    #[inline]
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            role: None,
            metadata: None,
        }
    }

    /// Creates the fragment that replays a cached answer.
    pub fn cached<S: Into<String>>(content: S) -> Self {
        let mut metadata = Map::new();
        metadata.insert("cached".to_owned(), Value::Bool(true));
        Self {
            content: content.into(),
            role: Some(ASSISTANT_ROLE.to_owned()),
            metadata: Some(metadata),
        }
    }

    /// Creates the terminal fragment that reports `err`.
    pub fn error(err: &Error) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".to_owned(), Value::String(err.to_string()));
        Self {
            content: format!("error generating response: {err}"),
            role: Some(ASSISTANT_ROLE.to_owned()),
            metadata: Some(metadata),
        }
    }

    /// Returns `true` if this fragment reports a failure.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.metadata
            .as_ref()
            .is_some_and(|m| m.contains_key("error"))
    }

    /// Returns `true` if this fragment was served from the cache.
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("cached"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
