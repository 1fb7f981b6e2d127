use agentkit_core::{Fragment, ModelClient};
use agentkit_model::{Message, Role};
use futures_util::StreamExt;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    client: ModelClient,
    system_prompt: Option<String>,
}

impl SessionBuilder {
    /// Creates a session builder that talks through `client`.
    #[inline]
    pub fn with_client(client: ModelClient) -> Self {
        Self {
            client,
            system_prompt: None,
        }
    }

    /// Sets the persona instructions that open the conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let conversation = self
            .system_prompt
            .map(Message::system)
            .into_iter()
            .collect();
        Session {
            client: self.client,
            conversation,
        }
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session owns the conversation and sends all of it with every
/// message, so the persona remembers what was said before.
pub struct Session {
    client: ModelClient,
    conversation: Vec<Message>,
}

impl Session {
    /// Sends a message and streams the answer into `on_fragment`.
    ///
    /// Returns the full answer. If the call failed, the error fragment is
    /// still passed to `on_fragment`, `None` is returned and the
    /// conversation is left as it was.
    pub async fn send_message<F>(
        &mut self,
        message: &str,
        mut on_fragment: F,
    ) -> Option<String>
    where
        F: FnMut(&Fragment),
    {
        let mut conversation = self.conversation.clone();
        conversation.push(Message::user(message));

        let mut fragments = self.client.stream_async(conversation);
        let mut answer = String::new();
        let mut failed = false;
        while let Some(fragment) = fragments.next().await {
            on_fragment(&fragment);
            if fragment.is_error() {
                failed = true;
            } else {
                answer.push_str(&fragment.content);
            }
        }

        if failed {
            warn!("message was not answered, conversation unchanged");
            return None;
        }
        self.conversation.push(Message::user(message));
        self.conversation.push(Message::assistant(answer.clone()));
        Some(answer)
    }

    /// Returns the conversation so far, oldest message first.
    #[inline]
    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    /// Forgets every exchanged message, keeping the persona instructions.
    pub fn clear(&mut self) {
        self.conversation
            .retain(|msg| msg.role() == Role::System);
    }

    /// Returns the client of this session.
    #[inline]
    pub fn client(&self) -> &ModelClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agentkit_core::ClientConfigBuilder;
    use agentkit_model::TurnRole;
    use agentkit_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    fn session(provider: &TestModelProvider) -> Session {
        let config = ClientConfigBuilder::new()
            .with_api_key("test")
            .with_min_request_interval(Duration::ZERO)
            .build_with_env(|_| None)
            .unwrap();
        let client = ModelClient::new(provider.clone(), config);
        SessionBuilder::with_client(client)
            .with_system_prompt("You are a radio host.")
            .build()
    }

    #[tokio::test]
    async fn test_send_message() {
        let provider = TestModelProvider::default();
        provider.add_response("Hi", PresetResponse::with_texts(["Hello!"]));
        provider
            .add_response("Any news?", PresetResponse::with_texts(["Plenty."]));
        let mut session = session(&provider);

        let mut received = vec![];
        let answer = session
            .send_message("Hi", |fragment| {
                received.push(fragment.content.clone())
            })
            .await;
        assert_eq!(answer.as_deref(), Some("Hello!"));
        assert_eq!(received, ["Hello!"]);

        session.send_message("Any news?", |_| {}).await;
        let roles: Vec<_> =
            session.conversation().iter().map(Message::role).collect();
        assert_eq!(
            roles,
            [
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant
            ]
        );

        let history = provider.last_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].content, "You are a radio host.");
        assert_eq!(history[2].content, "Hello!");
    }

    #[tokio::test]
    async fn test_failed_message_is_not_kept() {
        let provider = TestModelProvider::default();
        let mut session = session(&provider);

        let mut errors = 0;
        let answer = session
            .send_message("Hi", |fragment| {
                if fragment.is_error() {
                    errors += 1;
                }
            })
            .await;
        assert_eq!(answer, None);
        assert_eq!(errors, 1);
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_keeps_persona() {
        let provider = TestModelProvider::default();
        provider.add_response("Hi", PresetResponse::with_texts(["Hello!"]));
        let mut session = session(&provider);

        session.send_message("Hi", |_| {}).await;
        assert_eq!(session.conversation().len(), 3);
        session.clear();
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.conversation()[0].role(), Role::System);
    }
}
