//! Conversion of a generic conversation into provider turns.

use agentkit_model::{Message, Role, Turn, TurnRole};

use crate::error::{Error, Result};

/// A conversation in the provider's turn format.
///
/// The turns keep the length and order of the messages they were made
/// from. The last one is the current turn, everything before it is the
/// history the provider session is opened with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedConversation {
    turns: Vec<Turn>,
}

impl PreparedConversation {
    /// Formats `messages`, failing if there are none.
    ///
    /// System messages become user turns with the same content, since the
    /// provider has no system role. This keeps the text but changes what
    /// the provider believes about who said it.
    pub fn new(messages: &[Message]) -> Result<Self> {
        if messages.is_empty() {
            return Err(Error::validation().with_reason("empty conversation"));
        }
        let turns = messages.iter().map(format_message).collect();
        Ok(Self { turns })
    }

    /// Returns all turns, oldest first.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the turns preceding the current one.
    #[inline]
    pub fn history(&self) -> &[Turn] {
        &self.turns[..self.turns.len() - 1]
    }

    /// Returns the turn sent for processing.
    #[inline]
    pub fn current(&self) -> &Turn {
        &self.turns[self.turns.len() - 1]
    }
}

#[inline]
fn format_message(msg: &Message) -> Turn {
    let role = match msg.role() {
        Role::User | Role::System => TurnRole::User,
        Role::Assistant => TurnRole::Assistant,
    };
    Turn {
        role,
        content: msg.content().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_system_becomes_user() {
        let messages = [
            Message::system("You are a reporter."),
            Message::user("Any news?"),
            Message::assistant("Plenty."),
            Message::system("Keep it short."),
            Message::user("Tell me one."),
        ];
        let prepared = PreparedConversation::new(&messages).unwrap();
        assert_eq!(prepared.turns().len(), messages.len());

        for (msg, turn) in messages.iter().zip(prepared.turns()) {
            assert_eq!(turn.content, msg.content());
            let expected = match msg.role() {
                Role::Assistant => TurnRole::Assistant,
                _ => TurnRole::User,
            };
            assert_eq!(turn.role, expected);
        }
        assert_eq!(prepared.turns()[3].role, TurnRole::User);
        assert_eq!(prepared.turns()[3].content, "Keep it short.");
    }

    #[test]
    fn test_history_and_current() {
        let messages = [Message::system("Be nice."), Message::user("Hi")];
        let prepared = PreparedConversation::new(&messages).unwrap();
        assert_eq!(prepared.history().len(), 1);
        assert_eq!(prepared.history()[0].content, "Be nice.");
        assert_eq!(prepared.current().content, "Hi");

        let prepared =
            PreparedConversation::new(&[Message::user("ping")]).unwrap();
        assert!(prepared.history().is_empty());
        assert_eq!(prepared.current().content, "ping");
    }

    #[test]
    fn test_empty_conversation() {
        let err = PreparedConversation::new(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
