//! Append-only conversation history.

use super::message::{ChatMessage, ChatMessageKind, ScoredChatMessage};

/// Ordered turns of one conversation.
///
/// History only ever grows: there is no removal operation. Read accessors
/// never mutate, and the "last message of kind" queries return `None` on an
/// empty history instead of panicking.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history from a single user message.
    pub fn from_user_message(message: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.add_user_message(message);
        history
    }

    /// Append a message of any kind.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append the message carried by a scored wrapper, discarding the score.
    pub fn append_scored(&mut self, scored: ScoredChatMessage) {
        self.messages.push(scored.message().clone());
    }

    pub fn add_user_message(&mut self, message: impl Into<String>) {
        self.append(ChatMessage::user(message));
    }

    pub fn add_agent_message(&mut self, message: impl Into<String>) {
        self.append(ChatMessage::agent(message));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message, if any.
    pub fn try_last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Most recent message of the given kind, if any.
    pub fn try_last_message_of_kind(&self, kind: ChatMessageKind) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.is_of_kind(kind))
    }

    /// Most recent user-authored message, if any.
    pub fn try_last_user_message(&self) -> Option<&ChatMessage> {
        self.try_last_message_of_kind(ChatMessageKind::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_queries_return_none() {
        let history = ChatHistory::new();
        assert!(history.is_empty());
        assert!(history.try_last_message().is_none());
        assert!(history.try_last_user_message().is_none());
        assert!(history
            .try_last_message_of_kind(ChatMessageKind::Chain)
            .is_none());
    }

    #[test]
    fn test_append_grows_monotonically() {
        let mut history = ChatHistory::from_user_message("first");
        history.add_agent_message("second");
        history.append(ChatMessage::chain("third").with_source("summarizer"));
        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[0].message(), "first");
        assert_eq!(history.try_last_message().unwrap().message(), "third");
    }

    #[test]
    fn test_last_of_kind_scans_backwards() {
        let mut history = ChatHistory::new();
        history.add_user_message("early question");
        history.add_agent_message("answer");
        history.add_user_message("late question");

        let last_user = history.try_last_user_message().unwrap();
        assert_eq!(last_user.message(), "late question");

        let last_agent = history
            .try_last_message_of_kind(ChatMessageKind::Agent)
            .unwrap();
        assert_eq!(last_agent.message(), "answer");
    }

    #[test]
    fn test_append_scored_drops_score() {
        let mut history = ChatHistory::new();
        let scored = ScoredChatMessage::new(ChatMessage::chain("ranked"), 7.5);
        history.append_scored(scored);
        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].message(), "ranked");
    }
}
