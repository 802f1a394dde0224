//! Conversation turns and their origin kinds.
//!
//! A [`ChatMessage`] is immutable after construction: the text, kind,
//! payload, source, and error flag are all fixed at creation time.
//! [`ScoredChatMessage`] wraps a message with a relevance score so that
//! selection logic can rank messages without touching their content.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Origin kind of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatMessageKind {
    /// Authored by the end user.
    User,
    /// Authored by the top-level agent.
    Agent,
    /// Produced by a dispatched chain.
    Chain,
    /// Produced by an individual skill inside a chain.
    Skill,
}

impl fmt::Display for ChatMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::User => "USER",
            Self::Agent => "AGENT",
            Self::Chain => "CHAIN",
            Self::Skill => "SKILL",
        };
        write!(f, "{label}")
    }
}

/// One immutable conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    message: String,
    kind: ChatMessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    source: String,
    is_error: bool,
}

impl ChatMessage {
    /// Construct a message of an arbitrary kind.
    pub fn new(
        message: impl Into<String>,
        kind: ChatMessageKind,
        data: Option<serde_json::Value>,
        source: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            message: message.into(),
            kind,
            data,
            source: source.into(),
            is_error,
        }
    }

    /// A message authored by the end user.
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(message, ChatMessageKind::User, None, "", false)
    }

    /// A message authored by the agent.
    pub fn agent(message: impl Into<String>) -> Self {
        Self::new(message, ChatMessageKind::Agent, None, "", false)
    }

    /// A message produced by a chain.
    pub fn chain(message: impl Into<String>) -> Self {
        Self::new(message, ChatMessageKind::Chain, None, "", false)
    }

    /// A message produced by a skill.
    pub fn skill(message: impl Into<String>) -> Self {
        Self::new(message, ChatMessageKind::Skill, None, "", false)
    }

    /// Attach a source identifier. Consumes and returns the message,
    /// builder-style; the result is still immutable afterwards.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Attach an opaque payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Flag this message as carrying an error.
    pub fn as_error(mut self) -> Self {
        self.is_error = true;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ChatMessageKind {
        self.kind
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn is_ok(&self) -> bool {
        !self.is_error
    }

    pub fn is_of_kind(&self, kind: ChatMessageKind) -> bool {
        self.kind == kind
    }

    pub fn is_from_source(&self, source: &str) -> bool {
        self.source == source
    }

    /// Display form truncated to `max_length` characters of text, for logs.
    pub fn to_truncated_string(&self, max_length: usize) -> String {
        let text: String = if self.message.chars().count() > max_length {
            let head: String = self.message.chars().take(max_length).collect();
            format!("{head}...")
        } else {
            self.message.clone()
        };
        format!("Message of kind {}: {}", self.kind, text)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A [`ChatMessage`] ranked for selection.
///
/// Ordering compares only the score; message content never participates.
/// Ties are left to the stability of the surrounding sort.
#[derive(Debug, Clone)]
pub struct ScoredChatMessage {
    message: ChatMessage,
    score: f64,
}

impl ScoredChatMessage {
    pub fn new(message: ChatMessage, score: f64) -> Self {
        Self { message, score }
    }

    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Total order over scores, usable with `sort_by`.
    pub fn cmp_by_score(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
    }
}

impl PartialEq for ScoredChatMessage {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl PartialOrd for ScoredChatMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.score.partial_cmp(&other.score)
    }
}

impl fmt::Display for ScoredChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.score)
    }
}
