use serde::{Deserialize, Serialize};

/// Fixed greeting seeded into a fresh transcript, mirroring the assistant
/// panel's opening message.
pub const ASSISTANT_GREETING: &str =
    "Greetings. I am the Sketchwire design assistant. How can I optimize your design workflow today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Append-only assistant conversation history. The full transcript is
/// replayed to the model on every turn, so context accumulates monotonically
/// for the life of the session; nothing is ever truncated or rewritten.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        Self {
            messages: vec![ChatMessage::model(ASSISTANT_GREETING)],
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn push_model(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::model(text));
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

    /// Total characters across all messages; the engine's context-usage
    /// estimate runs off this.
    pub fn char_len(&self) -> usize {
        self.messages.iter().map(|msg| msg.text.chars().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_transcript_opens_with_model_greeting() {
        let transcript = Transcript::seeded();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, ChatRole::Model);
        assert_eq!(transcript.messages()[0].text, ASSISTANT_GREETING);
    }

    #[test]
    fn transcript_appends_in_order() {
        let mut transcript = Transcript::new();
        transcript.push_user("how do I sketch a navbar?");
        transcript.push_model("draw a long rectangle across the top.");
        transcript.push_user("thanks");

        let roles: Vec<ChatRole> = transcript
            .messages()
            .iter()
            .map(|msg| msg.role)
            .collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Model, ChatRole::User]);
        assert_eq!(transcript.char_len(), "how do I sketch a navbar?".len() + "draw a long rectangle across the top.".len() + "thanks".len());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let message = ChatMessage::user("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["text"], "hi");
    }
}
