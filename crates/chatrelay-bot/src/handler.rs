//! Message handling between a chat front end and the dialogue

use std::sync::Arc;

use async_trait::async_trait;
use chatrelay_core::Dialogue;

/// Anything that can answer a user's text
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn answer(&self, text: &str, user_id: &str) -> String;
}

#[async_trait]
impl Assistant for Dialogue {
    async fn answer(&self, text: &str, user_id: &str) -> String {
        Dialogue::answer(self, text, user_id).await
    }
}

#[async_trait]
impl<T: Assistant + ?Sized> Assistant for Arc<T> {
    async fn answer(&self, text: &str, user_id: &str) -> String {
        (**self).answer(text, user_id).await
    }
}

/// Kind of payload an incoming message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    /// Images, voice, stickers and the like
    Other,
}

/// A message as delivered by the chat front end
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub kind: MessageKind,
    pub text: String,
    /// Stable id of the sender
    pub sender_id: String,
    /// Display name of the sender
    pub sender_name: String,
    /// Group the message was posted in; `None` for private chats
    pub group_id: Option<String>,
    /// Whether the bot was mentioned
    pub mentioned: bool,
}

impl IncomingMessage {
    /// A private text message
    pub fn private(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Text,
            text: text.into(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            group_id: None,
            mentioned: false,
        }
    }

    /// A text message posted in a group
    pub fn group(
        group_id: impl Into<String>,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
        mentioned: bool,
    ) -> Self {
        Self {
            kind: MessageKind::Text,
            text: text.into(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            group_id: Some(group_id.into()),
            mentioned,
        }
    }
}

/// Decides which messages get answered and how replies look
pub struct MessageHandler<A> {
    assistant: A,
    bot_name: Option<String>,
    reply_prefix: String,
}

impl<A: Assistant> MessageHandler<A> {
    pub fn new(assistant: A, bot_name: Option<String>, reply_prefix: impl Into<String>) -> Self {
        Self {
            assistant,
            bot_name,
            reply_prefix: reply_prefix.into(),
        }
    }

    /// Text the bot is mentioned by, e.g. `@relay`
    pub fn mention_tag(&self) -> Option<String> {
        self.bot_name.as_ref().map(|name| format!("@{}", name))
    }

    /// Handle a message, returning the reply to send back if any
    pub async fn handle(&self, message: &IncomingMessage) -> Option<String> {
        if message.kind != MessageKind::Text {
            return None;
        }

        match &message.group_id {
            Some(group_id) => self.handle_group(group_id, message).await,
            None => self.handle_private(message).await,
        }
    }

    async fn handle_group(&self, group_id: &str, message: &IncomingMessage) -> Option<String> {
        if !message.mentioned {
            return None;
        }
        tracing::info!(
            "Group {} user {} sent: {}",
            group_id,
            message.sender_name,
            message.text
        );

        let question = self.strip_mention(&message.text);
        if question.is_empty() {
            return None;
        }

        let user_id = format!("{}:{}", group_id, message.sender_name);
        let answer = self.assistant.answer(&question, &user_id).await;
        Some(format!(
            "@{} {}\n{}",
            message.sender_name, self.reply_prefix, answer
        ))
    }

    async fn handle_private(&self, message: &IncomingMessage) -> Option<String> {
        tracing::info!("User {} sent: {}", message.sender_name, message.text);

        let answer = self.assistant.answer(&message.text, &message.sender_id).await;
        Some(format!("{}\n{}", self.reply_prefix, answer.trim()))
    }

    fn strip_mention(&self, text: &str) -> String {
        match self.mention_tag() {
            Some(tag) => text.replace(&tag, "").trim().to_string(),
            None => text.trim().to_string(),
        }
    }
}
