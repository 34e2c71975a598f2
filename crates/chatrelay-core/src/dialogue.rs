//! The question -> answer entry point used by message front ends

use std::sync::Arc;

use crate::codec::{self, ParsedReply};
use crate::conversation::ConversationRegistry;
use crate::error::Result;
use crate::provider::ProviderSettings;
use crate::session::SessionManager;
use crate::transport::Transport;

/// Reply while the session has no valid token
pub const NOT_READY_REPLY: &str = "The assistant is not initialized yet, please try again later";

/// Reply when the backend call or its response failed
pub const BUSY_REPLY: &str = "Server busy, please try again later";

/// Ties the session, the conversation registry and the transport together
pub struct Dialogue {
    session: Arc<SessionManager>,
    conversations: ConversationRegistry,
    transport: Arc<dyn Transport>,
    model: String,
}

impl Dialogue {
    /// Create a dialogue over an initialized session
    pub fn new(
        session: Arc<SessionManager>,
        transport: Arc<dyn Transport>,
        settings: &ProviderSettings,
    ) -> Self {
        Self {
            session,
            conversations: ConversationRegistry::new(settings.idle_timeout),
            transport,
            model: settings.model.clone(),
        }
    }

    /// The session this dialogue authenticates with
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Per-user conversation state
    pub fn conversations(&self) -> &ConversationRegistry {
        &self.conversations
    }

    /// Answer `text` in the conversation of `user_id`.
    ///
    /// Never fails: every error becomes a fixed fallback reply.
    pub async fn answer(&self, text: &str, user_id: &str) -> String {
        if !self.session.is_ready() {
            return NOT_READY_REPLY.to_string();
        }

        let turn = self.conversations.begin(user_id).await;

        // Waiting for the turn may outlast a refresh, so read the token only now
        let Some(bearer) = self.session.bearer() else {
            tracing::debug!("Session went stale while user {} waited for a turn", user_id);
            return NOT_READY_REPLY.to_string();
        };
        let handle = turn.handle().clone();

        let result = self
            .exchange(
                text,
                &bearer,
                &handle.parent_message_id,
                handle.conversation_id.as_deref(),
            )
            .await;

        match result {
            Ok(reply) => {
                if !reply.has_content() {
                    tracing::warn!("Empty reply for user {}", user_id);
                }
                turn.commit(reply.conversation_id, reply.message_id);
                reply.text.trim().to_string()
            }
            Err(e) if e.is_format() => {
                tracing::warn!("Unreadable reply for user {}: {}", user_id, e);
                BUSY_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!("Conversation request for user {} failed: {}", user_id, e);
                BUSY_REPLY.to_string()
            }
        }
    }

    async fn exchange(
        &self,
        text: &str,
        bearer: &str,
        parent_message_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<ParsedReply> {
        let body = codec::encode_request(text, parent_message_id, conversation_id, &self.model)?;
        let raw = self.transport.post_conversation(bearer, body).await?;
        codec::decode_response(&raw).inspect_err(|_| {
            tracing::debug!("Undecodable response body: {}", raw);
        })
    }
}
