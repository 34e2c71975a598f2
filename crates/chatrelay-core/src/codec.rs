//! Wire format of the chat web API
//!
//! Requests are a single JSON document. Responses arrive as a server-sent event
//! stream that is read to completion and then parsed as a whole: every `data:`
//! block carries the full message accumulated so far, so only the terminal data
//! block matters.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::SESSION_COOKIE;

/// Delimiter between server-sent event blocks
const BLOCK_DELIMITER: &str = "\n\n";

/// Tag in front of every event-stream data block
const DATA_PREFIX: &str = "data: ";

/// Position of the terminal data block counted from the end of the split body.
/// The stream ends with `data: [DONE]` followed by an empty block.
const TERMINAL_BLOCK_FROM_END: usize = 3;

/// Reply text used when the backend returns a message without content parts
pub const NO_CONTENT_REPLY: &str = "No content received...";

/// Serialize a conversation request for one user turn
pub fn encode_request(
    text: &str,
    parent_message_id: &str,
    conversation_id: Option<&str>,
    model: &str,
) -> Result<Vec<u8>> {
    let request = ConversationRequest {
        action: "next",
        messages: vec![RequestMessage {
            id: uuid::Uuid::new_v4().to_string(),
            role: "user",
            content: RequestContent {
                content_type: "text",
                parts: vec![text],
            },
        }],
        conversation_id,
        parent_message_id,
        model,
    };
    Ok(serde_json::to_vec(&request)?)
}

/// A decoded conversation reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// Thread the reply belongs to
    pub conversation_id: String,
    /// Id of the reply turn; parent of the next user turn
    pub message_id: String,
    /// Content parts in order
    pub parts: Vec<String>,
    /// First content part, or [`NO_CONTENT_REPLY`]
    pub text: String,
}

impl ParsedReply {
    /// Whether the backend sent any content
    pub fn has_content(&self) -> bool {
        !self.parts.is_empty()
    }
}

/// Parse a complete event-stream response body
pub fn decode_response(raw: &str) -> Result<ParsedReply> {
    let blocks: Vec<&str> = raw.split(BLOCK_DELIMITER).collect();
    if blocks.len() < 2 {
        return Err(Error::Format(format!(
            "expected at least 2 event blocks, got {}",
            blocks.len()
        )));
    }

    let index = blocks
        .len()
        .checked_sub(TERMINAL_BLOCK_FROM_END)
        .ok_or_else(|| {
            Error::Format(format!(
                "no terminal data block in {} event blocks",
                blocks.len()
            ))
        })?;

    let payload = blocks[index]
        .strip_prefix(DATA_PREFIX)
        .ok_or_else(|| Error::Format("terminal block is not a data block".to_string()))?;

    let event: StreamEvent = serde_json::from_str(payload)?;
    let parts = event.message.content.parts;
    let text = parts
        .first()
        .cloned()
        .unwrap_or_else(|| NO_CONTENT_REPLY.to_string());

    Ok(ParsedReply {
        conversation_id: event.conversation_id,
        message_id: event.message.id,
        parts,
        text,
    })
}

/// Extract the bearer token from a session endpoint body
pub fn decode_session(raw: &str) -> Result<String> {
    let body: SessionBody = serde_json::from_str(raw)?;
    if body.access_token.is_empty() {
        return Err(Error::Format("session body has an empty accessToken".to_string()));
    }
    Ok(body.access_token)
}

/// Find a renewed session secret among `Set-Cookie` header values
pub fn session_cookie<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> Option<String> {
    set_cookies.into_iter().find_map(|header| {
        let pair = header.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        (name.trim() == SESSION_COOKIE && !value.trim().is_empty())
            .then(|| value.trim().to_string())
    })
}

// Request types

#[derive(Debug, Serialize)]
struct ConversationRequest<'a> {
    action: &'a str,
    messages: Vec<RequestMessage<'a>>,
    conversation_id: Option<&'a str>,
    parent_message_id: &'a str,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    id: String,
    role: &'a str,
    content: RequestContent<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    content_type: &'a str,
    parts: Vec<&'a str>,
}

// Response types

#[derive(Debug, Deserialize)]
struct StreamEvent {
    message: StreamMessage,
    conversation_id: String,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    id: String,
    content: StreamContent,
}

#[derive(Debug, Deserialize)]
struct StreamContent {
    parts: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody {
    access_token: String,
}
