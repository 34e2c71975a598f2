//! Console front end: stdin lines in, replies on stdout

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::handler::{Assistant, IncomingMessage, MessageHandler};

/// Sender id used for everything typed on the console
const CONSOLE_SENDER_ID: &str = "console";

/// Turns console lines into incoming messages
pub struct ConsoleSource {
    sender_name: String,
    group: Option<String>,
    mention_tag: Option<String>,
}

impl ConsoleSource {
    pub fn new(
        sender_name: impl Into<String>,
        group: Option<String>,
        mention_tag: Option<String>,
    ) -> Self {
        Self {
            sender_name: sender_name.into(),
            group,
            mention_tag,
        }
    }

    /// Message for one input line, `None` for blank lines
    pub fn message(&self, line: &str) -> Option<IncomingMessage> {
        let text = line.trim();
        if text.is_empty() {
            return None;
        }

        let message = match &self.group {
            Some(group) => {
                let mentioned = self
                    .mention_tag
                    .as_deref()
                    .is_some_and(|tag| text.contains(tag));
                IncomingMessage::group(
                    group,
                    CONSOLE_SENDER_ID,
                    &self.sender_name,
                    text,
                    mentioned,
                )
            }
            None => IncomingMessage::private(CONSOLE_SENDER_ID, &self.sender_name, text),
        };
        Some(message)
    }
}

/// Read messages from stdin until EOF, printing each reply
pub async fn run<A: Assistant>(
    handler: &MessageHandler<A>,
    source: &ConsoleSource,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let Some(message) = source.message(&line) else {
            continue;
        };
        if let Some(reply) = handler.handle(&message).await {
            stdout.write_all(format!("{}\n\n", reply).as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    tracing::debug!("Console input closed");
    Ok(())
}
