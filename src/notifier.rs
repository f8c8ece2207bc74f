use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{info, instrument};

/// Outbound chat delivery.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_text(&self, chat: &str, text: &str) -> Result<()>;
}

/// Numeric ids go to `ChatId`, anything else is treated as a channel username.
pub fn recipient(chat: &str) -> Recipient {
    match chat.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat.trim().to_string()),
    }
}

#[async_trait]
impl ChatSink for Bot {
    async fn send_text(&self, chat: &str, text: &str) -> Result<()> {
        self.send_message(recipient(chat), text).await?;
        Ok(())
    }
}

/// Sends notifications to the single configured chat.
pub struct Notifier<S> {
    sink: S,
    chat_id: String,
}

impl<S: ChatSink> Notifier<S> {
    pub fn new(sink: S, chat_id: impl Into<String>) -> Self {
        Self {
            sink,
            chat_id: chat_id.into(),
        }
    }

    #[instrument(skip_all)]
    pub async fn notify(&self, message: &str) -> Result<()> {
        self.sink.send_text(&self.chat_id, message).await?;
        info!(chat = %self.chat_id, "bot sent message: {}", message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_chat_is_id() {
        assert_eq!(recipient("-100123"), Recipient::Id(ChatId(-100123)));
        assert_eq!(recipient(" 42 "), Recipient::Id(ChatId(42)));
    }

    #[test]
    fn other_chat_is_username() {
        assert_eq!(
            recipient("@homework_feed"),
            Recipient::ChannelUsername("@homework_feed".into())
        );
    }
}
