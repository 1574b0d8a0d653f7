use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageId};
use tokio::task::JoinHandle;
use tracing::warn;

const LOADING_TICK_INTERVAL: Duration = Duration::from_secs(3);

pub const LOADING_TITLE: &str = "Generating Your Vision...";

pub const LOADING_MESSAGES: [&str; 6] = [
    "Analyzing architectural context...",
    "Applying rectified flow integration...",
    "Calculating creative GPS balance...",
    "Rendering with photorealistic precision...",
    "Adding imperfection reality evidence...",
    "Finalizing high-resolution details...",
];

pub fn loading_text(tick: usize) -> String {
    format!(
        "⏳ {}\n{}",
        LOADING_TITLE,
        LOADING_MESSAGES[tick % LOADING_MESSAGES.len()]
    )
}

/// Keeps the chat's "uploading photo" indicator alive and cycles the loading
/// caption until dropped.
pub struct LoadingTicker {
    task_handle: Option<JoinHandle<()>>,
}

impl Drop for LoadingTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

pub fn start_loading_ticker(bot: Bot, chat_id: ChatId, status_message_id: MessageId) -> LoadingTicker {
    let task_handle = tokio::spawn(async move {
        let mut tick = 0usize;
        loop {
            if let Err(err) = bot.send_chat_action(chat_id, ChatAction::UploadPhoto).await {
                warn!("send_chat_action failed: {err}");
            }
            tokio::time::sleep(LOADING_TICK_INTERVAL).await;
            tick += 1;
            if let Err(err) = bot
                .edit_message_text(chat_id, status_message_id, loading_text(tick))
                .await
            {
                warn!("loading caption update failed: {err}");
            }
        }
    });

    LoadingTicker {
        task_handle: Some(task_handle),
    }
}
