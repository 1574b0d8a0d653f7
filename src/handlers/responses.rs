use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::warn;

use crate::handlers::view::{build_view, View};
use crate::state::AppState;

async fn edit_view_with_retry(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    view: &View,
) -> Result<(), RequestError> {
    let mut delay = Duration::from_secs_f32(1.5);
    for attempt in 0..3 {
        let request = bot
            .edit_message_text(chat_id, message_id, view.text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(view.keyboard.clone());
        match request.await {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => return Ok(()),
            Err(err @ (RequestError::Network(_) | RequestError::RetryAfter(_))) if attempt < 2 => {
                warn!("edit_message_text failed: {err}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

pub async fn send_view(bot: &Bot, chat_id: ChatId, view: &View) -> Result<MessageId> {
    let sent = bot
        .send_message(chat_id, view.text.clone())
        .parse_mode(ParseMode::Html)
        .reply_markup(view.keyboard.clone())
        .await?;
    Ok(sent.id)
}

/// Edits `message_id` in place. Messages that can no longer be edited as
/// text (photos, deleted messages) get a fresh message instead.
pub async fn edit_view(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    view: &View,
) -> Result<MessageId> {
    match edit_view_with_retry(bot, chat_id, message_id, view).await {
        Ok(()) => Ok(message_id),
        Err(err) => {
            warn!("Falling back to a new view message: {err}");
            send_view(bot, chat_id, view).await
        }
    }
}

/// Renders the chat's current screen and records where it was shown.
pub async fn show_view(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    edit_target: Option<MessageId>,
) -> Result<MessageId> {
    let view = state.with_session(chat_id, |session| build_view(session));
    let shown = match edit_target {
        Some(message_id) => edit_view(bot, chat_id, message_id, &view).await?,
        None => send_view(bot, chat_id, &view).await?,
    };
    state.with_session(chat_id, |session| session.view_message_id = Some(shown));
    Ok(shown)
}

pub async fn reply_text(bot: &Bot, message: &Message, text: &str) -> Result<()> {
    bot.send_message(message.chat.id, text.to_string())
        .parse_mode(ParseMode::Html)
        .reply_parameters(teloxide::types::ReplyParameters::new(message.id))
        .await?;
    Ok(())
}
