use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::handlers::responses::{edit_view, send_view};
use crate::handlers::view::{build_view, View};
use crate::llm::{generate_architectural_image, ImageGenerationError};
use crate::state::{AppState, GenerationOutcome};
use crate::utils::telegram::start_loading_ticker;
use crate::wizard::{ImageDataUri, WizardError};

fn file_name_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "synthesis.jpg",
        "image/webp" => "synthesis.webp",
        _ => "synthesis.png",
    }
}

/// Moves the chat to the loading view and starts the generation task. The
/// wizard switches to loading before anything is awaited, so a second press
/// of the button is rejected as an invalid transition.
pub async fn start_generation(
    bot: Bot,
    state: AppState,
    chat_id: ChatId,
    view_message_id: Option<MessageId>,
) -> Result<(), WizardError> {
    let (ticket, view) = state.with_session(chat_id, |session| {
        session
            .wizard
            .generate()
            .map(|ticket| (ticket, build_view(session)))
    })?;
    info!("Starting generation epoch {} in chat {}", ticket.epoch, chat_id);

    let status_message_id = match view_message_id {
        Some(message_id) => edit_view(&bot, chat_id, message_id, &view).await,
        None => send_view(&bot, chat_id, &view).await,
    };
    let status_message_id = match status_message_id {
        Ok(message_id) => {
            state.with_session(chat_id, |session| session.view_message_id = Some(message_id));
            Some(message_id)
        }
        Err(err) => {
            warn!("Failed to show the loading view: {err}");
            None
        }
    };

    let completions = state.completions.clone();
    tokio::spawn(async move {
        let ticker = status_message_id
            .map(|message_id| start_loading_ticker(bot.clone(), chat_id, message_id));
        let result = generate_architectural_image(&ticket.project).await;
        // Stop editing the status message before the listener takes it over.
        drop(ticker);
        if let Err(err) = &result {
            error!("Generation epoch {} failed in chat {}: {err}", ticket.epoch, chat_id);
        }
        let outcome = GenerationOutcome {
            chat_id,
            epoch: ticket.epoch,
            status_message_id,
            result,
        };
        if completions.send(outcome).is_err() {
            warn!("Completion listener is gone; dropping generation outcome");
        }
    });

    Ok(())
}

/// An image the model returned but that does not decode is reported as a
/// failure rather than shown as a success with nothing to display.
fn decoded_result(
    result: Result<ImageDataUri, ImageGenerationError>,
) -> (Result<ImageDataUri, String>, Option<Vec<u8>>) {
    match result {
        Ok(image) => match image.decode() {
            Ok(bytes) => (Ok(image), Some(bytes)),
            Err(err) => (
                Err(format!("The AI returned an image that could not be decoded: {err}")),
                None,
            ),
        },
        Err(err) => (Err(err.to_string()), None),
    }
}

async fn deliver_image(
    bot: &Bot,
    chat_id: ChatId,
    status_message_id: Option<MessageId>,
    image: &ImageDataUri,
    bytes: Vec<u8>,
    view: &View,
) -> Result<MessageId> {
    let photo = InputFile::memory(bytes).file_name(file_name_for_mime(&image.mime_type));
    let sent = bot
        .send_photo(chat_id, photo)
        .caption(view.text.clone())
        .parse_mode(ParseMode::Html)
        .reply_markup(view.keyboard.clone())
        .await?;
    if let Some(message_id) = status_message_id {
        if let Err(err) = bot.delete_message(chat_id, message_id).await {
            warn!("Failed to remove the loading message: {err}");
        }
    }
    Ok(sent.id)
}

async fn deliver_outcome(bot: &Bot, state: &AppState, outcome: GenerationOutcome) -> Result<()> {
    let GenerationOutcome {
        chat_id,
        epoch,
        status_message_id,
        result,
    } = outcome;
    let (result, bytes) = decoded_result(result);

    let applied = state.with_session(chat_id, |session| {
        session
            .wizard
            .complete_generation(epoch, result)
            .then(|| (session.wizard.generation().image.clone(), build_view(session)))
    });
    let Some((image, view)) = applied else {
        info!("Discarded stale generation epoch {} for chat {}", epoch, chat_id);
        return Ok(());
    };

    let shown = match (image, bytes) {
        (Some(image), Some(bytes)) => {
            deliver_image(bot, chat_id, status_message_id, &image, bytes, &view).await?
        }
        _ => match status_message_id {
            Some(message_id) => edit_view(bot, chat_id, message_id, &view).await?,
            None => send_view(bot, chat_id, &view).await?,
        },
    };
    state.with_session(chat_id, |session| session.view_message_id = Some(shown));
    Ok(())
}

/// Applies finished generations to their sessions, one at a time, for the
/// life of the bot.
pub async fn run_completion_listener(
    bot: Bot,
    state: AppState,
    mut receiver: mpsc::UnboundedReceiver<GenerationOutcome>,
) {
    while let Some(outcome) = receiver.recv().await {
        let chat_id = outcome.chat_id;
        if let Err(err) = deliver_outcome(&bot, &state, outcome).await {
            error!("Failed to deliver generation result to chat {chat_id}: {err}");
        }
    }
    info!("Generation completion channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::ProjectData;

    fn loading_state() -> (AppState, mpsc::UnboundedReceiver<GenerationOutcome>, u64) {
        let (state, receiver) = AppState::new();
        let epoch = state.with_session(ChatId(7), |session| {
            session
                .wizard
                .submit(ProjectData::new("Busan", "stacked terraces", None, None))
                .unwrap();
            for _ in 1..6 {
                session.wizard.next().unwrap();
            }
            session.wizard.generate().unwrap().epoch
        });
        (state, receiver, epoch)
    }

    #[test]
    fn undecodable_images_become_failures() {
        let (result, bytes) = decoded_result(Ok(ImageDataUri::new("image/png", "***")));
        assert!(bytes.is_none());
        assert!(result
            .unwrap_err()
            .starts_with("The AI returned an image that could not be decoded"));

        let (result, bytes) = decoded_result(Ok(ImageDataUri::new("image/png", "aGVsbG8=")));
        assert_eq!(bytes.as_deref(), Some(&b"hello"[..]));
        assert!(result.is_ok());
    }

    #[test]
    fn generation_errors_keep_their_message() {
        let (result, _) = decoded_result(Err(ImageGenerationError::Configuration(
            "API key is not configured.".to_string(),
        )));
        assert_eq!(result, Err("API key is not configured.".to_string()));
    }

    #[test]
    fn reset_during_generation_discards_the_outcome() {
        let (state, _receiver, epoch) = loading_state();
        state.with_session(ChatId(7), |session| session.reset());

        let (result, _) = decoded_result(Ok(ImageDataUri::new("image/png", "aGVsbG8=")));
        let applied =
            state.with_session(ChatId(7), |session| session.wizard.complete_generation(epoch, result));
        assert!(!applied);
        assert_eq!(state.with_session(ChatId(7), |s| s.wizard.current_step()), 0);
        assert!(state.with_session(ChatId(7), |s| s.wizard.generation().image.is_none()));
    }

    #[test]
    fn photo_names_follow_the_mime_type() {
        assert_eq!(file_name_for_mime("image/jpeg"), "synthesis.jpg");
        assert_eq!(file_name_for_mime("image/png"), "synthesis.png");
    }
}
