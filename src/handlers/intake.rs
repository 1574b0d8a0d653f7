use anyhow::{anyhow, Result};
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::handlers::responses::{reply_text, show_view};
use crate::handlers::view::escape_html;
use crate::llm::media::{download_media, resolve_image_mime};
use crate::state::{AppState, ImageSlot, IntakeFill, IntakeReservation};
use crate::utils::timing::{complete_command_timer, start_command_timer, CommandTimer};
use crate::wizard::ImageInput;

const NOT_AT_INTAKE_MESSAGE: &str =
    "Images can only be attached on the project form. Use /reset to start a new project.";
const FORM_CLOSED_MESSAGE: &str =
    "This image arrived after the project form was submitted or reset, so it was not attached. Use /reset and send it again if you still need it.";

/// An image attached to a message, before it is downloaded.
#[derive(Debug, Clone)]
pub struct IntakeFile {
    pub file_id: FileId,
    pub mime_hint: Option<String>,
    pub file_name: Option<String>,
    pub size: usize,
}

/// The largest photo size, or a document whose MIME type is an image.
pub fn intake_file(message: &Message) -> Option<IntakeFile> {
    if let Some(photo) = message.photo().and_then(|sizes| sizes.last()) {
        return Some(IntakeFile {
            file_id: photo.file.id.clone(),
            mime_hint: None,
            file_name: None,
            size: photo.file.size as usize,
        });
    }

    let document = message.document()?;
    let mime_type = document.mime_type.as_ref()?.essence_str().to_string();
    if !mime_type.starts_with("image/") {
        return None;
    }
    Some(IntakeFile {
        file_id: document.file.id.clone(),
        mime_hint: Some(mime_type),
        file_name: document.file_name.clone(),
        size: document.file.size as usize,
    })
}

pub async fn get_file_url(bot: &Bot, file_id: &FileId) -> Result<String> {
    let file = bot.get_file(file_id.clone()).await?;
    Ok(format!(
        "https://api.telegram.org/file/bot{}/{}",
        CONFIG.bot_token, file.path
    ))
}

/// An image whose slot is held while it downloads.
pub struct PendingIntake {
    file: IntakeFile,
    reservation: IntakeReservation,
    timer: CommandTimer,
}

/// Claims the image's slot. Runs in the dispatcher, which delivers a chat's
/// updates in order, so slots follow the order the images were sent.
pub async fn claim_intake_slot(
    bot: &Bot,
    state: &AppState,
    message: &Message,
) -> Result<Option<PendingIntake>> {
    let Some(file) = intake_file(message) else {
        return Ok(None);
    };
    let mut timer = start_command_timer("intake_image", message);

    if file.size > CONFIG.max_intake_image_bytes {
        reply_text(
            bot,
            message,
            &format!(
                "That image is too large ({} MB). Please send one under {} MB.",
                file.size / (1024 * 1024),
                CONFIG.max_intake_image_bytes / (1024 * 1024)
            ),
        )
        .await?;
        complete_command_timer(&mut timer, "error", Some("too_large".to_string()));
        return Ok(None);
    }

    let requested = message.caption().and_then(ImageSlot::from_caption);
    let reservation = state.with_session(message.chat.id, |session| {
        session.reserve_intake_slot(requested)
    });
    let Some(reservation) = reservation else {
        reply_text(bot, message, NOT_AT_INTAKE_MESSAGE).await?;
        complete_command_timer(&mut timer, "error", Some("not_at_intake".to_string()));
        return Ok(None);
    };

    Ok(Some(PendingIntake {
        file,
        reservation,
        timer,
    }))
}

/// Downloads the image and fills the slot claimed for it.
pub async fn complete_intake(
    bot: Bot,
    state: AppState,
    message: Message,
    pending: PendingIntake,
) -> Result<()> {
    let PendingIntake {
        file,
        reservation,
        mut timer,
    } = pending;
    let chat_id = message.chat.id;

    let bytes = match get_file_url(&bot, &file.file_id).await {
        Ok(url) => download_media(&url).await,
        Err(err) => {
            warn!("get_file failed for chat {chat_id}: {err}");
            None
        }
    };
    let Some(bytes) = bytes else {
        state.with_session(chat_id, |session| session.release_intake_slot(reservation));
        reply_text(&bot, &message, "I couldn't download that image. Please send it again.").await?;
        complete_command_timer(&mut timer, "error", Some("download_failed".to_string()));
        return Err(anyhow!("intake image download failed"));
    };

    let mime_type = resolve_image_mime(&bytes, file.mime_hint.as_deref());
    let image = ImageInput::new(bytes, mime_type, file.file_name.clone());
    let filled = state.with_session(chat_id, |session| {
        session.fill_intake_slot(reservation, image)
    });

    match filled {
        IntakeFill::Attached(slot) => {
            info!("Attached {:?} image in chat {}", slot, chat_id);
            reply_text(
                &bot,
                &message,
                &format!("✅ {} attached.", escape_html(slot.label())),
            )
            .await?;
            show_view(&bot, &state, chat_id, None).await?;
            complete_command_timer(&mut timer, "success", None);
        }
        IntakeFill::Superseded(slot) => {
            info!("Dropped superseded {:?} image in chat {}", slot, chat_id);
            reply_text(
                &bot,
                &message,
                &format!(
                    "This image was not used: a later image replaced it as the {}.",
                    escape_html(&slot.label().to_lowercase())
                ),
            )
            .await?;
            complete_command_timer(&mut timer, "error", Some("superseded".to_string()));
        }
        IntakeFill::FormClosed => {
            warn!("Dropping intake image for chat {chat_id}: project form closed during download");
            reply_text(&bot, &message, FORM_CLOSED_MESSAGE).await?;
            complete_command_timer(&mut timer, "error", Some("form_closed".to_string()));
        }
    }
    Ok(())
}
