use anyhow::Result;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::handlers::generation::start_generation;
use crate::handlers::responses::show_view;
use crate::handlers::view::WizardAction;
use crate::state::{AppState, ChatSession};
use crate::wizard::WizardError;

fn apply_action(session: &mut ChatSession, action: WizardAction) -> Result<(), WizardError> {
    match action {
        WizardAction::Back => session.wizard.back(),
        WizardAction::Next | WizardAction::Resume => session.wizard.next(),
        WizardAction::Reset => {
            session.reset();
            Ok(())
        }
        // Generation needs the spawned task; see `start_generation`.
        WizardAction::Generate => Err(WizardError::invalid(
            "generate",
            session.wizard.current_step(),
        )),
    }
}

pub async fn wizard_callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let Some(action) = query.data.as_deref().and_then(WizardAction::parse) else {
        return Ok(());
    };
    let Some(message) = query.message.as_ref() else {
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let result = match action {
        WizardAction::Generate => {
            start_generation(bot.clone(), state.clone(), chat_id, Some(message_id)).await
        }
        _ => state.with_session(chat_id, |session| apply_action(session, action)),
    };

    match result {
        Ok(()) => {
            bot.answer_callback_query(query.id.clone()).await?;
            info!("Applied {:?} in chat {}", action, chat_id);
            if action != WizardAction::Generate {
                show_view(&bot, &state, chat_id, Some(message_id)).await?;
            }
        }
        Err(err) => {
            warn!("Rejected {:?} in chat {}: {err}", action, chat_id);
            bot.answer_callback_query(query.id.clone())
                .text(err.to_string())
                .show_alert(true)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{ImageInput, ProjectData};

    fn reviewing() -> ChatSession {
        let mut session = ChatSession::default();
        session
            .wizard
            .submit(ProjectData::new("Lisbon", "cork facade", None, None))
            .unwrap();
        session
    }

    #[test]
    fn back_then_resume_keeps_edits() {
        let mut session = reviewing();
        session.wizard.set_item_value(0, 0, 0, "custom").unwrap();
        apply_action(&mut session, WizardAction::Back).unwrap();
        assert_eq!(session.wizard.current_step(), 0);
        apply_action(&mut session, WizardAction::Resume).unwrap();
        assert_eq!(session.wizard.current_step(), 1);
        assert_eq!(
            session.wizard.steps_data().item(1, 0, 0, 0).unwrap().value,
            "custom"
        );
    }

    #[test]
    fn reset_clears_draft_and_project() {
        let mut session = reviewing();
        session.wizard.back().unwrap();
        let reservation = session.reserve_intake_slot(None).unwrap();
        session.fill_intake_slot(reservation, ImageInput::new(vec![1], "image/png", None));
        assert!(session.draft.original_image.is_some());
        apply_action(&mut session, WizardAction::Reset).unwrap();
        assert_eq!(session.wizard.current_step(), 0);
        assert!(session.wizard.project_data().is_none());
        assert!(session.draft.original_image.is_none());
    }

    #[test]
    fn stale_buttons_are_rejected() {
        let mut session = ChatSession::default();
        assert_eq!(
            apply_action(&mut session, WizardAction::Back),
            Err(WizardError::invalid("back", 0))
        );
        assert!(apply_action(&mut session, WizardAction::Resume).is_err());
    }

    #[test]
    fn generate_never_runs_through_plain_navigation() {
        let mut session = reviewing();
        for _ in 1..6 {
            apply_action(&mut session, WizardAction::Next).unwrap();
        }
        assert_eq!(
            apply_action(&mut session, WizardAction::Generate),
            Err(WizardError::invalid("generate", 6))
        );
        assert_eq!(session.wizard.current_step(), 6);
        assert!(!session.wizard.generation().is_loading);
    }
}
