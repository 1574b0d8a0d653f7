use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters};
use tracing::info;

use crate::config::HELP_TEXT;
use crate::handlers::responses::{reply_text, show_view};
use crate::handlers::view::escape_html;
use crate::state::AppState;
use crate::utils::timing::{complete_command_timer, start_command_timer};

const SET_USAGE: &str =
    "Usage: <code>/set section.detail.item new value</code>, e.g. <code>/set 1.2.3 96% Object Isolation</code>";

/// Splits `/project` arguments into location and requirements. The two
/// fields are separated by `|` or a line break; a missing half is left empty
/// so the wizard reports it.
pub fn parse_project_args(arg: &str) -> (String, String) {
    let split = arg.split_once('|').or_else(|| arg.split_once('\n'));
    match split {
        Some((location, requirements)) => {
            (location.trim().to_string(), requirements.trim().to_string())
        }
        None => (arg.trim().to_string(), String::new()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetArgs {
    pub section: usize,
    pub detail: usize,
    pub item: usize,
    pub value: String,
}

/// Parses `s.d.i value` with 1-based indices into 0-based ones.
pub fn parse_set_args(arg: &str) -> Result<SetArgs, String> {
    let trimmed = arg.trim_start();
    let (path, value) = match trimmed.split_once(char::is_whitespace) {
        Some((path, value)) => (path, value.trim()),
        None => (trimmed, ""),
    };

    let indices = path
        .split('.')
        .map(|part| part.parse::<usize>().ok().filter(|index| *index > 0))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| SET_USAGE.to_string())?;

    match indices.as_slice() {
        [section, detail, item] => Ok(SetArgs {
            section: section - 1,
            detail: detail - 1,
            item: item - 1,
            value: value.to_string(),
        }),
        _ => Err(SET_USAGE.to_string()),
    }
}

pub async fn start_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    bot.send_message(
        message.chat.id,
        "Hello! I am the architectural synthesis wizard. Use /help to see how it works.",
    )
    .reply_parameters(ReplyParameters::new(message.id))
    .await?;
    show_view(&bot, &state, message.chat.id, None).await?;
    Ok(())
}

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(message.chat.id, HELP_TEXT)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(())
}

pub async fn project_handler(bot: Bot, state: AppState, message: Message, arg: String) -> Result<()> {
    let mut timer = start_command_timer("project", &message);
    let chat_id = message.chat.id;
    let (location, requirements) = parse_project_args(&arg);

    let submitted = state.with_session(chat_id, |session| {
        let project = session.draft.to_project(&location, &requirements);
        let with_images = (project.original_image.is_some(), project.concept_image.is_some());
        session.wizard.submit(project).map(|_| with_images)
    });

    match submitted {
        Ok((original, concept)) => {
            info!(
                "Project submitted in chat {}: original_image={} concept_image={}",
                chat_id, original, concept
            );
            show_view(&bot, &state, chat_id, None).await?;
            complete_command_timer(&mut timer, "success", None);
        }
        Err(err) => {
            reply_text(&bot, &message, &escape_html(&err.to_string())).await?;
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
        }
    }
    Ok(())
}

pub async fn set_handler(bot: Bot, state: AppState, message: Message, arg: String) -> Result<()> {
    let mut timer = start_command_timer("set", &message);
    let chat_id = message.chat.id;

    let args = match parse_set_args(&arg) {
        Ok(args) => args,
        Err(usage) => {
            reply_text(&bot, &message, &usage).await?;
            complete_command_timer(&mut timer, "error", Some("usage".to_string()));
            return Ok(());
        }
    };

    let updated = state.with_session(chat_id, |session| {
        session
            .wizard
            .set_item_value(args.section, args.detail, args.item, &args.value)
    });

    match updated {
        Ok(()) => {
            show_view(&bot, &state, chat_id, None).await?;
            complete_command_timer(&mut timer, "success", None);
        }
        Err(err) => {
            reply_text(&bot, &message, &escape_html(&err.to_string())).await?;
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
        }
    }
    Ok(())
}

pub async fn step_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    show_view(&bot, &state, message.chat.id, None).await?;
    Ok(())
}

pub async fn reset_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let chat_id = message.chat.id;
    state.with_session(chat_id, |session| session.reset());
    info!("Wizard reset in chat {}", chat_id);
    show_view(&bot, &state, chat_id, None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_args_split_on_pipe_or_newline() {
        assert_eq!(
            parse_project_args(" 123 Main St | glass tower | timber "),
            ("123 Main St".to_string(), "glass tower | timber".to_string())
        );
        assert_eq!(
            parse_project_args("Seoul\nbrick revival"),
            ("Seoul".to_string(), "brick revival".to_string())
        );
        assert_eq!(
            parse_project_args("only a location"),
            ("only a location".to_string(), String::new())
        );
    }

    #[test]
    fn set_args_are_converted_to_zero_based() {
        assert_eq!(
            parse_set_args("1.2.3 96% Object Isolation"),
            Ok(SetArgs {
                section: 0,
                detail: 1,
                item: 2,
                value: "96% Object Isolation".to_string(),
            })
        );
    }

    #[test]
    fn set_without_value_clears_the_item() {
        assert_eq!(parse_set_args("2.1.1").map(|args| args.value), Ok(String::new()));
    }

    #[test]
    fn malformed_set_paths_show_usage() {
        for arg in ["", "1.2", "1.2.3.4 x", "0.1.1 x", "a.b.c x", "1..2 x"] {
            assert_eq!(parse_set_args(arg), Err(SET_USAGE.to_string()), "{arg:?}");
        }
    }
}
