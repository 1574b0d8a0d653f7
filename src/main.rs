use std::error::Error;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

mod config;
mod handlers;
mod llm;
mod state;
mod utils;
mod wizard;

use config::{gemini_api_key, CONFIG};
use handlers::generation::run_completion_listener;
use handlers::intake::intake_file;
use handlers::view::WIZARD_CALLBACK_PREFIX;
use handlers::{commands, intake, navigation};
use state::AppState;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
    Help,
    Project(String),
    Set(String),
    Step,
    Reset,
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging();

    if CONFIG.bot_token.trim().is_empty() {
        return Err("BOT_TOKEN is required".into());
    }
    if gemini_api_key().is_none() {
        warn!("GEMINI_API_KEY is not set; image generation will fail until it is configured");
    }

    let bot = Bot::new(CONFIG.bot_token.clone());
    info!(
        "Starting architectural synthesis wizard (edit model {}, text-to-image model {})",
        CONFIG.gemini_edit_model, CONFIG.imagen_model
    );

    let (state, completions) = AppState::new();
    tokio::spawn(run_completion_listener(
        bot.clone(),
        state.clone(),
        completions,
    ));

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| intake_file(&msg).is_some())
                .endpoint(handle_intake_image),
        )
        .endpoint(ignore_message);

    let callback_state = state.clone();
    let callback_handler =
        Update::filter_callback_query().endpoint(move |bot: Bot, query: CallbackQuery| {
            let state = callback_state.clone();
            async move { handle_callback_query(bot, state, query).await }
        });

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    match command {
        Command::Start => commands::start_handler(bot, state, message).await?,
        Command::Help => commands::help_handler(bot, message).await?,
        Command::Project(arg) => commands::project_handler(bot, state, message, arg).await?,
        Command::Set(arg) => commands::set_handler(bot, state, message, arg).await?,
        Command::Step => commands::step_handler(bot, state, message).await?,
        Command::Reset => commands::reset_handler(bot, state, message).await?,
    }
    Ok(())
}

async fn handle_intake_image(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    // Only the download leaves the dispatcher; the slot is claimed in order.
    let Some(pending) = intake::claim_intake_slot(&bot, &state, &message).await? else {
        return Ok(());
    };
    tokio::spawn(async move {
        if let Err(err) = intake::complete_intake(bot, state, message, pending).await {
            error!("intake image handler failed: {err}");
        }
    });
    Ok(())
}

async fn handle_callback_query(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    if data.starts_with(WIZARD_CALLBACK_PREFIX) {
        tokio::spawn(async move {
            if let Err(err) = navigation::wizard_callback(bot, state, query).await {
                error!("wizard callback failed: {err}");
            }
        });
    }
    Ok(())
}

async fn ignore_message() -> HandlerResult {
    Ok(())
}
