use std::env;

use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub log_level: String,
    pub gemini_api_base: String,
    pub gemini_edit_model: String,
    pub imagen_model: String,
    pub image_aspect_ratio: String,
    pub gemini_timeout_seconds: u64,
    pub telegram_max_length: usize,
    pub max_intake_image_bytes: usize,
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::load);

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

const SUPPORTED_ASPECT_RATIOS: [&str; 5] = ["1:1", "3:4", "4:3", "9:16", "16:9"];

fn normalize_aspect_ratio(value: String) -> String {
    let trimmed = value.trim();
    if SUPPORTED_ASPECT_RATIOS.contains(&trimmed) {
        return trimmed.to_string();
    }
    warn!(
        "Unsupported IMAGE_ASPECT_RATIO value '{}'; defaulting to 16:9.",
        value
    );
    "16:9".to_string()
}

impl Config {
    pub fn load() -> Self {
        Config {
            bot_token: env_string("BOT_TOKEN", ""),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            gemini_api_base: env_string(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            )
            .trim_end_matches('/')
            .to_string(),
            gemini_edit_model: env_string("GEMINI_EDIT_MODEL", "gemini-2.5-flash-image-preview"),
            imagen_model: env_string("IMAGEN_MODEL", "imagen-4.0-generate-001"),
            image_aspect_ratio: normalize_aspect_ratio(env_string("IMAGE_ASPECT_RATIO", "16:9")),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", 120).max(1),
            telegram_max_length: env_usize("TELEGRAM_MAX_LENGTH", 4000),
            max_intake_image_bytes: env_usize("MAX_INTAKE_IMAGE_BYTES", 20 * 1024 * 1024),
        }
    }
}

/// The generation credential is read on every call, never cached, so a key
/// added to the environment later is picked up without a restart.
pub fn gemini_api_key() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

pub const HELP_TEXT: &str = "
<b>Architectural Synthesis Wizard</b>
Turn your ideas into reality. A 6-step process transforms your concept into a photorealistic architectural image.

<b>1. Provide project details</b>
Optionally send two photos: the original site image (caption <code>original</code>) and a new building concept (caption <code>concept</code>). Without captions the first photo is the site, the second the concept.
With both photos the site image is edited; otherwise the image is generated from text.

Then submit the form:
<code>/project 123 Main St | modern glass tower with timber accents</code>

<b>2. Review the six steps</b>
Use the buttons to go back, confirm or reset.
Edit a value on the current step with
<code>/set section.detail.item new value</code> (e.g. <code>/set 1.2.3 96% Object Isolation</code>)

<b>3. Generate</b>
Press <i>Generate Final Image</i> on step 6.

/step - Show the current step again
/reset - Start over
/help - Show this help message
";
