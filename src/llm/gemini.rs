use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::{gemini_api_key, CONFIG};
use crate::llm::media::truncate_for_log;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;
use crate::wizard::{ImageDataUri, ImageInput, ProjectData};

pub const MISSING_API_KEY_MESSAGE: &str = "API_KEY environment variable is not set.";
pub const NO_IMAGE_MESSAGE: &str = "The AI did not return an image.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageGenerationError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Generation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPath {
    /// Both intake images present: edit the site photo after the concept.
    ImageEdit,
    TextToImage,
}

impl GenerationPath {
    fn operation(self) -> &'static str {
        match self {
            GenerationPath::ImageEdit => "image_edit",
            GenerationPath::TextToImage => "text_to_image",
        }
    }
}

pub fn select_path(project: &ProjectData) -> GenerationPath {
    if project.has_both_images() {
        GenerationPath::ImageEdit
    } else {
        GenerationPath::TextToImage
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    predictions: Option<Vec<ImagenPrediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
    rai_filtered_reason: Option<String>,
}

pub fn build_edit_prompt(location: &str, requirements: &str) -> String {
    format!(
        "Analyze the first image, which shows a building site at {location}.
Now, look at the second image, which shows a concept for a new building.
Your task is to edit the first image. You must seamlessly remove the existing building and replace it with a new one that is heavily inspired by the architecture in the second image.
The new building must fit realistically into the context of the first image (lighting, shadows, scale, perspective).
Incorporate the following user requirements: \"{requirements}\".
The final output must be only the edited, photorealistic image. Do not add any text."
    )
}

pub fn build_text_to_image_prompt(location: &str, requirements: &str) -> String {
    format!(
        "Generate a professional, photorealistic architectural photograph of a brand new building located at \"{location}\".
The building should be a complete replacement synthesis, seamlessly integrated into its surrounding streetscape.
The architectural style and features must follow these requirements: \"{requirements}\".
Apply creative GPS navigation:
- POSITIVE destination: modern, sustainable, innovative design, high-end materials like glass, steel, and natural wood.
- NEGATIVE safety boundaries: avoid unrealistic elements, distorted perspectives, or elements that clash with an urban environment.
- LATENT GAP creative playground: explore creative lighting, dynamic angles, and a sense of lived-in reality.
The final image should have a professional quality, with realistic lighting, shadows, and textures.
Camera: Use a wide-angle lens (around 24mm) at eye-level to capture the building in its context.
Lighting: Golden hour warmth with soft ambient shadows.
Atmosphere: Clear day clarity, post-rain freshness."
    )
}

fn inline_image_part(image: &ImageInput) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.to_base64()
        }
    })
}

fn build_edit_payload(original: &ImageInput, concept: &ImageInput, prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                inline_image_part(original),
                inline_image_part(concept),
                { "text": prompt }
            ]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"]
        }
    })
}

fn build_text_to_image_payload(prompt: &str) -> Value {
    json!({
        "instances": [{ "prompt": prompt }],
        "parameters": {
            "sampleCount": 1,
            "outputMimeType": "image/png",
            "aspectRatio": CONFIG.image_aspect_ratio
        }
    })
}

fn summarize_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(parts) = payload.pointer("/contents/0/parts").and_then(|v| v.as_array()) {
        let parts: Vec<Value> = parts
            .iter()
            .map(|part| {
                if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                    json!({ "text": truncate_for_log(text, 200) })
                } else if let Some(inline_data) = part.get("inlineData") {
                    let mime_type = inline_data
                        .get("mimeType")
                        .and_then(|value| value.as_str())
                        .unwrap_or("unknown");
                    let data_len = inline_data
                        .get("data")
                        .and_then(|value| value.as_str())
                        .map(|value| value.len())
                        .unwrap_or(0);
                    json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
                } else {
                    json!({ "unknownPart": true })
                }
            })
            .collect();
        summary.insert("parts".to_string(), Value::Array(parts));
    }

    if let Some(prompt) = payload.pointer("/instances/0/prompt").and_then(|v| v.as_str()) {
        summary.insert("prompt".to_string(), json!(truncate_for_log(prompt, 200)));
    }

    for key in ["generationConfig", "parameters"] {
        if let Some(config) = payload.get(key) {
            summary.insert(key.to_string(), config.clone());
        }
    }

    Value::Object(summary)
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

/// One request, no retries. Errors come back as plain diagnostic text for
/// the caller to wrap.
async fn post_generation_request<T: DeserializeOwned>(
    api_key: &str,
    model: &str,
    method: &str,
    payload: &Value,
) -> Result<T, String> {
    let url = format!("{}/models/{}:{}", CONFIG.gemini_api_base, model, method);

    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!(target: "llm.gemini", model = model, payload = %summarize_payload(payload));
    }

    let response = get_http_client()
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(payload)
        .send()
        .await
        .map_err(|err| {
            warn!(
                "Gemini request failed to send: {} (timeout={}, connect={})",
                err, err.is_timeout(), err.is_connect()
            );
            if err.is_timeout() {
                format!("request timed out after {}s", CONFIG.gemini_timeout_seconds)
            } else {
                format!("request failed: {err}")
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let (message, body_summary) = summarize_error_body(&body);
        warn!("Gemini API error: status={}, body={}", status, body_summary);
        let detail = message.unwrap_or(body_summary);
        return Err(format!("status {status}: {detail}"));
    }

    response
        .json::<T>()
        .await
        .map_err(|err| format!("malformed response: {err}"))
}

fn extract_edited_image(response: GeminiResponse) -> Result<ImageDataUri, ImageGenerationError> {
    let mut text_parts = Vec::new();
    let mut finish_reasons = Vec::new();

    for candidate in response.candidates.unwrap_or_default() {
        if let Some(reason) = candidate.finish_reason {
            finish_reasons.push(reason);
        }
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            match part {
                GeminiPart::InlineData { inline_data } if !inline_data.data.trim().is_empty() => {
                    return Ok(ImageDataUri::new(inline_data.mime_type, inline_data.data));
                }
                GeminiPart::Text { text } if !text.trim().is_empty() => text_parts.push(text),
                _ => {}
            }
        }
    }

    let mut reason = text_parts.join("\n");
    if reason.is_empty() {
        reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|block| format!("blocked ({block})"))
            .or_else(|| finish_reasons.first().map(|finish| format!("finish reason {finish}")))
            .unwrap_or_else(|| "no text returned".to_string());
    }

    Err(ImageGenerationError::Generation(format!(
        "{NO_IMAGE_MESSAGE} It might have refused the request. Response: {reason}"
    )))
}

fn extract_generated_image(response: ImagenResponse) -> Result<ImageDataUri, ImageGenerationError> {
    let predictions = response.predictions.unwrap_or_default();

    if let Some(prediction) = predictions.iter().find(|prediction| {
        prediction
            .bytes_base64_encoded
            .as_deref()
            .is_some_and(|data| !data.trim().is_empty())
    }) {
        let mime_type = prediction
            .mime_type
            .clone()
            .unwrap_or_else(|| "image/png".to_string());
        let data = prediction.bytes_base64_encoded.clone().unwrap_or_default();
        return Ok(ImageDataUri::new(mime_type, data));
    }

    let mut message = format!("{NO_IMAGE_MESSAGE} The prompt may have been blocked.");
    if let Some(reason) = predictions
        .iter()
        .find_map(|prediction| prediction.rai_filtered_reason.as_deref())
    {
        message.push_str(&format!(" Reason: {reason}"));
    }
    Err(ImageGenerationError::Generation(message))
}

/// Synthesizes the final visualization for a submitted project. Which model
/// is used depends on [`select_path`]; callers get a data URI either way.
pub async fn generate_architectural_image(
    project: &ProjectData,
) -> Result<ImageDataUri, ImageGenerationError> {
    let api_key = gemini_api_key()
        .ok_or_else(|| ImageGenerationError::Configuration(MISSING_API_KEY_MESSAGE.to_string()))?;

    let path = select_path(project);
    info!(
        path = path.operation(),
        location = %truncate_for_log(&project.location, 80),
        "starting architectural image generation"
    );

    match (path, &project.original_image, &project.concept_image) {
        (GenerationPath::ImageEdit, Some(original), Some(concept)) => {
            let model = CONFIG.gemini_edit_model.as_str();
            let prompt = build_edit_prompt(&project.location, &project.requirements);
            let payload = build_edit_payload(original, concept, &prompt);
            let response = log_llm_timing("gemini", model, path.operation(), None, || {
                post_generation_request::<GeminiResponse>(&api_key, model, "generateContent", &payload)
            })
            .await
            .map_err(|detail| {
                ImageGenerationError::Generation(format!(
                    "Failed to generate image with image editing model: {detail}"
                ))
            })?;
            extract_edited_image(response)
        }
        _ => {
            let model = CONFIG.imagen_model.as_str();
            let prompt = build_text_to_image_prompt(&project.location, &project.requirements);
            let payload = build_text_to_image_payload(&prompt);
            let response = log_llm_timing("gemini", model, path.operation(), None, || {
                post_generation_request::<ImagenResponse>(&api_key, model, "predict", &payload)
            })
            .await
            .map_err(|detail| {
                ImageGenerationError::Generation(format!(
                    "Failed to generate image with text-to-image model: {detail}"
                ))
            })?;
            extract_generated_image(response)
        }
    }
}
