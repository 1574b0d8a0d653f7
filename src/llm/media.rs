use std::time::Duration;

use reqwest::StatusCode;
use tracing::{error, warn};

use crate::utils::http::get_http_client;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

/// Picks the MIME type sent alongside an intake image: the client's hint if
/// it names an image type, otherwise the sniffed type, otherwise JPEG (what
/// Telegram re-encodes photos to).
pub fn resolve_image_mime(bytes: &[u8], hint: Option<&str>) -> String {
    if let Some(hint) = hint {
        let normalized = normalize_image_mime_type(hint);
        if normalized.starts_with("image/") {
            return normalized;
        }
    }
    detect_mime_type(bytes)
        .map(|mime| normalize_image_mime_type(&mime))
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}

const MEDIA_DOWNLOAD_MAX_ATTEMPTS: usize = 3;
const MEDIA_DOWNLOAD_BASE_DELAY_MS: u64 = 400;
const MEDIA_DOWNLOAD_ERROR_BODY_LIMIT: usize = 800;

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn should_retry_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Fetches an uploaded file from Telegram's file endpoint. The URL embeds the
/// bot token, so it is never logged.
pub async fn download_media(url: &str) -> Option<Vec<u8>> {
    let client = get_http_client();
    for attempt in 0..MEDIA_DOWNLOAD_MAX_ATTEMPTS {
        let response = match client.get(url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                let retryable = should_retry_error(&err);
                warn!(
                    "Failed to fetch media: (timeout={}, connect={}, status={:?}, attempt={}/{}) {}",
                    err.is_timeout(),
                    err.is_connect(),
                    err.status(),
                    attempt + 1,
                    MEDIA_DOWNLOAD_MAX_ATTEMPTS,
                    err.without_url()
                );
                if !retryable || attempt + 1 == MEDIA_DOWNLOAD_MAX_ATTEMPTS {
                    return None;
                }
                let delay = Duration::from_millis(MEDIA_DOWNLOAD_BASE_DELAY_MS << attempt);
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Media download failed with status {}: {}",
                status,
                truncate_for_log(&body, MEDIA_DOWNLOAD_ERROR_BODY_LIMIT)
            );
            if !should_retry_status(status) || attempt + 1 == MEDIA_DOWNLOAD_MAX_ATTEMPTS {
                return None;
            }
            let delay = Duration::from_millis(MEDIA_DOWNLOAD_BASE_DELAY_MS << attempt);
            tokio::time::sleep(delay).await;
            continue;
        }

        return match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                error!(
                    "Failed to read media bytes: {} (attempt={}/{})",
                    err.without_url(),
                    attempt + 1,
                    MEDIA_DOWNLOAD_MAX_ATTEMPTS
                );
                if attempt + 1 == MEDIA_DOWNLOAD_MAX_ATTEMPTS {
                    None
                } else {
                    let delay = Duration::from_millis(MEDIA_DOWNLOAD_BASE_DELAY_MS << attempt);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 16] = [
        0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0x0d, b'I', b'H', b'D', b'R',
    ];

    #[test]
    fn image_hint_wins_and_is_normalized() {
        assert_eq!(resolve_image_mime(&PNG_HEADER, Some("IMAGE/JPG")), "image/jpeg");
    }

    #[test]
    fn sniffs_when_hint_is_missing_or_not_an_image() {
        assert_eq!(resolve_image_mime(&PNG_HEADER, None), "image/png");
        assert_eq!(
            resolve_image_mime(&PNG_HEADER, Some("application/octet-stream")),
            "image/png"
        );
    }

    #[test]
    fn unknown_bytes_default_to_jpeg() {
        assert_eq!(resolve_image_mime(b"not an image", None), "image/jpeg");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_for_log("abc", 5), "abc");
        assert_eq!(truncate_for_log("벽돌건물", 2), "벽돌... (truncated)");
    }
}
