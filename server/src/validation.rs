use crate::error::ApiError;

/// Maximum text length for TTS requests, in characters
const MAX_TEXT_LENGTH: usize = 5000;

/// Validate the `text` field of a TTS request and return it.
pub fn validate_tts_request(text: Option<&str>) -> Result<&str, ApiError> {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return Err(ApiError::InvalidInput("No text provided".to_string())),
    };
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(text)
}
