use streamtts_core::SynthesisError;

use crate::error::ApiError;

/// Check the text of a synthesis request.
///
/// Empty and whitespace-only text is rejected; so is text longer than
/// `max_chars` characters.
pub fn validate_text(text: &str, max_chars: usize) -> Result<&str, SynthesisError> {
    if text.trim().is_empty() {
        return Err(SynthesisError::EmptyInput);
    }
    if text.chars().count() > max_chars {
        return Err(SynthesisError::TextTooLong { max: max_chars });
    }
    Ok(text)
}

/// Validate a local model identifier passed over HTTP.
pub fn validate_model_id(model_id: &str) -> Result<&str, ApiError> {
    let model_id = model_id.trim();
    if model_id.is_empty() {
        return Err(ApiError::InvalidInput("Model identifier cannot be empty".to_string()));
    }
    if model_id.len() > 256 {
        return Err(ApiError::InvalidInput(
            "Model identifier too long (max 256 characters)".to_string(),
        ));
    }
    Ok(model_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_valid() {
        assert_eq!(validate_text("Hello", 10).unwrap(), "Hello");
        // counted in characters, not bytes
        assert!(validate_text("ééééé", 5).is_ok());
    }

    #[test]
    fn test_validate_text_empty() {
        assert!(matches!(validate_text("", 10), Err(SynthesisError::EmptyInput)));
        assert!(matches!(validate_text("  \n ", 10), Err(SynthesisError::EmptyInput)));
    }

    #[test]
    fn test_validate_text_too_long() {
        let err = validate_text(&"a".repeat(11), 10).unwrap_err();
        assert!(matches!(err, SynthesisError::TextTooLong { max: 10 }));
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_validate_model_id() {
        assert_eq!(validate_model_id(" tts_models/en/x ").unwrap(), "tts_models/en/x");
        assert!(validate_model_id("   ").is_err());
        assert!(validate_model_id(&"m".repeat(300)).is_err());
    }
}
