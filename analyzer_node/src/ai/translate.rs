//! Translation endpoint backing: single prompt, no retries.

use crate::ai::provider::{LlmError, TextGenerator};
use crate::api::errors::ApiError;

pub async fn translate(
    generator: &dyn TextGenerator,
    text: &str,
    target_language: &str,
) -> Result<String, ApiError> {
    if text.is_empty() || target_language.is_empty() {
        return Err(ApiError::InvalidInput(
            "Text and target language are required for translation.".to_string(),
        ));
    }

    let prompt = format!(
        r#"Translate the following English text into {target_language}. Provide only the translated text, without any additional commentary or formatting.

English Text: "{text}"

Translated {target_language} Text:"#
    );

    let translated = generator.generate(&prompt).await.map_err(|err| match err {
        LlmError::Overloaded(_) => ApiError::UpstreamOverloaded(
            "Translation service is currently overloaded. Please try again later.".to_string(),
        ),
        LlmError::Auth(_) => ApiError::ConfigMissing(
            "Translation service configuration error. Please ensure your API key is valid."
                .to_string(),
        ),
        _ => ApiError::Unexpected("Failed to translate text. Please try again.".to_string()),
    })?;

    Ok(translated.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Scripted(String);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn missing_inputs_are_rejected() {
        let generator = Scripted("hola".to_string());
        assert!(translate(&generator, "", "Spanish").await.is_err());
        assert!(translate(&generator, "hello", "").await.is_err());
    }

    #[tokio::test]
    async fn response_is_trimmed() {
        let generator = Scripted("  hola mundo \n".to_string());
        let out = translate(&generator, "hello world", "Spanish")
            .await
            .unwrap();
        assert_eq!(out, "hola mundo");
    }
}
