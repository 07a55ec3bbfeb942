//! services/api/src/adapters/vision_llm.rs
//!
//! This module contains the adapter for the vision model. It implements the
//! `VisionAnalysisService` port from the `core` crate by sending the image
//! inline to an OpenAI-compatible multimodal chat model and parsing the
//! JSON-mode response.

const VISION_PROMPT: &str = "Analyze this image for language learning. \
Return a JSON object with these fields: \
detectedLanguage (the primary language visible in the image), \
documentType (menu, sign, label, handwriting, or other), \
items (array of { rawText, category } for each distinct piece of text), \
and sceneSummary (one sentence describing the scene). \
Respond with JSON only.";

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ImageUrlArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};

use lingualive_core::domain::VisionAnalysis;
use lingualive_core::ports::{PortError, PortResult, VisionAnalysisService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `VisionAnalysisService` using an OpenAI-compatible
/// multimodal model.
#[derive(Clone)]
pub struct OpenAiVisionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVisionAdapter {
    /// Creates a new `OpenAiVisionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `VisionAnalysisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl VisionAnalysisService for OpenAiVisionAdapter {
    /// Extracts a structured scene analysis from raw image bytes.
    async fn analyze_image(
        &self,
        image: &[u8],
        content_type: &str,
    ) -> PortResult<VisionAnalysis> {
        let data_url = format!(
            "data:{};base64,{}",
            content_type,
            general_purpose::STANDARD.encode(image)
        );

        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(VISION_PROMPT)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(data_url)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            )
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(vec![text_part.into(), image_part.into()])
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .response_format(ResponseFormat::JsonObject)
            .temperature(0.2)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Vision model response contained no text content.".to_string())
            })?;

        // The model is not trusted to emit valid JSON; validate before use.
        serde_json::from_str(&content).map_err(|e| {
            PortError::Unexpected(format!("Vision model returned malformed JSON: {}", e))
        })
    }
}
