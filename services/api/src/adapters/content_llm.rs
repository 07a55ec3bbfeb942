//! services/api/src/adapters/content_llm.rs
//!
//! This module contains the adapter for the learning-content LLM.
//! It implements the `ContentGenerationService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = "You are LinguaLive, an immersive language tutor. \
Given a structured analysis of a photographed scene, create translations, \
pronunciation hints, cultural notes, useful phrases, a vocabulary deck, a \
conversation scenario, and a short quiz. Respond with JSON only.";

const USER_INPUT_TEMPLATE: &str = r#"Input analysis JSON: {analysis}

Return a JSON object following this schema exactly:
{
  "translations": [{ "original", "translation", "pronunciation", "notes" }],
  "culturalNotes": [string],
  "usefulPhrases": [{ "phrase", "meaning" }],
  "vocabularyDeck": [{ "term", "translation", "pronunciation", "partOfSpeech" }],
  "conversationScenario": { "title", "prompt", "phrases": [{ "phrase", "meaning" }] },
  "quiz": { "title", "questions": [{ "type": "match" | "multiple_choice", "prompt", "options", "answer" }] }
}"#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;

use lingualive_core::domain::{LearningPayload, VisionAnalysis};
use lingualive_core::ports::{ContentGenerationService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentGenerationService` using an
/// OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiContentAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiContentAdapter {
    /// Creates a new `OpenAiContentAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for OpenAiContentAdapter {
    /// Turns a scene analysis into the full learning payload.
    async fn generate_learning_content(
        &self,
        analysis: &VisionAnalysis,
    ) -> PortResult<LearningPayload> {
        let analysis_json = serde_json::to_string(analysis)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let user_input = USER_INPUT_TEMPLATE.replace("{analysis}", &analysis_json);

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .temperature(0.4)
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
                PortError::Unexpected(
                    "Content generation LLM response contained no text content.".to_string(),
                )
            })?;

        // The model is not trusted to emit valid JSON; validate before use.
        serde_json::from_str(&content).map_err(|e| {
            PortError::Unexpected(format!(
                "Content generation LLM returned malformed JSON: {}",
                e
            ))
        })
    }
}
