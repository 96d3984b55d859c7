//! Gemini `generateContent` re-ranker
//!
//! Sends one prompt per call and reads the text parts of the first response candidate.
//! The API key travels as the `key` query parameter.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{Interaction, MediaItem},
    services::reranker::{build_prompt, extract_ranked_ids, Reranker, MAX_PROMPT_CANDIDATES},
};

const TEMPERATURE: f64 = 0.4;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct GeminiReranker {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiReranker {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    async fn generate(&self, prompt: String) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                model = %self.model,
                "Gemini request failed"
            );
            return Err(AppError::RerankFailure(format!(
                "Gemini returned status {}",
                status
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::RerankFailure(format!("Failed to parse Gemini response: {}", e))
        })?;

        Ok(body.text())
    }
}

#[async_trait::async_trait]
impl Reranker for GeminiReranker {
    async fn rerank(
        &self,
        preferences: &[String],
        history: &[Interaction],
        candidates: &[MediaItem],
    ) -> AppResult<Vec<String>> {
        let prompt_candidates = &candidates[..candidates.len().min(MAX_PROMPT_CANDIDATES)];
        let prompt = build_prompt(preferences, history, prompt_candidates);

        let text = self.generate(prompt).await?;
        tracing::debug!(response = %text, "Raw Gemini response");

        let ids = extract_ranked_ids(&text, prompt_candidates)?;

        tracing::info!(
            candidates = prompt_candidates.len(),
            ranked = ids.len(),
            reranker = "gemini",
            "Candidates re-ranked"
        );

        Ok(ids)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
