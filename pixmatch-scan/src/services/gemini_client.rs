//! Google Generative Language (Gemini) comparison client
//!
//! Sends the reference image, the batch of candidates and an instruction to
//! `models/{model}:generateContent`, asking for a JSON array of matches that
//! conforms to a response schema.

use serde::Deserialize;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::comparator::{ComparisonError, ImageComparator};
use crate::config::ComparisonSettings;
use crate::models::{EncodedImage, ImageRecord, MatchResult};

const USER_AGENT: &str = concat!("pixmatch-scan/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini-backed [`ImageComparator`]
pub struct GeminiComparator {
    http_client: reqwest::Client,
    rate_limiter: governor::DefaultDirectRateLimiter,
    settings: ComparisonSettings,
}

impl GeminiComparator {
    pub fn new(settings: ComparisonSettings) -> Result<Self, ComparisonError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ComparisonError::Network(e.to_string()))?;

        let per_minute =
            NonZeroU32::new(settings.max_requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = governor::RateLimiter::direct(governor::Quota::per_minute(per_minute));

        Ok(Self {
            http_client,
            rate_limiter,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait::async_trait]
impl ImageComparator for GeminiComparator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn compare(
        &self,
        reference: &EncodedImage,
        candidates: &[Arc<ImageRecord>],
    ) -> Result<Vec<MatchResult>, ComparisonError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(ComparisonError::MissingApiKey)?;

        self.rate_limiter.until_ready().await;

        let body = build_request_body(
            reference,
            candidates,
            self.settings.similarity_threshold,
            &self.settings.response_language,
        );

        tracing::debug!(
            model = %self.settings.model,
            candidates = candidates.len(),
            "Submitting comparison batch"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ComparisonError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ComparisonError::Network(e.to_string()))?;

        if status == 401 || status == 403 || text.contains("API_KEY_INVALID") {
            return Err(ComparisonError::InvalidApiKey);
        }
        if !status.is_success() {
            return Err(ComparisonError::Api(status.as_u16(), text));
        }

        Ok(parse_generate_content(&text))
    }
}

/// Instruction text sent after the images
pub fn build_prompt(candidates: &[Arc<ImageRecord>], threshold: u8, language: &str) -> String {
    let mapping = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("Image {}: {}", i + 1, c.id))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the target image (the first image) and compare it with the {count} candidate \
         images that follow it, in order. Identify which candidate images show the same person, \
         object, scene or very similar visual content. Return a JSON array of match objects for \
         the best candidates with a similarity score above {threshold}. The 'reason' field must \
         be written in {language}. Candidate ID mapping in order: {mapping}",
        count = candidates.len(),
    )
}

/// Schema the model's JSON output must conform to
pub fn response_schema(language: &str) -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": {
                    "type": "STRING",
                    "description": "The candidate image ID"
                },
                "similarityScore": {
                    "type": "NUMBER",
                    "description": "Similarity score from 0 to 100"
                },
                "reason": {
                    "type": "STRING",
                    "description": format!("Short explanation of why the image matches, in {}", language)
                }
            },
            "required": ["id", "similarityScore", "reason"]
        }
    })
}

fn inline_part(image: &EncodedImage) -> Value {
    json!({
        "inline_data": {
            "mime_type": image.mime_type,
            "data": image.data,
        }
    })
}

/// Full `generateContent` request body
pub fn build_request_body(
    reference: &EncodedImage,
    candidates: &[Arc<ImageRecord>],
    threshold: u8,
    language: &str,
) -> Value {
    let mut parts = Vec::with_capacity(candidates.len() + 2);
    parts.push(inline_part(reference));
    parts.extend(candidates.iter().map(|c| inline_part(&c.payload)));
    parts.push(json!({ "text": build_prompt(candidates, threshold, language) }));

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(language),
        }
    })
}

/// Extract matches from a raw `generateContent` response body
///
/// Anything unexpected (no candidates, no text, text that is not a JSON
/// array of matches) yields an empty list.
pub fn parse_generate_content(body: &str) -> Vec<MatchResult> {
    let response: GenerateContentResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable comparison response, treating as no matches");
            return Vec::new();
        }
    };

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    parse_match_text(&text)
}

/// Parse the model's JSON text into matches
pub fn parse_match_text(text: &str) -> Vec<MatchResult> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<MatchResult>>(trimmed) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Comparison text is not a match array, treating as no matches");
            Vec::new()
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    text.strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> Arc<ImageRecord> {
        Arc::new(ImageRecord::new(
            name,
            EncodedImage {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string(),
            },
            0,
        ))
    }

    fn settings(api_key: Option<&str>) -> ComparisonSettings {
        ComparisonSettings {
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
            base_url: "http://127.0.0.1:9/v1beta/".to_string(),
            request_timeout_secs: 1,
            max_requests_per_minute: 0,
            similarity_threshold: 40,
            response_language: "English".to_string(),
        }
    }

    #[test]
    fn test_prompt_lists_ids_in_order() {
        let candidates = vec![record("a.png"), record("b.png")];
        let prompt = build_prompt(&candidates, 40, "English");

        let expected = format!(
            "Image 1: {}, Image 2: {}",
            candidates[0].id, candidates[1].id
        );
        assert!(prompt.contains(&expected));
        assert!(prompt.contains("above 40"));
        assert!(prompt.contains("written in English"));
    }

    #[test]
    fn test_request_body_part_order() {
        let reference = EncodedImage {
            mime_type: "image/jpeg".to_string(),
            data: "REF".to_string(),
        };
        let candidates = vec![record("a.png"), record("b.png"), record("c.png")];
        let body = build_request_body(&reference, &candidates, 40, "English");

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0]["inline_data"]["data"], "REF");
        assert_eq!(parts[0]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert!(parts[4]["text"].is_string());
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["items"]["required"],
            json!(["id", "similarityScore", "reason"])
        );
    }

    #[test]
    fn test_parse_generate_content() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "[{\"id\":\"x\",\"similarityScore\":90,\"reason\":\"same cat\"}]" }]
                }
            }]
        })
        .to_string();

        let matches = parse_generate_content(&body);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "x");
        assert_eq!(matches[0].similarity_score, 90.0);
    }

    #[test]
    fn test_parse_split_text_parts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "[{\"id\":\"x\",\"similarityScore\":" },
                        { "text": "55,\"reason\":\"r\"}]" }
                    ]
                }
            }]
        })
        .to_string();

        assert_eq!(parse_generate_content(&body).len(), 1);
    }

    #[test]
    fn test_malformed_or_empty_responses_yield_no_matches() {
        assert!(parse_generate_content("not json").is_empty());
        assert!(parse_generate_content("{}").is_empty());
        assert!(parse_generate_content(r#"{"candidates":[]}"#).is_empty());
        assert!(parse_generate_content(r#"{"candidates":[{"content":{"parts":[]}}]}"#).is_empty());
        assert!(parse_match_text("{\"id\": 1}").is_empty());
        assert!(parse_match_text("   ").is_empty());
    }

    #[test]
    fn test_parse_fenced_text() {
        let text = "```json\n[{\"id\":\"x\",\"similarityScore\":70,\"reason\":\"r\"}]\n```";
        assert_eq!(parse_match_text(text).len(), 1);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiComparator::new(settings(Some("k"))).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://127.0.0.1:9/v1beta/models/test-model:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_call() {
        let client = GeminiComparator::new(settings(None)).unwrap();
        let reference = EncodedImage {
            mime_type: "image/png".to_string(),
            data: String::new(),
        };

        let result = client.compare(&reference, &[record("a.png")]).await;
        assert!(matches!(result, Err(ComparisonError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let client = GeminiComparator::new(settings(Some("k"))).unwrap();
        let reference = EncodedImage {
            mime_type: "image/png".to_string(),
            data: String::new(),
        };

        let result = client.compare(&reference, &[record("a.png")]).await;
        assert!(matches!(result, Err(ComparisonError::Network(_))));
    }
}
