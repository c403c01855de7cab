use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{
    build_http_client, relay_sse_fragments, CompletionProvider, CompletionRequest, FragmentStream,
    ProviderError, StreamPayload,
};

/// Returned in place of an answer when the provider's safety filters block
/// the prompt, so the caller still gets a user-facing reply.
const BLOCKED_PROMPT_MESSAGE: &str =
    "The request could not be completed. Please rephrase and try again.";

/// Adapter for the Google Generative Language API.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        json!({
            "system_instruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user_message }] }],
            "generationConfig": {
                "maxOutputTokens": request.max_output_tokens,
                "temperature": request.temperature,
            },
        })
    }

    async fn send(&self, url: &str, request: &CompletionRequest) -> Result<reqwest::Response, ProviderError> {
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| ProviderError::network(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &text));
        }
        Ok(resp)
    }
}

fn extract_text(data: &Value) -> Option<String> {
    data["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
}

fn parse_response(data: &Value) -> String {
    if let Some(answer) = extract_text(data) {
        return answer.trim().to_string();
    }
    if let Some(reason) = data["promptFeedback"]["blockReason"].as_str() {
        debug!(reason, "prompt blocked");
        return BLOCKED_PROMPT_MESSAGE.to_string();
    }
    String::new()
}

fn parse_stream_payload(payload: &str) -> StreamPayload {
    let Ok(data) = serde_json::from_str::<Value>(payload) else {
        return StreamPayload::Skip;
    };
    match extract_text(&data) {
        Some(text) => StreamPayload::Text(text),
        None => StreamPayload::Skip,
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        info!(model = %self.model, "calling completion API");

        let resp = self.send(&url, request).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::network(&e))?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::decode(format!("invalid completion response: {e}")))?;
        Ok(parse_response(&data))
    }

    async fn open_stream(&self, request: &CompletionRequest) -> Result<FragmentStream, ProviderError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        info!(model = %self.model, "opening completion stream");

        let resp = self.send(&url, request).await?;
        Ok(relay_sse_fragments(resp.bytes_stream(), parse_stream_payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_candidate_text() {
        let data: Value = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Risk: Low"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&data).as_deref(), Some("Risk: Low"));
    }

    #[test]
    fn blocked_prompt_becomes_rephrase_reply() {
        let data: Value = serde_json::from_str(
            r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
        )
        .unwrap();
        assert_eq!(parse_response(&data), BLOCKED_PROMPT_MESSAGE);
    }

    #[test]
    fn response_without_candidates_or_block_is_empty() {
        assert_eq!(parse_response(&json!({"usageMetadata": {}})), "");
    }

    #[test]
    fn stream_payload_without_text_is_skipped() {
        assert!(matches!(
            parse_stream_payload(r#"{"candidates":[{"finishReason":"STOP"}]}"#),
            StreamPayload::Skip
        ));
        assert!(matches!(parse_stream_payload("not json"), StreamPayload::Skip));
    }

    #[test]
    fn request_body_shape() {
        let provider = GeminiProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "key",
            "gemini-pro",
            30,
        )
        .unwrap();
        assert_eq!(
            provider.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        let body = provider.body(&CompletionRequest::for_symptoms("cough", None));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 400);
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Symptoms: cough"));
    }
}
