use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use super::{
    build_http_client, relay_sse_fragments, CompletionProvider, CompletionRequest, FragmentStream,
    ProviderError, StreamPayload,
};

/// Adapter for OpenAI-compatible chat-completion endpoints.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
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

    fn body(&self, request: &CompletionRequest, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_message },
            ],
            "max_tokens": request.max_output_tokens,
            "temperature": request.temperature,
            "stream": stream,
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
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

fn parse_stream_payload(payload: &str) -> StreamPayload {
    if payload == "[DONE]" {
        return StreamPayload::Done;
    }
    let Ok(data) = serde_json::from_str::<Value>(payload) else {
        return StreamPayload::Skip;
    };
    match data["choices"][0]["delta"]["content"].as_str() {
        Some(text) => StreamPayload::Text(text.to_string()),
        None => StreamPayload::Skip,
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        info!(model = %self.model, "calling completion API");
        let resp = self.send(&self.body(request, false)).await?;
        let data: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::decode(format!("invalid completion response: {e}")))?;
        let answer = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        Ok(answer.trim().to_string())
    }

    async fn open_stream(&self, request: &CompletionRequest) -> Result<FragmentStream, ProviderError> {
        info!(model = %self.model, "opening completion stream");
        let resp = self.send(&self.body(request, true)).await?;
        Ok(relay_sse_fragments(resp.bytes_stream(), parse_stream_payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_payload_yields_text() {
        let payload = r#"{"choices":[{"delta":{"content":"Advice: rest"}}]}"#;
        match parse_stream_payload(payload) {
            StreamPayload::Text(t) => assert_eq!(t, "Advice: rest"),
            _ => panic!("expected text fragment"),
        }
    }

    #[test]
    fn done_sentinel_ends_stream() {
        assert!(matches!(parse_stream_payload("[DONE]"), StreamPayload::Done));
    }

    #[test]
    fn payload_without_delta_is_skipped() {
        assert!(matches!(
            parse_stream_payload(r#"{"choices":[{"finish_reason":"stop","delta":{}}]}"#),
            StreamPayload::Skip
        ));
    }
}
