use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, Stream, StreamExt};
use tracing::warn;

use super::{
    CompletionProvider, CompletionRequest, GeminiProvider, OpenAiProvider, ProviderError,
    ProviderErrorKind,
};
use crate::config::{AiConfig, ProviderKind};
use crate::profile::repo::Profile;

/// Wait before the single retry of a quota-classified failure.
const QUOTA_RETRY_DELAY: Duration = Duration::from_secs(16);

const CONFIG_ERROR: &str =
    "AI_API_KEY is not set. Please set AI_API_KEY (or GEMINI_API_KEY) in your .env file.";

const CAPACITY_MESSAGE: &str = "**We're temporarily at capacity.** The AI service has hit its \
usage limit. In the meantime: rest, stay hydrated, and see a doctor if symptoms persist or \
worsen. Please try again in a few minutes, or check your API quota: \
https://ai.google.dev/gemini-api/docs/rate-limits";

const CREDENTIAL_MESSAGE: &str = "The AI service API key is invalid or expired. Obtain a new \
key from your provider, set AI_API_KEY in your .env file, then restart the app.";

fn degraded_message(err: &ProviderError) -> String {
    match err.kind {
        ProviderErrorKind::Quota => CAPACITY_MESSAGE.to_string(),
        ProviderErrorKind::Auth => CREDENTIAL_MESSAGE.to_string(),
        _ => format!(
            "Sorry, we encountered an error while analyzing your symptoms: {err}. \
             Please try again later or consult a healthcare professional."
        ),
    }
}

/// Completion client the handlers talk to. Built once at startup; holds
/// either a configured provider adapter or nothing, in which case callers
/// short-circuit with 503 before paying request latency. Provider failures
/// never escape as errors — they come back as assistant-style text.
pub struct AiService {
    provider: Option<Arc<dyn CompletionProvider>>,
    quota_retry_delay: Duration,
}

impl AiService {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, quota_retry_delay: Duration) -> Self {
        Self {
            provider,
            quota_retry_delay,
        }
    }

    pub fn from_config(config: &AiConfig) -> anyhow::Result<Self> {
        if config.api_key.is_empty() {
            warn!("no completion API key configured; analysis endpoints will answer 503");
            return Ok(Self::new(None, QUOTA_RETRY_DELAY));
        }
        let provider: Arc<dyn CompletionProvider> = match config.provider {
            ProviderKind::Gemini => Arc::new(
                GeminiProvider::new(
                    &config.base_url,
                    &config.api_key,
                    &config.model,
                    config.timeout_secs,
                )
                .map_err(|e| anyhow::anyhow!("{e}"))?,
            ),
            ProviderKind::OpenAi => Arc::new(
                OpenAiProvider::new(
                    &config.base_url,
                    &config.api_key,
                    &config.model,
                    config.timeout_secs,
                )
                .map_err(|e| anyhow::anyhow!("{e}"))?,
            ),
        };
        Ok(Self::new(Some(provider), QUOTA_RETRY_DELAY))
    }

    /// Fast, side-effect-free pre-flight: `Some(reason)` when no credentials
    /// are present.
    pub fn config_error(&self) -> Option<String> {
        match self.provider {
            Some(_) => None,
            None => Some(CONFIG_ERROR.to_string()),
        }
    }

    /// Blocking analysis. Quota failures get exactly one delayed retry; auth
    /// and everything else surface immediately — always as user-facing text.
    pub async fn analyze(&self, symptoms: &str, profile: Option<&Profile>) -> String {
        let Some(provider) = &self.provider else {
            return format!("Configuration error: {CONFIG_ERROR}");
        };
        let request = CompletionRequest::for_symptoms(symptoms, profile);
        match self.complete_with_retry(provider.as_ref(), &request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "completion failed");
                degraded_message(&e)
            }
        }
    }

    async fn complete_with_retry(
        &self,
        provider: &dyn CompletionProvider,
        request: &CompletionRequest,
    ) -> Result<String, ProviderError> {
        match provider.complete(request).await {
            Err(e) if e.is_quota() => {
                warn!(error = %e, delay_secs = self.quota_retry_delay.as_secs(), "quota exhausted, retrying once");
                tokio::time::sleep(self.quota_retry_delay).await;
                provider.complete(request).await
            }
            other => other,
        }
    }

    /// Streaming analysis. Yields text fragments as they arrive; failures
    /// (including open failures after the single quota retry) are folded
    /// into one in-band fragment that ends the stream.
    pub async fn analyze_stream(
        &self,
        symptoms: &str,
        profile: Option<&Profile>,
    ) -> Pin<Box<dyn Stream<Item = String> + Send>> {
        let Some(provider) = self.provider.clone() else {
            let msg = format!("Configuration error: {CONFIG_ERROR}");
            return Box::pin(stream::once(async move { msg }));
        };

        let request = CompletionRequest::for_symptoms(symptoms, profile);
        let opened = match provider.open_stream(&request).await {
            Err(e) if e.is_quota() => {
                warn!(error = %e, delay_secs = self.quota_retry_delay.as_secs(), "quota exhausted, retrying stream once");
                tokio::time::sleep(self.quota_retry_delay).await;
                provider.open_stream(&request).await
            }
            other => other,
        };

        let inner = match opened {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "opening completion stream failed");
                let msg = degraded_message(&e);
                return Box::pin(stream::once(async move { msg }));
            }
        };

        Box::pin(stream::unfold((inner, false), |(mut inner, done)| async move {
            if done {
                return None;
            }
            match inner.next().await {
                Some(Ok(text)) => Some((text, (inner, false))),
                Some(Err(e)) => {
                    warn!(error = %e, "completion stream failed mid-flight");
                    Some((degraded_message(&e), (inner, true)))
                }
                None => None,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FragmentStream;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Scripted {
        Text(String),
        Fail(ProviderError),
        Stream(Vec<Result<String, ProviderError>>),
        FailOpen(ProviderError),
    }

    struct FakeProvider {
        script: Mutex<Vec<Scripted>>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            })
        }

        fn next(&self) -> Scripted {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().remove(0)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
            match self.next() {
                Scripted::Text(t) => Ok(t),
                Scripted::Fail(e) => Err(e),
                _ => panic!("scripted a stream for a blocking call"),
            }
        }

        async fn open_stream(
            &self,
            _request: &CompletionRequest,
        ) -> Result<FragmentStream, ProviderError> {
            match self.next() {
                Scripted::Stream(items) => Ok(Box::pin(stream::iter(items))),
                Scripted::FailOpen(e) => Err(e),
                _ => panic!("scripted a blocking result for a stream call"),
            }
        }
    }

    fn quota_error() -> ProviderError {
        ProviderError::from_status(429, "quota exceeded")
    }

    fn auth_error() -> ProviderError {
        ProviderError::from_status(401, "bad key")
    }

    fn service(provider: Arc<FakeProvider>) -> AiService {
        let provider: Arc<dyn CompletionProvider> = provider;
        AiService::new(Some(provider), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn success_passes_text_through() {
        let p = FakeProvider::new(vec![Scripted::Text("Risk: Low".into())]);
        let s = service(p.clone());
        assert_eq!(s.analyze("cough", None).await, "Risk: Low");
        assert_eq!(p.calls(), 1);
    }

    #[tokio::test]
    async fn quota_failure_retries_exactly_once_then_degrades() {
        let p = FakeProvider::new(vec![
            Scripted::Fail(quota_error()),
            Scripted::Fail(quota_error()),
        ]);
        let s = service(p.clone());
        let out = s.analyze("cough", None).await;
        assert_eq!(p.calls(), 2);
        assert!(out.contains("temporarily at capacity"));
    }

    #[tokio::test]
    async fn quota_retry_can_succeed() {
        let p = FakeProvider::new(vec![
            Scripted::Fail(quota_error()),
            Scripted::Text("Advice: rest".into()),
        ]);
        let s = service(p.clone());
        assert_eq!(s.analyze("cough", None).await, "Advice: rest");
        assert_eq!(p.calls(), 2);
    }

    #[tokio::test]
    async fn auth_failure_does_not_retry() {
        let p = FakeProvider::new(vec![Scripted::Fail(auth_error())]);
        let s = service(p.clone());
        let out = s.analyze("cough", None).await;
        assert_eq!(p.calls(), 1);
        assert!(out.contains("API key is invalid or expired"));
    }

    #[tokio::test]
    async fn other_failures_embed_the_error_description() {
        let p = FakeProvider::new(vec![Scripted::Fail(ProviderError::from_status(500, "boom"))]);
        let s = service(p.clone());
        let out = s.analyze("cough", None).await;
        assert_eq!(p.calls(), 1);
        assert!(out.starts_with("Sorry, we encountered an error"));
        assert!(out.contains("boom"));
    }

    #[tokio::test]
    async fn unconfigured_service_reports_config_error() {
        let s = AiService::new(None, Duration::from_millis(5));
        assert!(s.config_error().is_some());
        let out = s.analyze("cough", None).await;
        assert!(out.starts_with("Configuration error:"));
        let frags: Vec<String> = s.analyze_stream("cough", None).await.collect().await;
        assert_eq!(frags.len(), 1);
        assert!(frags[0].starts_with("Configuration error:"));
    }

    #[tokio::test]
    async fn stream_yields_fragments_in_order() {
        let p = FakeProvider::new(vec![Scripted::Stream(vec![
            Ok("Risk: Low".into()),
            Ok("\n".into()),
            Ok("Advice: rest".into()),
        ])]);
        let s = service(p.clone());
        let frags: Vec<String> = s.analyze_stream("cough", None).await.collect().await;
        assert_eq!(frags, vec!["Risk: Low", "\n", "Advice: rest"]);
    }

    #[tokio::test]
    async fn stream_open_quota_failure_retries_once() {
        let p = FakeProvider::new(vec![
            Scripted::FailOpen(quota_error()),
            Scripted::Stream(vec![Ok("ok".into())]),
        ]);
        let s = service(p.clone());
        let frags: Vec<String> = s.analyze_stream("cough", None).await.collect().await;
        assert_eq!(p.calls(), 2);
        assert_eq!(frags, vec!["ok"]);
    }

    #[tokio::test]
    async fn mid_stream_error_becomes_inband_fragment_and_ends_stream() {
        let p = FakeProvider::new(vec![Scripted::Stream(vec![
            Ok("partial".into()),
            Err(auth_error()),
            Ok("never seen".into()),
        ])]);
        let s = service(p.clone());
        let frags: Vec<String> = s.analyze_stream("cough", None).await.collect().await;
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0], "partial");
        assert!(frags[1].contains("API key is invalid or expired"));
    }
}
