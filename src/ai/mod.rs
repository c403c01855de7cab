mod error;
mod gemini;
mod openai;
pub mod prompt;
mod service;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

pub use error::{ProviderError, ProviderErrorKind};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use prompt::CompletionRequest;
pub use service::AiService;

/// Ordered text fragments from one streaming completion. Finite and not
/// restartable; a new call re-issues the remote request. An `Err` item ends
/// the stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Single internal streaming interface over hosted completion backends.
/// Adapters are selected by configuration at startup.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
    async fn open_stream(&self, request: &CompletionRequest) -> Result<FragmentStream, ProviderError>;
}

/// Reassembles `data:` payloads out of raw SSE body chunks. Both providers
/// stream responses in this framing; only the JSON inside differs.
///
/// Holds raw bytes and decodes whole lines only: transport chunk boundaries
/// can fall inside a multi-byte UTF-8 character, and decoding per chunk
/// would mangle it into replacement characters.
pub(crate) struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed one transport chunk, get back every complete `data:` payload.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if let Some(payload) = line.strip_prefix("data:") {
                out.push(payload.trim_start().to_string());
            }
        }
        out
    }
}

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::decode(format!("failed to build HTTP client: {e}")))
}

/// What one parsed SSE payload means to the relay.
pub(crate) enum StreamPayload {
    Text(String),
    Done,
    Skip,
}

/// Turn a raw SSE response body into a `FragmentStream`, given a pure parser
/// for one `data:` payload. No buffering beyond line reassembly; a transport
/// error becomes the final item.
pub(crate) fn relay_sse_fragments<S>(body: S, parse: fn(&str) -> StreamPayload) -> FragmentStream
where
    S: Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
{
    use futures::StreamExt;
    use std::collections::VecDeque;

    let state = (
        Box::pin(body),
        SseLineBuffer::new(),
        VecDeque::<String>::new(),
        false,
    );
    Box::pin(futures::stream::unfold(
        state,
        move |(mut body, mut buf, mut pending, mut done)| async move {
            loop {
                if let Some(text) = pending.pop_front() {
                    return Some((Ok(text), (body, buf, pending, done)));
                }
                if done {
                    return None;
                }
                match body.next().await {
                    Some(Ok(chunk)) => {
                        for payload in buf.push(&chunk) {
                            match parse(&payload) {
                                StreamPayload::Text(t) if !t.is_empty() => pending.push_back(t),
                                StreamPayload::Done => done = true,
                                _ => {}
                            }
                        }
                    }
                    Some(Err(e)) => {
                        return Some((Err(ProviderError::network(&e)), (body, buf, pending, true)));
                    }
                    None => done = true,
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_buffer_splits_payloads_across_chunks() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: {\"a\":").is_empty());
        let got = buf.push(b"1}\n\ndata: {\"b\":2}\n");
        assert_eq!(got, vec![r#"{"a":1}"#.to_string(), r#"{"b":2}"#.to_string()]);
    }

    #[test]
    fn sse_buffer_reassembles_multibyte_chars_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        // "é" is 0xC3 0xA9; the chunk boundary falls between its two bytes.
        assert!(buf.push(b"data: caf\xC3").is_empty());
        let got = buf.push(b"\xA9\n");
        assert_eq!(got, vec!["café".to_string()]);
    }

    #[test]
    fn sse_buffer_ignores_non_data_lines() {
        let mut buf = SseLineBuffer::new();
        let got = buf.push(b"event: ping\nretry: 100\ndata: hello\n");
        assert_eq!(got, vec!["hello".to_string()]);
    }
}
