//! Generative Language API backend (`generateContent` / `streamGenerateContent`).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::{
    parse_retry_hint, Completion, Fragment, FragmentKind, FragmentStream, GenerationCall,
    LlmError, ResponseFormat, TextGenerator, Usage,
};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    include_thoughts: bool,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    code: u16,
    message: String,
}

impl GeminiResponse {
    fn fragments(self) -> impl Iterator<Item = Fragment> {
        self.candidates
            .into_iter()
            .take(1)
            .filter_map(|c| c.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| {
                let text = part.text.filter(|t| !t.is_empty())?;
                Some(if part.thought {
                    Fragment::reasoning(text)
                } else {
                    Fragment::answer(text)
                })
            })
    }
}

impl From<&UsageMetadata> for Usage {
    fn from(meta: &UsageMetadata) -> Self {
        Usage {
            prompt_tokens: meta.prompt_token_count,
            output_tokens: meta.candidates_token_count,
            total_tokens: meta.total_token_count,
        }
    }
}

fn build_request(call: &GenerationCall) -> GeminiRequest<'_> {
    let mut config = GenerationConfig::default();
    if call.response_format == ResponseFormat::Json {
        config.response_mime_type = Some("application/json");
    }
    if call.reasoning_traces {
        config.thinking_config = Some(ThinkingConfig {
            include_thoughts: true,
        });
    }
    let generation_config =
        (config.response_mime_type.is_some() || config.thinking_config.is_some()).then_some(config);

    let tools = if call.search_tool {
        vec![Tool {
            google_search: GoogleSearch {},
        }]
    } else {
        Vec::new()
    };

    GeminiRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart { text: &call.prompt }],
        }],
        generation_config,
        tools,
    }
}

/// Turns a non-success response body into `LlmError::Api`, keeping any retry hint.
fn api_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    LlmError::Api {
        status,
        message,
        retry_after: parse_retry_hint(body),
    }
}

/// Collapses a full response into answer text; reasoning parts are dropped.
fn parse_completion(body: &str) -> Result<Completion, LlmError> {
    let response: GeminiResponse = serde_json::from_str(body)?;
    let usage = response.usage_metadata.as_ref().map(Usage::from);
    let text: String = response
        .fragments()
        .filter(|f| f.kind == FragmentKind::Answer)
        .map(|f| f.text)
        .collect();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }

    Ok(Completion { text, usage })
}

// ────────────────────────────────────────────────────────────────────────────
// Streaming decoder
// ────────────────────────────────────────────────────────────────────────────

/// Incremental decoder for `streamGenerateContent?alt=sse` bodies.
/// Buffers raw bytes so lines (and multi-byte characters) split across
/// network chunks are only decoded once complete.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
}

impl StreamDecoder {
    pub fn feed(&mut self, chunk: &Bytes) -> Vec<Result<Fragment, LlmError>> {
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            decode_line(String::from_utf8_lossy(&line).trim(), &mut out);
        }
        out
    }

    /// Flushes a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Vec<Result<Fragment, LlmError>> {
        let mut out = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        decode_line(String::from_utf8_lossy(&rest).trim(), &mut out);
        out
    }
}

fn decode_line(line: &str, out: &mut Vec<Result<Fragment, LlmError>>) {
    let Some(data) = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
    else {
        return;
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return;
    }

    if let Ok(envelope) = serde_json::from_str::<GeminiErrorEnvelope>(data) {
        out.push(Err(LlmError::Api {
            status: envelope.error.code,
            message: envelope.error.message,
            retry_after: parse_retry_hint(data),
        }));
        return;
    }

    match serde_json::from_str::<GeminiResponse>(data) {
        Ok(response) => out.extend(response.fragments().map(Ok)),
        Err(e) => {
            warn!("Skipping undecodable stream frame: {e}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Production `TextGenerator` speaking to the Generative Language REST API.
/// Constructed once at startup and shared through `LlmClient`.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key: api_key.trim().to_string(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    async fn post(&self, url: &str, call: &GenerationCall) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&build_request(call))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Generative Language API returned {}: {}", status, body);
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, call: &GenerationCall) -> Result<Completion, LlmError> {
        let url = format!("{}/{}:generateContent", self.base_url, call.model);
        let body = self.post(&url, call).await?.text().await?;
        let completion = parse_completion(&body)?;

        debug!(
            "generateContent succeeded: model={}, total_tokens={:?}",
            call.model,
            completion.usage.map(|u| u.total_tokens)
        );
        Ok(completion)
    }

    async fn generate_stream(&self, call: &GenerationCall) -> Result<FragmentStream, LlmError> {
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse",
            self.base_url, call.model
        );
        let response = self.post(&url, call).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut decoder = StreamDecoder::default();

            while let Some(item) = body.next().await {
                let decoded = match item {
                    Ok(chunk) => decoder.feed(&chunk),
                    Err(e) => vec![Err(LlmError::Stream(e.to_string()))],
                };
                for fragment in decoded {
                    let failed = fragment.is_err();
                    if tx.send(fragment).await.is_err() || failed {
                        return;
                    }
                }
            }
            for fragment in decoder.finish() {
                if tx.send(fragment).await.is_err() {
                    return;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_flags_to_wire_fields() {
        let call = GenerationCall::new("gemini-2.5-flash", "plan".to_string())
            .json()
            .with_reasoning();
        let value = serde_json::to_value(build_request(&call)).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "plan");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            value["generationConfig"]["thinkingConfig"]["includeThoughts"],
            true
        );
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_search_call_enables_google_search_tool() {
        let call = GenerationCall::new("gemini-2.5-flash", "tags".to_string()).with_search();
        let value = serde_json::to_value(build_request(&call)).unwrap();

        assert_eq!(value["tools"][0]["google_search"], serde_json::json!({}));
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn test_parse_completion_joins_answer_parts_and_reads_usage() {
        let body = r#"{
            "candidates": [{"content": {"parts": [
                {"text": "thinking...", "thought": true},
                {"text": "Hello "},
                {"text": "world"}
            ]}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;

        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.text, "Hello world");
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_completion_without_usage() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}"#;
        let completion = parse_completion(body).unwrap();
        assert!(completion.usage.is_none());
    }

    #[test]
    fn test_parse_completion_empty_is_error() {
        let body = r#"{"candidates": [{"content": {"parts": []}}]}"#;
        assert!(matches!(parse_completion(body), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_api_error_extracts_message_and_hint() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED",
            "details": [{"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "20s"}]}}"#;

        match api_error(429, body) {
            LlmError::Api {
                status,
                message,
                retry_after,
            } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
                assert_eq!(retry_after, Some(Duration::from_secs(20)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_overloaded_api_error_is_classified() {
        let body = r#"{"error": {"code": 503, "message": "The model is overloaded. Please try again later.", "status": "UNAVAILABLE"}}"#;
        assert!(api_error(503, body).is_overloaded());
    }

    #[test]
    fn test_decoder_handles_split_frames_and_thoughts() {
        let mut decoder = StreamDecoder::default();
        let first = Bytes::from_static(
            b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Weighing\",\"thought\":true}]}}]}\n\ndata: {\"candidates\":[{\"content\":{\"pa",
        );
        let second = Bytes::from_static(b"rts\":[{\"text\":\"[\\\"A\\\"]\"}]}}]}\n\n");

        let out: Vec<_> = decoder
            .feed(&first)
            .into_iter()
            .chain(decoder.feed(&second))
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(
            out,
            vec![Fragment::reasoning("Weighing"), Fragment::answer("[\"A\"]")]
        );
    }

    #[test]
    fn test_decoder_surfaces_error_frames() {
        let mut decoder = StreamDecoder::default();
        let chunk = Bytes::from_static(
            b"data: {\"error\":{\"code\":503,\"message\":\"The model is overloaded.\"}}",
        );
        assert!(decoder.feed(&chunk).is_empty());

        let out = decoder.finish();
        assert_eq!(out.len(), 1);
        assert!(out[0].as_ref().unwrap_err().is_overloaded());
    }

    #[test]
    fn test_decoder_keeps_multibyte_characters_split_across_chunks() {
        let frame = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"[\\\"Café 🚀\\\"]\"}]}}]}\n\n";
        let bytes = frame.as_bytes();
        // Two bytes into the four-byte rocket emoji.
        let split = frame.find('🚀').unwrap() + 2;

        let mut decoder = StreamDecoder::default();
        let mut out = decoder.feed(&Bytes::copy_from_slice(&bytes[..split]));
        assert!(out.is_empty());
        out.extend(decoder.feed(&Bytes::copy_from_slice(&bytes[split..])));

        let fragments: Vec<_> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(fragments, vec![Fragment::answer("[\"Café 🚀\"]")]);
    }
}
