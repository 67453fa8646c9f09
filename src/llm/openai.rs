// src/llm/openai.rs

//! Streaming client for OpenAI-compatible chat completions endpoints.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::unfold;
use futures::{Stream, StreamExt};
use reqwest::header;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{estimate_tokens, LanguageModel, TokenStream};
use crate::config::Config;
use crate::history::Turn;

pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    chat_url: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            chat_url: config.chat_completions_url(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    async fn stream_chat(
        &self,
        system_prompt: &str,
        history: &[Turn],
        question: &str,
    ) -> Result<TokenStream> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(json!({ "role": "system", "content": system_prompt }));
        for turn in history {
            messages.push(json!({ "role": turn.role.wire_name(), "content": turn.content }));
        }
        messages.push(json!({ "role": "user", "content": question }));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let resp = self
            .client
            .post(&self.chat_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(anyhow!("chat completions error ({}): {}", status, error_text));
        }

        Ok(Box::pin(delta_stream(resp.bytes_stream())))
    }

    fn count_tokens(&self, turns: &[Turn]) -> usize {
        let mut text = String::new();
        for turn in turns {
            text.push_str(turn.role.label());
            text.push_str(": ");
            text.push_str(&turn.content);
            text.push('\n');
        }
        estimate_tokens(&text)
    }
}

/// Turn a raw SSE byte stream into a stream of content deltas.
///
/// Bytes are buffered until a full line is available; lines split on `\n`,
/// which never lands inside a UTF-8 sequence, so chunk boundaries cannot
/// corrupt multi-byte text.
fn delta_stream(
    bytes_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    let initial_state = (Box::pin(bytes_stream), Vec::new());

    unfold(initial_state, |(mut stream, mut buffer)| async move {
        loop {
            while let Some(line) = take_line(&mut buffer) {
                match parse_sse_line(&line) {
                    SseLine::Token(token) => return Some((Ok(token), (stream, buffer))),
                    SseLine::Done => return None,
                    SseLine::Skip => {}
                }
            }

            match stream.next().await {
                Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                Some(Err(err)) => {
                    return Some((
                        Err(anyhow!("chat completions stream error: {}", err)),
                        (stream, buffer),
                    ));
                }
                None => {
                    if buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                        warn!(
                            "stream ended with unparsed data: {}",
                            String::from_utf8_lossy(&buffer)
                        );
                    }
                    return None;
                }
            }
        }
    })
}

enum SseLine {
    Token(String),
    Done,
    Skip,
}

/// Drain one `\n`-terminated line off the front of the buffer.
fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buffer.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line).into_owned())
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(frame) => match frame["choices"][0]["delta"]["content"].as_str() {
            Some(token) if !token.is_empty() => SseLine::Token(token.to_string()),
            _ => SseLine::Skip,
        },
        Err(err) => {
            debug!("unparseable SSE data frame: {} ({})", data, err);
            SseLine::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_frame(content: &str) -> String {
        format!(
            r#"data: {{"choices":[{{"delta":{{"content":{}}}}}]}}"#,
            serde_json::to_string(content).unwrap()
        )
    }

    #[test]
    fn content_deltas_are_extracted() {
        match parse_sse_line(&delta_frame("你好")) {
            SseLine::Token(token) => assert_eq!(token, "你好"),
            _ => panic!("expected a token"),
        }
    }

    #[test]
    fn done_sentinel_ends_the_stream() {
        assert!(matches!(parse_sse_line("data: [DONE]"), SseLine::Done));
    }

    #[test]
    fn non_content_lines_are_skipped() {
        assert!(matches!(parse_sse_line(": keep-alive"), SseLine::Skip));
        assert!(matches!(parse_sse_line(""), SseLine::Skip));
        assert!(matches!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        ));
        assert!(matches!(parse_sse_line("data: not json"), SseLine::Skip));
        assert!(matches!(parse_sse_line("event: ping"), SseLine::Skip));
    }

    #[test]
    fn take_line_waits_for_the_newline() {
        let mut buffer = b"data: partial".to_vec();
        assert_eq!(take_line(&mut buffer), None);

        buffer.extend_from_slice(b" frame\ndata: next");
        assert_eq!(take_line(&mut buffer), Some("data: partial frame\n".to_string()));
        assert_eq!(take_line(&mut buffer), None);
        assert_eq!(buffer, b"data: next");
    }

    #[test]
    fn take_line_keeps_split_multibyte_text_intact() {
        // "你" is three bytes; feed them across two chunks.
        let encoded = "data: 你\n".as_bytes();
        let mut buffer = encoded[..7].to_vec();
        assert_eq!(take_line(&mut buffer), None);

        buffer.extend_from_slice(&encoded[7..]);
        assert_eq!(take_line(&mut buffer), Some("data: 你\n".to_string()));
    }

    #[tokio::test]
    async fn delta_stream_yields_tokens_until_done() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from((delta_frame("今天") + "\n\n").into_bytes())),
            Ok(Bytes::from((delta_frame("天气好。") + "\n\n").into_bytes())),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ];
        let tokens: Vec<String> = delta_stream(futures::stream::iter(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(tokens, vec!["今天".to_string(), "天气好。".to_string()]);
    }
}
