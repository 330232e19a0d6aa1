//! Server-Sent Events decoding for streaming completions
//!
//! The byte stream is split into lines; only `data:` lines carry payload.
//! `data: [DONE]` becomes [`StreamFragment::Done`], and anything unparsable
//! becomes [`FragmentError::Parse`] for the consumer to skip. Text comes from
//! `choices[0].delta.content` for chat completions and from
//! `candidates[0].content.parts[*].text` for Gemini, which simply ends the
//! stream instead of sending `[DONE]`.

use crate::provider::WireFormat;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use storyboard_workflow::{FragmentError, FragmentStream, StreamFragment};

type FragmentResult = std::result::Result<StreamFragment, FragmentError>;

/// Incremental line decoder
///
/// Bytes are buffered until a newline so multi-byte characters split across
/// network chunks decode correctly.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    format: WireFormat,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::for_format(WireFormat::ChatCompletions)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_format(format: WireFormat) -> Self {
        Self {
            buffer: Vec::new(),
            format,
        }
    }

    /// Feed a chunk of bytes, returning the fragments of every completed line
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FragmentResult> {
        self.buffer.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(fragment) = decode_line(&line, self.format) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<FragmentResult> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line, self.format).into_iter().collect()
    }
}

fn decode_line(line: &[u8], format: WireFormat) -> Option<FragmentResult> {
    let line = match std::str::from_utf8(line) {
        Ok(line) => line.trim(),
        Err(e) => return Some(Err(FragmentError::Parse(format!("Invalid UTF-8: {}", e)))),
    };

    // Blank separators, comments and non-data fields carry no payload
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(Ok(StreamFragment::Done));
    }
    match format {
        WireFormat::ChatCompletions => parse_chunk(data).transpose(),
        WireFormat::Gemini => parse_gemini_chunk(data).transpose(),
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}

/// Parse one `data:` payload
///
/// Role-only and empty deltas yield `Ok(None)`. An in-band API error ends
/// the stream as a transport failure.
pub fn parse_chunk(data: &str) -> std::result::Result<Option<StreamFragment>, FragmentError> {
    let payload: ChunkPayload = serde_json::from_str(data)
        .map_err(|e| FragmentError::Parse(format!("{}: {}", e, truncate(data, 80))))?;

    if let Some(error) = payload.error {
        return Err(FragmentError::Transport(error.message));
    }

    Ok(payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(StreamFragment::Text))
}

#[derive(Debug, Deserialize)]
struct GeminiChunk {
    #[serde(default)]
    candidates: Vec<GeminiChunkCandidate>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct GeminiChunkCandidate {
    content: Option<GeminiChunkContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiChunkContent {
    #[serde(default)]
    parts: Vec<GeminiChunkPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiChunkPart {
    #[serde(default)]
    text: String,
}

/// Parse one Gemini `streamGenerateContent` payload
pub fn parse_gemini_chunk(data: &str) -> std::result::Result<Option<StreamFragment>, FragmentError> {
    let payload: GeminiChunk = serde_json::from_str(data)
        .map_err(|e| FragmentError::Parse(format!("{}: {}", e, truncate(data, 80))))?;

    if let Some(error) = payload.error {
        return Err(FragmentError::Transport(error.message));
    }

    let text: String = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();
    Ok((!text.is_empty()).then_some(StreamFragment::Text(text)))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Turn a raw byte stream into a [`FragmentStream`]
///
/// A transport error is emitted once and ends the stream.
pub fn decode_stream<S, B, E>(bytes: S, format: WireFormat) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = (Box::pin(bytes), SseDecoder::for_format(format), VecDeque::new(), false);

    Box::pin(stream::unfold(
        state,
        |(mut bytes, mut decoder, mut pending, mut ended)| async move {
            loop {
                if let Some(item) = pending.pop_front() {
                    return Some((item, (bytes, decoder, pending, ended)));
                }
                if ended {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.push(chunk.as_ref())),
                    Some(Err(e)) => {
                        ended = true;
                        pending.push_back(Err(FragmentError::Transport(e.to_string())));
                    }
                    None => {
                        ended = true;
                        pending.extend(decoder.finish());
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FragmentResult {
        Ok(StreamFragment::Text(s.to_string()))
    }

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_decoder_text_and_done() {
        let mut decoder = SseDecoder::new();
        let input = format!("{}{}data: [DONE]\n\n", chunk("Hel"), chunk("lo"));
        let fragments = decoder.push(input.as_bytes());
        assert_eq!(fragments, vec![text("Hel"), text("lo"), Ok(StreamFragment::Done)]);
    }

    #[test]
    fn test_decoder_buffers_partial_lines() {
        let mut decoder = SseDecoder::new();
        let input = chunk("月光");
        let bytes = input.as_bytes();
        // Split inside the multi-byte characters
        let split = input.find('月').unwrap() + 1;

        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec![text("月光")]);
    }

    #[test]
    fn test_decoder_skips_comments_and_role_chunks() {
        let mut decoder = SseDecoder::new();
        let input = ": keep-alive\n\nevent: message\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n";
        assert!(decoder.push(input.as_bytes()).is_empty());
    }

    #[test]
    fn test_malformed_chunk_is_parse_error() {
        let mut decoder = SseDecoder::new();
        let fragments = decoder.push(b"data: {not json\n\n");
        assert!(matches!(fragments.as_slice(), [Err(FragmentError::Parse(_))]));
    }

    #[test]
    fn test_in_band_error_is_transport_error() {
        let result = parse_chunk(r#"{"error":{"message":"quota exceeded"}}"#);
        assert_eq!(result, Err(FragmentError::Transport("quota exceeded".to_string())));
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), vec![Ok(StreamFragment::Done)]);
    }

    #[tokio::test]
    async fn test_decode_stream_transport_error_ends_stream() {
        let parts: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(chunk("a").into_bytes()),
            Err("connection reset".to_string()),
            Ok(chunk("never").into_bytes()),
        ];
        let fragments: Vec<_> = decode_stream(stream::iter(parts), WireFormat::ChatCompletions)
            .collect()
            .await;
        assert_eq!(
            fragments,
            vec![
                text("a"),
                Err(FragmentError::Transport("connection reset".to_string()))
            ]
        );
    }

    #[test]
    fn test_gemini_chunks_join_parts() {
        let mut decoder = SseDecoder::for_format(WireFormat::Gemini);
        let input = concat!(
            r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"low "},{"text":"angle"}]}}]}"#,
            "\r\n\r\n",
            r#"data: {"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":9}}"#,
            "\r\n\r\n",
        );
        assert_eq!(decoder.push(input.as_bytes()), vec![text("low angle")]);
    }

    #[test]
    fn test_gemini_error_chunk() {
        let result = parse_gemini_chunk(r#"{"error":{"code":429,"message":"quota"}}"#);
        assert_eq!(result, Err(FragmentError::Transport("quota".to_string())));
    }
}
