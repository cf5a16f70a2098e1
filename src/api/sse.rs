//! Line decoder for the relay's server-sent-event stream.
//!
//! Chunks are buffered as raw bytes and split on `\n` before any UTF-8
//! decoding, so a multi-byte character torn across two network chunks is
//! decoded intact.

use tracing::{trace, warn};

use super::types::CompletionChunk;

const DATA_PREFIX: &[u8] = b"data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Token(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `[DONE]` has been seen; later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one network chunk and return the events of every completed line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(event) = self.decode_line(&line[..newline_pos]) {
                events.push(event);
                if self.done {
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.done || self.buffer.is_empty() {
            self.buffer.clear();
            return Vec::new();
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line).into_iter().collect()
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<SseEvent> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        // Comments (`: keep-alive`), blank separators and non-data fields
        let payload = line.strip_prefix(DATA_PREFIX)?;
        let payload = payload.strip_prefix(b" ").unwrap_or(payload);
        let payload = String::from_utf8_lossy(payload);
        let payload = payload.trim();

        if payload == DONE_MARKER {
            self.done = true;
            return Some(SseEvent::Done);
        }

        match serde_json::from_str::<CompletionChunk>(payload) {
            Ok(chunk) => chunk.into_token().map(SseEvent::Token),
            Err(e) => {
                warn!("Error parsing stream chunk: {}", e);
                trace!("Unparseable chunk: {}", payload);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(token: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": token}}]})
        )
    }

    fn tokens(events: &[SseEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                SseEvent::Token(t) => Some(t.as_str()),
                SseEvent::Done => None,
            })
            .collect()
    }

    #[test]
    fn test_tokens_across_chunk_boundaries() {
        let stream = format!("{}{}", data("```index"), data(".html\n<h1>"));
        let bytes = stream.as_bytes();
        let mut decoder = SseDecoder::new();

        let mut events = Vec::new();
        for piece in bytes.chunks(7) {
            events.extend(decoder.push(piece));
        }
        assert_eq!(tokens(&events), "```index.html\n<h1>");
    }

    #[test]
    fn test_multibyte_split_preserved() {
        let stream = data("héllo ✓");
        let bytes = stream.as_bytes();
        let split = stream.find('✓').unwrap() + 1;

        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(&bytes[..split]);
        events.extend(decoder.push(&bytes[split..]));
        assert_eq!(tokens(&events), "héllo ✓");
    }

    #[test]
    fn test_done_stops_decoding() {
        let stream = format!("{}data: [DONE]\n{}", data("a"), data("b"));
        let mut decoder = SseDecoder::new();
        let events = decoder.push(stream.as_bytes());

        assert_eq!(events, vec![SseEvent::Token("a".to_string()), SseEvent::Done]);
        assert!(decoder.is_done());
        assert!(decoder.push(data("c").as_bytes()).is_empty());
    }

    #[test]
    fn test_bad_lines_skipped() {
        let stream = format!(
            ": OPENROUTER PROCESSING\n\ndata: {{not json\r\n{}event: ping\n",
            data("ok")
        );
        let mut decoder = SseDecoder::new();
        let events = decoder.push(stream.as_bytes());
        assert_eq!(events, vec![SseEvent::Token("ok".to_string())]);
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut decoder = SseDecoder::new();
        let line = data("tail");
        assert!(decoder.push(line.trim_end().as_bytes()).is_empty());
        assert_eq!(decoder.finish(), vec![SseEvent::Token("tail".to_string())]);
        assert!(decoder.finish().is_empty());
    }
}
