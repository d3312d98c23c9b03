//! Line-oriented data stream protocol
//!
//! Each frame is one line `<code>:<json>`:
//!
//! | code | meaning | json |
//! |------|---------|------|
//! | `f`  | message start | `{"messageId": "..."}` |
//! | `0`  | text delta | string |
//! | `e`  | step finish | object (ignored) |
//! | `d`  | message finish | `{"finishReason": "..."}` |
//! | `3`  | error | string |
//!
//! Unknown codes are skipped so newer servers stay readable. Malformed lines
//! are logged and dropped.

use crate::error::ChatError;
use serde::Deserialize;
use serde_json::json;

/// Decoded stream frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The server started a message
    Started {
        /// Server-side message id, if sent
        remote_id: Option<String>,
    },
    /// Text appended to the current message
    Delta(String),
    /// Explicit completion signal
    Finished {
        /// Reason reported by the server
        reason: Option<String>,
    },
    /// Server-reported error
    Error(String),
}

#[derive(Deserialize)]
struct StartFrame {
    #[serde(rename = "messageId")]
    message_id: Option<String>,
}

#[derive(Deserialize)]
struct FinishFrame {
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

/// Incremental decoder
///
/// Chunks may split anywhere, including inside a UTF-8 sequence; bytes are
/// buffered until a full line is available. A malformed line is dropped on
/// its own and never takes the other lines of its chunk with it.
#[derive(Debug, Default)]
pub struct DataStreamDecoder {
    buf: Vec<u8>,
    skipped: usize,
}

impl DataStreamDecoder {
    /// Create empty decoder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(event) = self.decode_or_skip(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line without newline
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buf);
        self.decode_or_skip(&rest).into_iter().collect()
    }

    /// Bytes waiting for a newline
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Malformed lines dropped so far
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_or_skip(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        match decode_line(raw) {
            Ok(event) => event,
            Err(e) => {
                self.skipped += 1;
                tracing::warn!("dropping malformed stream frame: {}", e);
                None
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> Result<Option<StreamEvent>, ChatError> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| ChatError::Protocol(format!("invalid utf-8 in frame: {e}")))?
        .trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (code, payload) = line
        .split_once(':')
        .ok_or_else(|| ChatError::Protocol(format!("frame without code: {line}")))?;

    let event = match code {
        "0" => StreamEvent::Delta(parse(payload)?),
        "f" => StreamEvent::Started {
            remote_id: parse::<StartFrame>(payload)?.message_id,
        },
        "d" => StreamEvent::Finished {
            reason: parse::<FinishFrame>(payload)?.finish_reason,
        },
        "3" => StreamEvent::Error(parse(payload)?),
        other => {
            tracing::trace!(code = other, "skipping stream frame");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn parse<T: for<'de> Deserialize<'de>>(payload: &str) -> Result<T, ChatError> {
    serde_json::from_str(payload)
        .map_err(|e| ChatError::Protocol(format!("bad frame payload {payload:?}: {e}")))
}

/// Encode an event as a protocol line, newline included
#[must_use]
pub fn encode_event(event: &StreamEvent) -> String {
    let (code, payload) = match event {
        StreamEvent::Started { remote_id } => ("f", json!({ "messageId": remote_id })),
        StreamEvent::Delta(text) => ("0", json!(text)),
        StreamEvent::Finished { reason } => ("d", json!({ "finishReason": reason })),
        StreamEvent::Error(message) => ("3", json!(message)),
    };
    format!("{code}:{payload}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_full_turn() {
        let body = concat!(
            "f:{\"messageId\":\"msg-1\"}\n",
            "0:\"Hello \"\n",
            "0:\"[%LATEX%]x[%LATEX%]\"\n",
            "e:{\"finishReason\":\"stop\",\"isContinued\":false}\n",
            "d:{\"finishReason\":\"stop\",\"usage\":{\"promptTokens\":3}}\n",
        );

        let mut decoder = DataStreamDecoder::new();
        let events = decoder.push(body.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Started {
                    remote_id: Some("msg-1".to_string())
                },
                StreamEvent::Delta("Hello ".to_string()),
                StreamEvent::Delta("[%LATEX%]x[%LATEX%]".to_string()),
                StreamEvent::Finished {
                    reason: Some("stop".to_string())
                },
            ]
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn tolerates_arbitrary_chunk_boundaries() {
        let body = "0:\"caf\u{e9} \\\\section\"\n0:\"\u{2192}\"\n";
        let bytes = body.as_bytes();

        for split in 1..bytes.len() {
            let mut decoder = DataStreamDecoder::new();
            let mut events = decoder.push(&bytes[..split]);
            events.extend(decoder.push(&bytes[split..]));
            assert_eq!(
                events,
                vec![
                    StreamEvent::Delta("caf\u{e9} \\section".to_string()),
                    StreamEvent::Delta("\u{2192}".to_string()),
                ],
                "split at {split}"
            );
        }
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = DataStreamDecoder::new();
        assert!(decoder.push(b"0:\"tail\"").is_empty());
        assert_eq!(
            decoder.finish(),
            vec![StreamEvent::Delta("tail".to_string())]
        );
    }

    #[test]
    fn unknown_codes_are_skipped() {
        let mut decoder = DataStreamDecoder::new();
        let events = decoder.push(b"8:[{\"k\":1}]\n\r\n0:\"a\"\r\n");
        assert_eq!(events, vec![StreamEvent::Delta("a".to_string())]);
    }

    #[test]
    fn malformed_line_keeps_earlier_text() {
        let mut decoder = DataStreamDecoder::new();
        let events = decoder.push(b"0:\"Hello\"\n0:notjson\n");
        assert_eq!(events, vec![StreamEvent::Delta("Hello".to_string())]);
        assert_eq!(decoder.skipped(), 1);
    }

    #[test]
    fn malformed_line_does_not_stop_later_frames() {
        let mut decoder = DataStreamDecoder::new();
        let events = decoder.push(b"0:\"a\"\nno-colon\n0:\"b\"\nd:{\"finishReason\":\"stop\"}\n");
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("a".to_string()),
                StreamEvent::Delta("b".to_string()),
                StreamEvent::Finished {
                    reason: Some("stop".to_string())
                },
            ]
        );
        assert_eq!(decoder.skipped(), 1);

        assert!(decoder.push(b"0:\xff\xfe").is_empty());
        assert!(decoder.finish().is_empty());
        assert_eq!(decoder.skipped(), 2);
    }

    #[test]
    fn encode_matches_decode() {
        let events = vec![
            StreamEvent::Started { remote_id: None },
            StreamEvent::Delta("line\nbreak".to_string()),
            StreamEvent::Error("boom".to_string()),
            StreamEvent::Finished { reason: None },
        ];
        let wire: String = events.iter().map(encode_event).collect();

        let mut decoder = DataStreamDecoder::new();
        assert_eq!(decoder.push(wire.as_bytes()), events);
    }
}
