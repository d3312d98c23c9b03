//! Delimiter extraction
//!
//! Recognizes at most one payload per message: the text strictly between the
//! first two occurrences of the sentinel. Anything that does not form a
//! complete pair falls back to the raw content with no payload.

use serde::{Deserialize, Serialize};

/// Sentinel the assistant is instructed to wrap the full document in
pub const LATEX_DELIMITER: &str = "[%LATEX%]";

/// Result of splitting a message around its delimited payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Text before the first sentinel (the whole content when no payload)
    pub prefix: String,
    /// Text strictly between the first two sentinels
    pub payload: Option<String>,
    /// Text after the second sentinel, later sentinels kept verbatim
    pub suffix: String,
}

impl ExtractionResult {
    /// Result carrying the content unparsed
    #[inline]
    #[must_use]
    pub fn raw(content: impl Into<String>) -> Self {
        Self {
            prefix: content.into(),
            payload: None,
            suffix: String::new(),
        }
    }

    /// Whether a well-formed payload was found
    #[inline]
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Rebuild the original content using `sentinel`
    ///
    /// Exact inverse of [`extract_with`] for the same sentinel.
    #[must_use]
    pub fn reconstruct(&self, sentinel: &str) -> String {
        match &self.payload {
            Some(payload) => {
                let mut out = String::with_capacity(
                    self.prefix.len() + payload.len() + self.suffix.len() + 2 * sentinel.len(),
                );
                out.push_str(&self.prefix);
                out.push_str(sentinel);
                out.push_str(payload);
                out.push_str(sentinel);
                out.push_str(&self.suffix);
                out
            }
            None => format!("{}{}", self.prefix, self.suffix),
        }
    }

    /// Consume into `(prefix, payload, suffix)`
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (String, Option<String>, String) {
        (self.prefix, self.payload, self.suffix)
    }
}

/// Extract the payload delimited by [`LATEX_DELIMITER`]
#[inline]
#[must_use]
pub fn extract(content: &str) -> ExtractionResult {
    extract_with(content, LATEX_DELIMITER)
}

/// Extract the payload delimited by `sentinel`
///
/// Never fails: zero sentinels, or a single dangling one, yield the content
/// as `prefix` with no payload. An empty sentinel never matches.
#[must_use]
pub fn extract_with(content: &str, sentinel: &str) -> ExtractionResult {
    if sentinel.is_empty() {
        return ExtractionResult::raw(content);
    }

    let Some(first) = content.find(sentinel) else {
        return ExtractionResult::raw(content);
    };

    let payload_start = first + sentinel.len();
    let Some(offset) = content[payload_start..].find(sentinel) else {
        // Unterminated block, never guess a payload
        return ExtractionResult::raw(content);
    };
    let second = payload_start + offset;

    ExtractionResult {
        prefix: content[..first].to_string(),
        payload: Some(content[payload_start..second].to_string()),
        suffix: content[second + sentinel.len()..].to_string(),
    }
}

/// Number of non-overlapping sentinel occurrences in `content`
#[must_use]
pub fn sentinel_count(content: &str, sentinel: &str) -> usize {
    if sentinel.is_empty() {
        return 0;
    }
    content.matches(sentinel).count()
}
