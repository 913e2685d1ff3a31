// src/error.rs
use serde::Serialize;
use std::fmt;

/// Max characters of a non-success response body kept for diagnostics.
pub const SNIPPET_CHARS: usize = 50;

/// Why one strategy attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    /// Connection refused, DNS, TLS, reset, body read failure...
    #[error("network error: {message}")]
    Transport { message: String },

    /// Attempt exceeded its budget and was aborted.
    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// Response arrived with a non-2xx status.
    #[error("HTTP {status}: {snippet}")]
    HttpStatus { status: u16, snippet: String },

    /// Body was not valid JSON.
    #[error("invalid JSON: {message}")]
    Parse { message: String },
}

impl FetchError {
    pub fn transport(e: impl fmt::Display) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        Self::HttpStatus {
            status,
            snippet: snippet(body),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            // The connect timeout is a client setting, not the attempt budget.
            if e.is_timeout() {
                return Self::transport(format!("connect timed out: {e}"));
            }
            return Self::transport(e);
        }
        if e.is_timeout() {
            // reqwest does not report the budget; the client-level timer does.
            Self::Timeout { after_ms: 0 }
        } else {
            Self::transport(e)
        }
    }
}

/// First [`SNIPPET_CHARS`] characters of `body`, trimmed, on a char boundary.
pub fn snippet(body: &str) -> String {
    body.trim().chars().take(SNIPPET_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed { error: FetchError },
}

/// One strategy attempt within a logical call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub strategy: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn success(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            outcome: AttemptOutcome::Success,
        }
    }

    pub fn failed(strategy: &str, error: FetchError) -> Self {
        Self {
            strategy: strategy.to_string(),
            outcome: AttemptOutcome::Failed { error },
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            AttemptOutcome::Failed { error } => Some(error),
            AttemptOutcome::Success => None,
        }
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Success => write!(f, "{}: ok", self.strategy),
            AttemptOutcome::Failed { error } => write!(f, "{}: {}", self.strategy, error),
        }
    }
}

/// Every strategy failed for one logical call. `attempts` keeps the full
/// per-strategy trail for UI-level diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct CompositeFailure {
    pub message: String,
    pub attempts: Vec<AttemptRecord>,
}

impl CompositeFailure {
    pub fn new(source_label: &str, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            message: format!(
                "all {} strategies failed for {}",
                attempts.len(),
                source_label
            ),
            attempts,
        }
    }

    /// Multi-line rendering: message followed by one line per attempt.
    pub fn report(&self) -> String {
        let mut out = self.message.clone();
        for (i, a) in self.attempts.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, a));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_char_safe_and_capped() {
        let body = "错".repeat(80);
        let s = snippet(&body);
        assert_eq!(s.chars().count(), SNIPPET_CHARS);
        assert_eq!(snippet("  short  "), "short");
    }

    #[test]
    fn composite_report_lists_each_attempt() {
        let f = CompositeFailure::new(
            "量子资源",
            vec![
                AttemptRecord::failed("direct", FetchError::Timeout { after_ms: 6000 }),
                AttemptRecord::failed("relay", FetchError::http_status(502, "Proxy Error: reset")),
            ],
        );
        assert_eq!(f.to_string(), "all 2 strategies failed for 量子资源");
        let r = f.report();
        assert!(r.contains("1. direct: timed out after 6000 ms"));
        assert!(r.contains("2. relay: HTTP 502: Proxy Error: reset"));
    }

    #[test]
    fn attempt_serializes_for_ui() {
        let rec = AttemptRecord::failed("direct", FetchError::http_status(403, "denied"));
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["strategy"], "direct");
        assert_eq!(v["outcome"], "failed");
        assert_eq!(v["error"]["kind"], "http_status");
        assert_eq!(v["error"]["status"], 403);
    }
}
