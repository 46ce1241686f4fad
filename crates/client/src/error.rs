// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Errors surfaced by the client to callers.
///
/// The poller swallows `Transport` errors between attempts; everything else
/// is returned to the caller that issued the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No valid session was available when one was required. Recoverable by
    /// interactive re-login.
    AuthenticationRequired,
    /// The backend answered with a non-2xx status.
    Http { status: u16, body: String },
    /// Caller-supplied input failed validation (e.g. the free-form metrics
    /// field was not a JSON object).
    MalformedInput(String),
    /// Connection-level failure: DNS, refused connection, timeout, or an
    /// undecodable response body.
    Transport(String),
}

impl ClientError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "AUTH_REQUIRED",
            Self::Http { .. } => "HTTP_ERROR",
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::Transport(_) => "TRANSPORT",
        }
    }

    /// True when the backend rejected the request as unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationRequired => f.write_str("authentication required"),
            Self::Http { status, body } => {
                if body.is_empty() {
                    write!(f, "request failed ({status})")
                } else {
                    write!(f, "request failed ({status}): {body}")
                }
            }
            Self::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
