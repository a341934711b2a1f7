#![warn(missing_docs)]
//! # qr-token-app
//!
//! ## Purpose
//! Orchestrates input, token requests, and the QR display for `qr-token`.
//!
//! ## Responsibilities
//! - Parse CLI/env configuration into [`config::AppConfig`].
//! - Hold the input form and interactive commands ([`input`]).
//! - Sequence token requests and own the mounted display ([`session`]).
//! - Prefill coordinates best-effort from a location provider ([`location`]).
//! - Keep secrets out of logs.
//!
//! ## Data flow
//! CLI/stdin -> [`input::InputForm`] -> [`session::TokenSession::submit`] ->
//! spawned [`qr_token_client::TokenClient::request_token`] ->
//! [`session::TokenSession::settle`] -> display countdown -> expiry -> submit.
//!
//! ## Error model
//! Token and validation failures end in the session as a displayed message.
//! Startup, configuration, and I/O failures are [`AppError`] and terminate
//! the binary.
//!
//! ## Security and privacy notes
//! - API keys are never logged; token values are logged only as fingerprints.
//! - Auto refresh can be disabled at runtime with `QR_TOKEN_AUTO_REFRESH`.

pub mod config;
pub mod input;
pub mod location;
pub mod session;

use std::time::{SystemTime, UNIX_EPOCH};

use qr_token_client::ClientError;
use qr_token_core::ValidationError;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("QR_TOKEN_VERSION");

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "qr_token=info,qr_token_app=info,qr_token_client=info,warn";

/// Env var that disables refresh-on-expiry.
pub const AUTO_REFRESH_ENV: &str = "QR_TOKEN_AUTO_REFRESH";

const REDACTED: &str = "<redacted>";
const SECRET_KEYS: [&str; 5] = ["x-api-key", "api_key", "authorization", "token", "uniqueid"];

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Returns wall-clock time in unix milliseconds.
pub fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Checks the auto-refresh kill switch.
///
/// Semantics:
/// - Unset => refresh on expiry.
/// - `0`, `false`, `off` (case-insensitive) => no refresh.
/// - Any other value => refresh on expiry.
pub fn auto_refresh_enabled_from_env() -> bool {
    match std::env::var(AUTO_REFRESH_ENV) {
        Ok(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !matches!(normalized.as_str(), "0" | "false" | "off")
        }
        Err(_) => true,
    }
}

/// Short stable fingerprint of a token for log correlation.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Redacts values following known secret keys (`key=value` or `key: value`).
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while cursor < input.len() {
        let next = SECRET_KEYS
            .iter()
            .filter_map(|key| {
                lower[cursor..]
                    .find(key)
                    .map(|offset| (cursor + offset, key.len()))
            })
            .min_by_key(|(position, _)| *position);

        let Some((position, key_len)) = next else {
            output.push_str(&input[cursor..]);
            break;
        };

        let mut value_start = position + key_len;
        let rest = &input[value_start..];
        let separator = rest
            .strip_prefix('=')
            .map(|_| 1)
            .or_else(|| rest.strip_prefix(": ").map(|_| 2))
            .or_else(|| rest.strip_prefix(':').map(|_| 1));

        output.push_str(&input[cursor..value_start]);
        let Some(separator_len) = separator else {
            cursor = value_start;
            continue;
        };
        output.push_str(&rest[..separator_len]);
        value_start += separator_len;

        let value_end = input[value_start..]
            .find(|c: char| c.is_whitespace() || c == '&' || c == ',' || c == '"')
            .map(|offset| value_start + offset)
            .unwrap_or(input.len());
        if value_end > value_start {
            output.push_str(REDACTED);
        }
        cursor = value_end;
    }

    output
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client configuration or validate-call failure.
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    /// Invalid startup input.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Terminal or file I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON encoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
