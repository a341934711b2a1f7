//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use qr_token_app::input::InputForm;
use qr_token_app::session::{SettleOutcome, TokenSession, spawn_request};
use qr_token_client::{TokenClient, TokenTransport, TransportFailure};
use qr_token_core::TokenResponse;
use qr_token_countdown::CountdownEvent;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use url::Url;

/// Fixed wall clock used by session tests.
#[allow(dead_code)]
pub const NOW_MS: i64 = 1_700_000_000_000;

/// Transport replaying queued outcomes and counting calls.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<TokenResponse, TransportFailure>>>,
    calls: Mutex<usize>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Creates a transport that answers with `outcomes` in order.
    pub fn with(outcomes: Vec<Result<TokenResponse, TransportFailure>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(0),
        })
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock should work")
    }
}

#[async_trait]
impl TokenTransport for ScriptedTransport {
    async fn fetch_token(
        &self,
        _url: &Url,
        _api_key: Option<&str>,
    ) -> Result<TokenResponse, TransportFailure> {
        *self.calls.lock().expect("calls lock should work") += 1;
        self.outcomes
            .lock()
            .expect("outcomes lock should work")
            .pop_front()
            .unwrap_or(Err(TransportFailure::NoResponse("script exhausted".to_string())))
    }
}

/// Token expiring `window_secs` after [`NOW_MS`].
#[allow(dead_code)]
pub fn token(value: &str, window_secs: i64) -> TokenResponse {
    TokenResponse {
        token: value.to_string(),
        expires_at: NOW_MS / 1_000 + window_secs,
    }
}

/// Client bound to `transport`.
#[allow(dead_code)]
pub fn client(transport: Arc<ScriptedTransport>) -> TokenClient {
    TokenClient::new("https://api.example.test/prod", None, transport)
        .expect("client should build")
}

/// Session for `identifier` plus its countdown event receiver.
#[allow(dead_code)]
pub fn session(identifier: &str) -> (TokenSession, UnboundedReceiver<CountdownEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TokenSession::new(InputForm::new(identifier), tx), rx)
}

/// Submits the form and waits for the request to settle, as the event loop
/// does. Returns `None` when submission was rejected locally.
#[allow(dead_code)]
pub async fn submit_and_settle(
    session: &mut TokenSession,
    client: &TokenClient,
) -> Option<SettleOutcome> {
    let submission = session.submit()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_request(client.clone(), submission, tx)
        .await
        .expect("request task should finish");
    let settled = rx.recv().await.expect("request should report a result");
    Some(session.settle(settled, NOW_MS))
}
