//! Integration tests for error banner messages per failure kind.

mod common;

use qr_token_client::TransportFailure;
use qr_token_core::{
    MESSAGE_ACCESS_DENIED, MESSAGE_FAILED_TO_RETRIEVE, MESSAGE_NOT_FOUND, MESSAGE_RATE_LIMITED,
    MESSAGE_SERVER_ERROR, MESSAGE_UNKNOWN,
};

#[tokio::test]
async fn token_error_display_tests_shows_fixed_message_per_failure() {
    let cases = [
        (TransportFailure::Status(403), MESSAGE_ACCESS_DENIED),
        (TransportFailure::Status(404), MESSAGE_NOT_FOUND),
        (TransportFailure::Status(429), MESSAGE_RATE_LIMITED),
        (TransportFailure::Status(500), MESSAGE_SERVER_ERROR),
        (
            TransportFailure::NoResponse("operation timed out".to_string()),
            MESSAGE_FAILED_TO_RETRIEVE,
        ),
        (
            TransportFailure::Other("invalid token body".to_string()),
            MESSAGE_UNKNOWN,
        ),
    ];

    for (failure, expected) in cases {
        let transport = common::ScriptedTransport::with(vec![Err(failure.clone())]);
        let client = common::client(transport);
        let (mut session, _events) = common::session("user-1");

        common::submit_and_settle(&mut session, &client).await;
        assert_eq!(session.error(), Some(expected), "failure {failure:?}");
        assert!(session.display().is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn token_error_display_tests_unencodable_token_shows_unknown_error() {
    let oversized = "x".repeat(4_000);
    let transport = common::ScriptedTransport::with(vec![Ok(common::token(&oversized, 300))]);
    let client = common::client(transport);
    let (mut session, _events) = common::session("user-1");

    let outcome = common::submit_and_settle(&mut session, &client).await;
    assert_eq!(outcome, Some(qr_token_app::session::SettleOutcome::Failed));
    assert_eq!(session.error(), Some(MESSAGE_UNKNOWN));
    assert!(session.display().is_none());
}
