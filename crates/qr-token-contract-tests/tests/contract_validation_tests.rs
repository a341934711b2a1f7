//! Validates contract fixtures and serialized core types against frozen
//! JSON schemas.

use jsonschema::JSONSchema;
use qr_token_contract_tests::load_contract;
use qr_token_core::{TokenError, TokenResponse};
use serde_json::{Value, json};

fn load_json(relative: &str) -> Value {
    load_contract(relative).expect("contract file should load")
}

fn compile_validator(schema: &str) -> JSONSchema {
    let schema = load_json(schema);
    JSONSchema::compile(&schema).expect("schema should compile")
}

#[test]
fn contract_validation_tests_fixtures_match_schemas() {
    let pairs = [
        (
            "get-token-response.schema.json",
            "fixtures/get-token-response.valid.json",
        ),
        ("token-error.schema.json", "fixtures/token-error.valid.json"),
        (
            "validate-token-request.schema.json",
            "fixtures/validate-token-request.valid.json",
        ),
    ];

    for (schema, fixture) in pairs {
        let validator = compile_validator(schema);
        assert!(
            validator.is_valid(&load_json(fixture)),
            "{fixture} should validate against {schema}"
        );
    }
}

#[test]
fn contract_validation_tests_token_response_round_trips_fixture() {
    let validator = compile_validator("get-token-response.schema.json");
    let fixture = load_json("fixtures/get-token-response.valid.json");

    let response: TokenResponse =
        serde_json::from_value(fixture).expect("fixture should decode");
    assert_eq!(response.token, "abc123");
    assert_eq!(response.expires_at, 1_700_000_300);

    let encoded = serde_json::to_value(&response).expect("response should encode");
    assert!(validator.is_valid(&encoded));
}

#[test]
fn contract_validation_tests_every_mapped_error_matches_schema() {
    let validator = compile_validator("token-error.schema.json");
    let errors = [
        TokenError::from_status(403),
        TokenError::from_status(404),
        TokenError::from_status(429),
        TokenError::from_status(503),
        TokenError::from_status(418),
        TokenError::no_response(),
        TokenError::unknown(),
    ];

    for error in errors {
        let encoded = serde_json::to_value(&error).expect("error should encode");
        assert!(validator.is_valid(&encoded), "{encoded} should validate");
    }
}

#[test]
fn contract_validation_tests_rejects_malformed_payloads() {
    let response = compile_validator("get-token-response.schema.json");
    assert!(!response.is_valid(&json!({"token": "abc123"})));
    assert!(!response.is_valid(&json!({"token": "abc123", "expiration": "soon"})));

    let request = compile_validator("validate-token-request.schema.json");
    assert!(!request.is_valid(&json!({"token": ""})));
    assert!(!request.is_valid(&json!({"token": "abc", "extra": true})));
}
