// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::Deserialize;

#[test]
fn status_classes() {
    let ok = HttpResponse { status: 204, body: String::new() };
    assert!(ok.is_success());
    assert!(!ok.is_unauthorized());

    let unauthorized = HttpResponse { status: 401, body: String::new() };
    assert!(!unauthorized.is_success());
    assert!(unauthorized.is_unauthorized());

    let server_error = HttpResponse { status: 500, body: String::new() };
    assert!(!server_error.is_success());
}

#[test]
fn json_body_parses_into_typed_records() {
    #[derive(Deserialize)]
    struct TokenReply {
        token: String,
        expires_at_seconds: i64,
    }

    let response = HttpResponse {
        status: 200,
        body: r#"{"token":"t1","issued_at_seconds":100,"expires_at_seconds":3700}"#.into(),
    };
    let reply: TokenReply = response.json().unwrap();
    assert_eq!(reply.token, "t1");
    assert_eq!(reply.expires_at_seconds, 3700);
}

#[test]
fn json_parse_failure_is_an_error() {
    #[derive(Deserialize)]
    struct Empty {}

    let response = HttpResponse { status: 200, body: "not json".into() };
    let result: Result<Empty, _> = response.json();
    assert!(matches!(result, Err(HttpError::Json(_))));
}

#[tokio::test]
async fn client_builds_with_custom_timeout() {
    assert!(HttpClient::with_timeout(Duration::from_secs(5)).is_ok());
    assert!(HttpClient::new().is_ok());
}
