mod common;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::{Request, StatusCode, request::Parts};
use axum::response::IntoResponse;
use common::Harness;
use sonnda_auth::prelude::*;
use tokio_test::{assert_err, assert_ok};

fn parts(authorization: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/auth/me");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(()).unwrap().into_parts().0
}

async fn bearer(h: &Harness, email: &str) -> String {
    let outcome = h
        .credentials
        .login(&h.tokens, email, "password1")
        .await
        .unwrap();
    format!("Bearer {}", outcome.access_token)
}

#[tokio::test]
async fn actor_extractor_accepts_valid_bearer() {
    let h = Harness::new();
    let ana = h.register("ana@example.com", Role::Patient).await;
    let state = GateState::new(h.gate.clone());

    let mut parts = parts(Some(&bearer(&h, "ana@example.com").await));
    let Actor(actor) = assert_ok!(Actor::from_request_parts(&mut parts, &state).await);
    assert_eq!(actor.identity_id, ana.id);
    assert_eq!(actor.email, "ana@example.com");
}

#[tokio::test]
async fn actor_extractor_rejects_missing_or_bad_header() {
    let h = Harness::new();
    let state = GateState::new(h.gate.clone());

    for header in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer not.a.token")] {
        let mut parts = parts(header);
        let err = assert_err!(Actor::from_request_parts(&mut parts, &state).await);
        assert!(matches!(err, AuthError::Unauthenticated { .. }));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
    }
}

#[tokio::test]
async fn admin_extractor_requires_admin_role() {
    let h = Harness::new();
    h.register("ana@example.com", Role::Patient).await;
    h.register("admin@example.com", Role::Admin).await;
    let state = GateState::new(h.gate.clone());

    let mut patient = parts(Some(&bearer(&h, "ana@example.com").await));
    let err = assert_err!(AdminActor::from_request_parts(&mut patient, &state).await);
    assert!(matches!(err, AuthError::Forbidden { .. }));
    assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);

    let mut admin = parts(Some(&bearer(&h, "admin@example.com").await));
    let AdminActor(actor) = assert_ok!(AdminActor::from_request_parts(&mut admin, &state).await);
    assert!(actor.is_admin());
}
