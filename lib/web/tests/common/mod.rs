//! Shared fixtures: a simulated identity provider and a small gated app.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
    routing::get,
};
use cognito_gate_core::{ProviderConfig, StoredToken};
use cognito_gate_web::{Cognito, CognitoGate, CurrentUser, GateSettings};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header as header_matcher, method, path},
};

pub const CLIENT_ID: &str = "testclient";
pub const CLIENT_SECRET: &str = "testsecret";
pub const ACCESS_TOKEN: &str = "test-access-token";
pub const EMAIL: &str = "alice@example.com";

/// Simulated Cognito hosted UI.
pub struct Provider {
    pub server: MockServer,
}

impl Provider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> ProviderConfig {
        ProviderConfig::builder(CLIENT_ID, CLIENT_SECRET, "test")
            .region("eu-central-1")
            .base_url(self.server.uri())
            .build()
            .expect("valid provider")
    }

    /// Accepts `code` at the token endpoint.
    pub async fn accept_code(&self, code: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains(format!("code={code}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "refresh_token": "test-refresh-token",
                "id_token": "test-id-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&self.server)
            .await;
    }

    /// Rejects every code at the token endpoint.
    pub async fn reject_codes(&self) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&self.server)
            .await;
    }

    /// Answers user info requests carrying the test token with `claims`.
    pub async fn user_info(&self, claims: Value) {
        Mock::given(method("GET"))
            .and(path("/oauth2/userInfo"))
            .and(header_matcher("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(claims))
            .mount(&self.server)
            .await;
    }

    /// Like [`Provider::user_info`], but each answer takes `delay`.
    pub async fn user_info_delayed(&self, claims: Value, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/oauth2/userInfo"))
            .and(header_matcher("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(claims).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Answers user info requests with a bare status.
    pub async fn user_info_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/oauth2/userInfo"))
            .respond_with(ResponseTemplate::new(status).set_body_string("provider says no"))
            .mount(&self.server)
            .await;
    }

    pub async fn user_info_calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/oauth2/userInfo")
            .count()
    }
}

pub fn settings() -> GateSettings {
    let mut settings = GateSettings {
        logout_path: Some("logout".to_string()),
        ..GateSettings::default()
    };
    settings.session.secure_cookies = false;
    settings
}

async fn index(CurrentUser(user): CurrentUser) -> String {
    format!("Welcome, {}", user.email().unwrap_or("stranger"))
}

async fn session_info(CurrentUser(user): CurrentUser, cognito: Cognito) -> Json<Value> {
    Json(json!({
        "attributes": user.attributes(),
        "authorized": cognito.authorized(),
        "expires_at": cognito.token().and_then(StoredToken::expires_at),
    }))
}

/// The host application: entry point, one protected API route and the
/// gate's own routes, all under the gate's mount prefix.
pub fn app(gate: &CognitoGate) -> Router {
    let prefix = gate.paths().prefix();
    let index_route = gate.paths().root();
    let api_route = format!("{prefix}/session-info");

    gate.protect_index(Router::new().route(&index_route, get(index)))
        .merge(gate.protect(Router::new().route(&api_route, get(session_info))))
        .merge(gate.routes())
}

pub async fn send(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri).header(header::HOST, "localhost");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("infallible")
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// Returns the `name=value` pair of the session cookie the response sets.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie(response).and_then(|c| c.split(';').next().map(str::to_string))
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .map(str::to_string)
}

pub fn query(location: &str) -> HashMap<String, String> {
    url::Url::parse(location)
        .expect("absolute location")
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Starts a login and returns the session cookie and the issued state.
pub async fn begin_login(app: &Router, login_uri: &str) -> (String, String) {
    let response = send(app, login_uri, None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let cookie = session_cookie(&response).expect("session cookie");
    let state = query(&location(&response))
        .remove("state")
        .expect("state parameter");
    (cookie, state)
}

/// Runs the login through the callback and returns the authenticated cookie.
pub async fn log_in(app: &Router, provider: &Provider, prefix: &str) -> String {
    provider.accept_code("good-code").await;
    let (cookie, state) = begin_login(app, &format!("{prefix}/login")).await;

    let response = send(
        app,
        &format!("{prefix}/login/authorized?code=good-code&state={state}"),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    session_cookie(&response).expect("authenticated session cookie")
}
