//! Demo pages behind the gate.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use cognito_gate_web::{Cognito, CognitoGate, CurrentUser};
use serde_json::{Value, json};

/// Builds the demo application: the gated entry point, two protected pages
/// and the gate's own routes.
pub fn router(gate: &CognitoGate) -> Router {
    let prefix = gate.paths().prefix();

    let index = Router::new().route(&gate.paths().root(), get(home));
    let protected = Router::new()
        .route(&format!("{prefix}/session-info"), get(session_info))
        .route(&format!("{prefix}/user-info"), get(user_info));

    gate.protect_index(index)
        .merge(gate.protect(protected))
        .merge(gate.routes())
}

async fn home(CurrentUser(user): CurrentUser) -> String {
    format!("Welcome, {}", user.email().unwrap_or("unknown user"))
}

/// The attributes cached in the session by the gate.
async fn session_info(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "attributes": user.attributes() }))
}

/// Proxies the provider's user info endpoint with the session's token.
async fn user_info(cognito: Cognito) -> Response {
    match cognito.user_info().await {
        Ok(claims) => Json(Value::Object(claims)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "user info lookup failed");
            (StatusCode::BAD_GATEWAY, "User info unavailable").into_response()
        }
    }
}
