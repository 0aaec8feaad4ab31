//! `POST /schoolbus` request handler
//!
//! Implements the validation/dispatch order from spec §4.3 exactly,
//! short-circuiting on the first failing check and returning the status
//! shown in that table.

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;
use crate::subscription::TopicTransition;
use crate::types::{Action, IncomingRequest, SubscriptionPayload};

/// `200 OK`, empty body (spec §6).
fn ok() -> Response {
    StatusCode::OK.into_response()
}

/// `text/plain` body `Error: <message>` with the given status (spec §6).
fn err(status: StatusCode, message: impl Into<String>) -> Response {
    (status, format!("Error: {}", message.into())).into_response()
}

fn err_unauthorized(message: &str) -> Response {
    let mut resp = err(StatusCode::UNAUTHORIZED, message);
    resp.headers_mut().insert(
        "WWW-Authenticate",
        HeaderValue::from_static("key/secret"),
    );
    resp
}

/// Byte-exact comparison; not a true constant-time comparison (no `subtle`
/// in this stack) but avoids the short-circuiting `==` on mismatched
/// lengths by scanning the full shorter-padded range.
fn secure_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

pub async fn schoolbus(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Response {
    let req: IncomingRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(_) => return err(StatusCode::BAD_REQUEST, "request body is not a JSON object"),
    };

    let Some(action_raw) = req.action.as_deref() else {
        return err(StatusCode::METHOD_NOT_ALLOWED, "missing action field");
    };

    let Some(bus_topic) = req.bus_topic.as_deref().filter(|t| !t.is_empty()) else {
        return err(StatusCode::BAD_REQUEST, "missing or empty bus_topic");
    };

    // Open Question (spec §9): source inconsistently returns 400, test
    // suite asserts 401 — follow the test suite.
    let (Some(lti_key), Some(lti_secret)) = (req.lti_key.as_deref(), req.lti_secret.as_deref())
    else {
        return err_unauthorized("missing ltiKey or ltiSecret");
    };

    let Some(cred) = state.credentials.lookup(bus_topic) else {
        return err_unauthorized("unknown bus_topic");
    };

    if !secure_eq(lti_key, &cred.lti_key) {
        return err_unauthorized("ltiKey mismatch");
    }
    if !secure_eq(lti_secret, &cred.lti_secret) {
        return err_unauthorized("ltiSecret mismatch");
    }

    let Some(payload) = req.payload.as_ref() else {
        return err(StatusCode::BAD_REQUEST, "missing payload");
    };

    let Some(action) = Action::parse(action_raw) else {
        return err(StatusCode::NOT_IMPLEMENTED, "unsupported action");
    };

    match action {
        Action::Publish => handle_publish(&state, bus_topic, payload).await,
        Action::Subscribe => handle_subscribe(&state, bus_topic, payload).await,
        Action::Unsubscribe => handle_unsubscribe(&state, bus_topic, payload).await,
    }
}

async fn handle_publish(
    state: &AppState,
    bus_topic: &str,
    payload: &serde_json::Value,
) -> Response {
    let content = payload.to_string();

    if state.bus.publish(bus_topic, content).await.is_err() {
        tracing::error!(topic = bus_topic, "Bus publish failed");
    }
    ok()
}

fn extract_delivery_url(payload: &serde_json::Value) -> Option<String> {
    let parsed: SubscriptionPayload = serde_json::from_value(payload.clone()).ok()?;
    parsed.delivery_url
}

/// Scheme-and-shape checks in spec §4.3's second table.
fn validate_delivery_url(raw: &str) -> Result<(), Response> {
    let lower = raw.to_ascii_lowercase();
    if !lower.starts_with("https://") {
        return Err(err(StatusCode::FORBIDDEN, "delivery_url must use https"));
    }
    if raw.contains('?') || raw.contains('#') {
        return Err(err(
            StatusCode::CONFLICT,
            "delivery_url must not contain a query string or fragment",
        ));
    }
    Ok(())
}

async fn handle_subscribe(
    state: &AppState,
    bus_topic: &str,
    payload: &serde_json::Value,
) -> Response {
    let Some(delivery_url) = extract_delivery_url(payload) else {
        return err(StatusCode::BAD_REQUEST, "missing delivery_url");
    };
    if let Err(resp) = validate_delivery_url(&delivery_url) {
        return resp;
    }

    let (_, transition) = match state.registry.add(bus_topic, &delivery_url).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(topic = bus_topic, error = %e, "Failed to persist subscription");
            return err(StatusCode::INTERNAL_SERVER_ERROR, "failed to persist subscription");
        }
    };

    if transition == TopicTransition::NowSubscribed {
        let engine = state.delivery.clone();
        if state.bus.subscribe(bus_topic, engine.handler()).await.is_err() {
            tracing::error!(topic = bus_topic, "Bus subscribe failed");
        }
    }

    ok()
}

async fn handle_unsubscribe(
    state: &AppState,
    bus_topic: &str,
    payload: &serde_json::Value,
) -> Response {
    let Some(delivery_url) = extract_delivery_url(payload) else {
        return err(StatusCode::BAD_REQUEST, "missing delivery_url");
    };
    if let Err(resp) = validate_delivery_url(&delivery_url) {
        return resp;
    }

    let (_, transition) = match state.registry.remove(bus_topic, &delivery_url).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(topic = bus_topic, error = %e, "Failed to persist unsubscription");
            return err(StatusCode::INTERNAL_SERVER_ERROR, "failed to persist unsubscription");
        }
    };

    if transition == TopicTransition::NowUnsubscribed {
        if state.bus.unsubscribe(bus_topic).await.is_err() {
            tracing::error!(topic = bus_topic, "Bus unsubscribe failed");
        }
    }

    ok()
}

/// `/` demo help text (spec §4.5: "A `/` handler may serve static help text").
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "lti-bus-bridge",
        "endpoint": "POST /schoolbus",
    }))
}
