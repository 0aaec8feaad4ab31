//! Wire types for the LTI/bus bridge
//!
//! Field names on the wire are dictated by spec, not by a blanket
//! camelCase transform, so renames are per-field rather than
//! `rename_all`.

use serde::{Deserialize, Serialize};

/// A shared secret authorized to publish to or subscribe from one bus topic.
///
/// Immutable after load; owned by the [`crate::credentials::CredentialStore`]
/// for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCredential {
    #[serde(rename = "ltiKey")]
    pub lti_key: String,
    #[serde(rename = "ltiSecret")]
    pub lti_secret: String,
}

/// The `action` an incoming request dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Publish,
    Subscribe,
    Unsubscribe,
}

impl Action {
    /// Parse case-insensitively, as required by spec §3.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "publish" => Some(Action::Publish),
            "subscribe" => Some(Action::Subscribe),
            "unsubscribe" => Some(Action::Unsubscribe),
            _ => None,
        }
    }
}

/// Parsed JSON body of the `POST /schoolbus` request.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingRequest {
    #[serde(rename = "ltiKey")]
    pub lti_key: Option<String>,
    #[serde(rename = "ltiSecret")]
    pub lti_secret: Option<String>,
    pub action: Option<String>,
    pub bus_topic: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// `payload` for `subscribe`/`unsubscribe` actions: `{ "delivery_url": "..." }`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPayload {
    pub delivery_url: Option<String>,
}

/// The body POSTed by the Delivery Engine to each registered delivery URL.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingDelivery {
    pub time: String,
    #[serde(rename = "ltiKey")]
    pub lti_key: String,
    #[serde(rename = "ltiSecret")]
    pub lti_secret: String,
    pub bus_topic: String,
    pub payload: String,
}
