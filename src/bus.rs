//! Bus Adapter — the internal publish/subscribe bus as a pluggable trait
//!
//! Generalizes `a3s_event::EventProvider`'s publish/subscribe shape to the
//! simpler fire-and-forget contract spec §6 describes: no acks, no
//! history, no durable consumers. A production deployment plugs in a real
//! client implementing this trait; that client is out of scope here
//! (spec §1) — [`InMemoryBus`] below exists only so this crate is
//! testable and runnable standalone.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// An inbound message delivered by the bus to a subscribed topic's handler.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub content: String,
    pub iso_time: String,
}

/// Callback registered via [`BusAdapter::subscribe`]. Must return quickly —
/// the bus-reader thread is blocked on it (spec §4.4 rationale).
pub type BusHandler = Arc<dyn Fn(BusMessage) + Send + Sync>;

/// Core trait for the internal message bus.
///
/// Implementations handle the transport-specific details of publish,
/// subscribe, and unsubscribe. Treated as thread-safe (spec §5).
#[async_trait]
pub trait BusAdapter: Send + Sync {
    /// Fire-and-forget publish; errors are logged but not surfaced
    /// (spec §6).
    async fn publish(&self, topic: &str, content: String) -> Result<()>;

    /// Idempotent per topic (spec §6): subscribing twice registers the
    /// handler once.
    async fn subscribe(&self, topic: &str, handler: BusHandler) -> Result<()>;

    /// Idempotent (spec §6).
    async fn unsubscribe(&self, topic: &str) -> Result<()>;
}

/// In-process bus for tests, demos, and single-binary deployments.
///
/// Delivers synchronously on the calling task — fine for a reference
/// implementation since the real transport is always external (spec §1).
#[derive(Default)]
pub struct InMemoryBus {
    handlers: Mutex<HashMap<String, BusHandler>>,
}

#[async_trait]
impl BusAdapter for InMemoryBus {
    async fn publish(&self, topic: &str, content: String) -> Result<()> {
        let handler = self.handlers.lock().unwrap().get(topic).cloned();
        let Some(handler) = handler else {
            tracing::debug!(topic, "Published to topic with no subscriber");
            return Ok(());
        };

        let msg = BusMessage {
            topic: topic.to_string(),
            content,
            iso_time: now_iso8601(),
        };
        handler(msg);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: BusHandler) -> Result<()> {
        self.handlers
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_insert(handler);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.handlers.lock().unwrap().remove(topic);
        Ok(())
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/demo helper: publish with an explicit timestamp instead of
    /// "now", matching scenario 5 in spec §8 which asserts on a fixed
    /// `isoTime`.
    pub async fn publish_at(&self, topic: &str, content: String, iso_time: String) {
        let handler = self.handlers.lock().unwrap().get(topic).cloned();
        if let Some(handler) = handler {
            handler(BusMessage {
                topic: topic.to_string(),
                content,
                iso_time,
            });
        }
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.handlers.lock().unwrap().contains_key(topic)
    }
}

fn now_iso8601() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    humantime_iso8601(secs)
}

/// Minimal UTC `YYYY-MM-DDTHH:MM:SS` formatter so the bridge doesn't need a
/// full calendar/timezone dependency just to stamp publish times.
fn humantime_iso8601(unix_secs: u64) -> String {
    const DAYS_PER_400Y: i64 = 146097;
    let days = (unix_secs / 86400) as i64;
    let rem = unix_secs % 86400;
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    // Civil-from-days algorithm (Howard Hinnant's public-domain date algorithms).
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - DAYS_PER_400Y + 1 } / DAYS_PER_400Y;
    let doe = (z - era * DAYS_PER_400Y) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m_num = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m_num <= 2 { y + 1 } else { y };

    format!("{y:04}-{m_num:02}-{d:02}T{h:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn publish_with_no_subscriber_is_a_noop() {
        let bus = InMemoryBus::new();
        bus.publish("t", "hello".into()).await.unwrap();
    }

    #[tokio::test]
    async fn subscribe_then_publish_delivers() {
        let bus = InMemoryBus::new();
        let received = Arc::new(Mutex::new(None));
        let received2 = received.clone();

        bus.subscribe(
            "t",
            Arc::new(move |msg: BusMessage| {
                *received2.lock().unwrap() = Some(msg);
            }),
        )
        .await
        .unwrap();

        bus.publish("t", "payload".into()).await.unwrap();

        let msg = received.lock().unwrap().clone().unwrap();
        assert_eq!(msg.topic, "t");
        assert_eq!(msg.content, "payload");
    }

    #[tokio::test]
    async fn subscribe_is_idempotent_per_topic() {
        let bus = InMemoryBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            bus.subscribe(
                "t",
                Arc::new(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();
        }

        bus.publish("t", "x".into()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = InMemoryBus::new();
        bus.subscribe("t", Arc::new(|_| {})).await.unwrap();
        assert!(bus.is_subscribed("t"));

        bus.unsubscribe("t").await.unwrap();
        assert!(!bus.is_subscribed("t"));
    }

    #[test]
    fn iso8601_formats_known_epoch() {
        // 2016-03-07T16:07:32Z
        assert_eq!(humantime_iso8601(1457366852), "2016-03-07T16:07:32");
    }
}
