//! Delivery Engine — bus-to-HTTPS fan-out
//!
//! Registered as the bus-subscription callback for every topic in the
//! [`crate::subscription::SubscriptionRegistry`]. Generalizes two teacher
//! patterns: `dlq.rs`'s "bounded in-memory queue that drops the oldest
//! entry past capacity" (here applied to inbound bus messages rather than
//! dead letters), and the refcounted-forwarder idea in the retrieval
//! pack's `up-streamer` crate's `egress_pool.rs` (here: one independent
//! POST per delivery URL instead of one forwarder per transport), so a
//! slow or failing subscriber never delays another subscriber or the bus
//! thread (spec §4.4 step 4, §5).

use crate::bus::{BusAdapter, BusHandler, BusMessage};
use crate::credentials::CredentialStore;
use crate::subscription::SubscriptionRegistry;
use crate::types::OutgoingDelivery;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::Notify;

/// Default outbound POST timeout (spec §5 "suggested 10s").
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of concurrent queue-draining workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default bound on the inbound message queue before oldest entries are
/// dropped (spec §5 "Backpressure").
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct BoundedQueue {
    items: Mutex<VecDeque<BusMessage>>,
    capacity: usize,
    notify: Notify,
}

impl BoundedQueue {
    fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
            notify: Notify::new(),
        }
    }

    fn push(&self, msg: BusMessage) {
        let mut items = self.items.lock().unwrap();
        if items.len() >= self.capacity {
            if let Some(dropped) = items.pop_front() {
                tracing::error!(
                    topic = %dropped.topic,
                    capacity = self.capacity,
                    "Delivery queue saturated, dropping oldest message"
                );
            }
        }
        items.push_back(msg);
        drop(items);
        self.notify.notify_one();
    }

    async fn pop(&self) -> BusMessage {
        loop {
            if let Some(msg) = self.items.lock().unwrap().pop_front() {
                return msg;
            }
            self.notify.notified().await;
        }
    }
}

/// Holds weak references to the registry and credential store (spec §9
/// "Cyclic references" redesign note: the Delivery Engine never re-enters
/// the request handler, and doesn't keep either store alive by itself).
pub struct DeliveryEngine {
    registry: Weak<SubscriptionRegistry>,
    credentials: Weak<CredentialStore>,
    bus: Arc<dyn BusAdapter>,
    queue: Arc<BoundedQueue>,
    client: reqwest::Client,
    worker_count: usize,
}

impl DeliveryEngine {
    pub fn new(
        registry: &Arc<SubscriptionRegistry>,
        credentials: &Arc<CredentialStore>,
        bus: Arc<dyn BusAdapter>,
    ) -> Self {
        Self::with_tuning(
            registry,
            credentials,
            bus,
            DEFAULT_QUEUE_CAPACITY,
            DEFAULT_WORKER_COUNT,
            DEFAULT_DELIVERY_TIMEOUT,
        )
    }

    pub fn with_tuning(
        registry: &Arc<SubscriptionRegistry>,
        credentials: &Arc<CredentialStore>,
        bus: Arc<dyn BusAdapter>,
        queue_capacity: usize,
        worker_count: usize,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder with a fixed timeout never fails");

        Self {
            registry: Arc::downgrade(registry),
            credentials: Arc::downgrade(credentials),
            bus,
            queue: Arc::new(BoundedQueue::new(queue_capacity)),
            client,
            worker_count,
        }
    }

    /// A [`BusHandler`] closure suitable for `BusAdapter::subscribe`. Must
    /// return quickly (spec §4.4 rationale) — it only enqueues.
    pub fn handler(self: &Arc<Self>) -> BusHandler {
        let queue = self.queue.clone();
        Arc::new(move |msg: BusMessage| {
            queue.push(msg);
        })
    }

    /// Spawn the worker pool. Each worker independently drains the queue
    /// and fans out deliveries; returns immediately.
    pub fn spawn_workers(self: &Arc<Self>) {
        for _ in 0..self.worker_count {
            let engine = self.clone();
            tokio::spawn(async move { engine.run_worker().await });
        }
    }

    async fn run_worker(self: Arc<Self>) {
        loop {
            let msg = self.queue.pop().await;
            self.process_message(msg).await;
        }
    }

    async fn process_message(&self, msg: BusMessage) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let Some(credentials) = self.credentials.upgrade() else {
            return;
        };

        let urls = registry.urls_for(&msg.topic).await;
        if urls.is_empty() {
            tracing::error!(topic = %msg.topic, "Bus delivered message for topic with no subscribers");
            let _ = self.bus.unsubscribe(&msg.topic).await;
            return;
        }

        let Some(cred) = credentials.lookup(&msg.topic) else {
            tracing::error!(topic = %msg.topic, "Bus delivered message for topic with no credentials");
            let _ = self.bus.unsubscribe(&msg.topic).await;
            return;
        };

        let body = OutgoingDelivery {
            time: msg.iso_time.clone(),
            lti_key: cred.lti_key.clone(),
            lti_secret: cred.lti_secret.clone(),
            bus_topic: msg.topic.clone(),
            payload: msg.content.clone(),
        };

        for url in urls {
            let client = self.client.clone();
            let body = body.clone();
            let topic = msg.topic.clone();
            tokio::spawn(async move {
                deliver_one(&client, &url, &topic, &body).await;
            });
        }
    }
}

async fn deliver_one(
    client: &reqwest::Client,
    url: &str,
    topic: &str,
    body: &OutgoingDelivery,
) {
    match client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
    {
        Ok(resp) => {
            let status = resp.status();
            if status.as_u16() != 200 {
                tracing::error!(url, topic, status = status.as_u16(), "Delivery rejected");
            }
        }
        Err(err) => {
            tracing::error!(url, topic, error = %err, "Delivery failed");
        }
    }
}
