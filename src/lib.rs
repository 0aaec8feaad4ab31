//! # lti-bus-bridge
//!
//! An authenticated HTTPS-to-bus bridge for LTI instructional events.
//!
//! External LTI consumers POST JSON events to `/schoolbus`; the bridge
//! authenticates each request against a per-topic credential store and
//! republishes the payload onto a named bus topic. Consumers may also
//! register delivery URLs to receive a durable, crash-safe subscription
//! to a topic: every matching bus message is forwarded to each
//! registered URL over HTTPS POST.
//!
//! ## Architecture
//!
//! - [`credentials::CredentialStore`] — read-only topic → shared-secret
//!   table, loaded once at startup.
//! - [`subscription::SubscriptionRegistry`] — durable topic → delivery-URL
//!   table, flushed on every mutation.
//! - [`bus::BusAdapter`] — the internal publish/subscribe bus as a
//!   pluggable trait; [`bus::InMemoryBus`] is the reference/test
//!   implementation.
//! - [`delivery::DeliveryEngine`] — fans bus messages out to every
//!   registered delivery URL in parallel, isolating slow or failing
//!   subscribers.
//! - [`server`] — the `/schoolbus` HTTP handler and TLS listener.

pub mod bus;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod delivery;
pub mod error;
pub mod server;
pub mod subscription;
pub mod types;

pub use error::{BridgeError, Result};
