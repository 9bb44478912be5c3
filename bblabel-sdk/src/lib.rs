//! Shared types for the BlackBytt Labels backend.
//!
//! * [`signature`] – webhook HMAC and session-token verification.
//! * [`sse`] – event-stream framing (encoder and incremental decoder).
//! * [`objects`] – request / response bodies and webhook topics.
//! * `client` – HTTP clients, behind the `client` feature.

#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
pub mod sse;
