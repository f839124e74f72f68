//! Offline mutation queue and replay engine for the training-logbook client.
//!
//! Mutating API calls made while the device is offline are persisted as
//! [`model::QueuedMutation`] records in a local SQLite store and replayed
//! against the backend once connectivity returns. Delivery is at-least-once:
//! a record is removed only after the backend confirms success, so a crash
//! between request and removal results in a harmless duplicate attempt
//! (deduplicated server-side via the idempotency key each record carries).

pub mod backend;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod events;
pub mod model;
pub mod queue;
pub mod reports;
pub mod sync;
