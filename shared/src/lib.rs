//! Shared types for Gather
//!
//! Message-bus types shared between gather-server and its clients, used for
//! in-process and (future) network transports.

pub mod message;

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, EventType, NotificationLevel, NotificationPayload, SyncPayload};
