//! Database Models

// Serde helpers
pub mod serde_helpers;

// Participants
pub mod participant;

// Seating
pub mod settings;
pub mod table;

// Re-exports
pub use participant::{GeoPoint, Participant, ParticipantCreate, ParticipantUpdate};
pub use settings::{SeatingSettings, SettingsUpdate};
pub use table::{MemberSnapshot, SeatingTable, TABLE_COLLECTION};
