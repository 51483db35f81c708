//! # mouthpiece-core
//!
//! Shared vocabulary for the lip-sync relay:
//!
//! - **Viseme mapping**: [`viseme::mouth_shape`] turns transcribed text into a [`MouthShape`]
//! - **Wire types**: [`messages::TranscriptionEvent`] (webhook input) and
//!   [`messages::BroadcastMessage`] (push channel output)
//! - **Errors**: [`errors::PayloadError`] for malformed webhook bodies

#![deny(unsafe_code)]

pub mod errors;
pub mod messages;
pub mod viseme;

pub use errors::PayloadError;
pub use messages::{BroadcastMessage, TranscriptionEvent};
pub use viseme::{mouth_shape, MouthShape};
