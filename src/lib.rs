#![deny(clippy::all)]
//! lexvox: a legal consultation assistant.
//!
//! Two subsystems carry the logic:
//! - [`live`] manages a realtime voice/text session with an AI counsel,
//!   coalescing streamed fragments into speaker turns.
//! - [`redaction`] lets a user black out regions of an evidence image at
//!   native resolution before attaching it to a case.
//!
//! Finished sessions are critiqued by [`analysis`] and kept in [`history`].

pub mod analysis;
pub mod audio;
pub mod config;
pub mod consultation;
pub mod credentials;
pub mod error;
pub mod history;
pub mod live;
pub mod locale;
pub mod preferences;
pub mod redaction;
pub mod scenario;
pub mod storage;
pub mod uploads;

pub use error::*;
