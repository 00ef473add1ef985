//! Wrist remote: a now-playing display and two-button remote for a paired
//! media companion.
//!
//! - `view_model`: merges sparse companion updates, interpolates position
//! - `input`: two buttons multiplexed onto play/pause, next, previous, volume
//! - `core`: the single-owner event loop tying them to the face and the link

pub mod core;
pub mod error;
pub mod face;
pub mod input;
pub mod terminal;
pub mod timer;
pub mod transport;
pub mod view_model;
