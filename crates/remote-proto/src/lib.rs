//! Wire vocabulary, framing and configuration shared by the wrist remote
//! client and anything that speaks to it.

pub mod config;
pub mod platform;
pub mod protocol;
