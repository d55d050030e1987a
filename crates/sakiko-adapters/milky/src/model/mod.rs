//! Milky data model: event envelopes, incoming messages and their segments.

pub mod event;
pub mod message;
pub mod segment;
