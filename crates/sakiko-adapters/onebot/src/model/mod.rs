//! OneBot v11 data model: events, messages and API payloads.

pub mod api;
pub mod event;
pub mod message;
pub mod segment;
pub mod types;

pub use api::*;
pub use event::*;
pub use message::OneBotMessage;
pub use segment::Segment;
pub use types::{Anonymous, Sender};
