//! # Sakiko Support for the Milky Protocol
//!
//! Typed events for Milky, the QQNT bot protocol. Milky implementations push
//! events as `{time, self_id, event_type, data}` envelopes; [`parse_event`]
//! turns one into the matching event type, ready for
//! [`EventBus::publish`](sakiko_core::EventBus::publish).
//!
//! ```rust,ignore
//! use sakiko::prelude::*;
//! use sakiko_adapter_milky::{GroupMute, MessageReceive};
//!
//! on::<MessageReceive>()
//!     .handle(|ctx: Context| async move {
//!         let msg = ctx.view::<MessageReceive>().unwrap();
//!         println!("{} says {}", msg.data.sender_id, msg.data.summary());
//!     })
//!     .commit(&bus)?;
//! ```
//!
//! ## Event Hierarchy
//!
//! ```text
//! MilkyEvent { time, self_id, event_type }
//! ├── message   MessageReceive
//! ├── notice    MessageRecall, FriendNudge, FriendFileUpload, GroupAdminChange,
//! │             GroupEssenceMessageChange, GroupMemberIncrease, GroupMemberDecrease,
//! │             GroupNameChange, GroupMessageReaction, GroupMute, GroupWholeMute,
//! │             GroupNudge, GroupFileUpload
//! ├── request   FriendRequest, GroupJoinRequest, GroupInvitedJoinRequest, GroupInvitation
//! └── meta      BotOffline
//! ```

pub mod model;

/// Platform name carried by every Milky event.
pub const PLATFORM: &str = "milky";

pub use model::message::{FriendInfo, GroupInfo, GroupMemberInfo, IncomingMessage};
pub use model::segment::{IncomingSegment, RawSegment};

pub use model::event::{
    BotOffline, FriendFileUpload, FriendNudge, FriendRequest, GroupAdminChange,
    GroupEssenceMessageChange, GroupFileUpload, GroupInvitation, GroupInvitedJoinRequest,
    GroupJoinRequest, GroupMemberDecrease, GroupMemberIncrease, GroupMessageReaction, GroupMute,
    GroupNameChange, GroupNudge, GroupWholeMute, MessageRecall, MessageReceive, MilkyEvent,
    parse_event,
};
