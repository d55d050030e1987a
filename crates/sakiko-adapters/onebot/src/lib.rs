//! # Sakiko Adapter for OneBot v11
//!
//! Connects the Sakiko bot framework to OneBot v11 implementations over
//! WebSocket, in either direction:
//!
//! - **Reverse** (default): the adapter listens and the implementation
//!   dials in, optionally presenting an access token.
//! - **Forward**: the adapter dials every configured url and reconnects
//!   when a connection drops.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sakiko::prelude::*;
//! use sakiko_adapter_onebot::OneBotAdapter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sakiko = Sakiko::builder().build()?;
//!     sakiko.register_adapter::<OneBotAdapter>().await?;
//!     sakiko.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Event Hierarchy
//!
//! Every event derefs to its parent, and matching a parent type also
//! matches its children:
//!
//! ```text
//! OneBotEvent
//! ├── MessageEvent { PrivateMessageEvent, GroupMessageEvent }
//! ├── NoticeEvent { GroupUpload, GroupAdmin, GroupDecrease, GroupIncrease,
//! │                 GroupBan, FriendAdd, GroupRecall, FriendRecall, Poke }
//! ├── RequestEvent { FriendRequestEvent, GroupRequestEvent }
//! └── MetaEvent { LifecycleEvent, HeartbeatEvent }
//! ```
//!
//! ## Bot API
//!
//! ```rust,ignore
//! on::<GroupMessageEvent>()
//!     .handle(|ctx: Context| async move {
//!         if let Some(bot) = downcast_bot::<OneBotBot>(ctx.bot().clone()) {
//!             bot.reply(&**ctx.event(), "received").await?;
//!         }
//!         Ok::<_, ApiError>(())
//!     })
//!     .commit(&bus)?;
//! ```

mod adapter;
pub mod api_caller;
pub mod bot;
pub mod config;
pub(crate) mod connection;
pub mod model;

pub use adapter::OneBotAdapter;
pub use api_caller::{ApiCaller, validate_response};
pub use bot::{ADAPTER_NAME, OneBotBot};
pub use config::{ConnectionMode, OneBotConfig};

pub use model::api::{GroupInfo, GroupMemberInfo, LoginInfo, MessageId, MessageRecord, UserInfo};
pub use model::message::OneBotMessage;
pub use model::segment::{Segment, escape_cq_text, escape_cq_value, parse_cq_string, unescape_cq};
pub use model::types::{Anonymous, Sender};

pub use model::event::{
    FriendAddNotice, FriendRecallNotice, FriendRequestEvent, GroupAdminNotice, GroupBanNotice,
    GroupDecreaseNotice, GroupIncreaseNotice, GroupMessageEvent, GroupRecallNotice,
    GroupRequestEvent, GroupUploadNotice, HeartbeatEvent, LifecycleEvent, MessageEvent, MetaEvent,
    NoticeEvent, OneBotEvent, PokeNotice, PrivateMessageEvent, RequestEvent, UploadedFile,
    parse_event,
};
