//! OneBot v11 bot.
//!
//! [`OneBotBot`] implements [`Bot`] and adds typed methods for the common
//! OneBot v11 actions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sakiko_adapter_onebot::OneBotBot;
//! use sakiko_core::downcast_bot;
//!
//! on::<MessageEvent>()
//!     .handle(|ctx: Context| async move {
//!         if let Some(bot) = downcast_bot::<OneBotBot>(ctx.bot().clone()) {
//!             bot.send(ctx.event(), "pong").await?;
//!         }
//!         Ok(())
//!     })
//!     .commit(&bus)?;
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use sakiko_core::{ApiError, ApiResult, Bot, Event};
use serde_json::{Value, json};

use crate::api_caller::ApiCaller;
use crate::model::api::{GroupInfo, GroupMemberInfo, LoginInfo, MessageId, MessageRecord, UserInfo};
use crate::model::event::{GroupMessageEvent, MessageEvent, PokeNotice};
use crate::model::message::OneBotMessage;
use crate::model::segment::Segment;

/// Adapter name reported by every OneBot bot.
pub const ADAPTER_NAME: &str = "onebot";

/// A bot account connected over OneBot v11.
pub struct OneBotBot {
    self_id: String,
    nickname: String,
    caller: Arc<ApiCaller>,
}

impl OneBotBot {
    /// Creates a bot whose API calls go through `caller`.
    pub fn new(
        self_id: impl Into<String>,
        nickname: impl Into<String>,
        caller: Arc<ApiCaller>,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            nickname: nickname.into(),
            caller,
        }
    }

    /// Routes an API response frame from the connection.
    pub(crate) fn handle_response(&self, frame: &Value) -> bool {
        self.caller.handle_response(frame)
    }

    /// Fails every pending call; the connection is gone.
    pub(crate) fn disconnect(&self) {
        self.caller.fail_all();
    }

    /// Number of API calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.caller.pending_count()
    }

    /// Calls `action` and deserializes the response data.
    pub async fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        params: Value,
    ) -> ApiResult<T> {
        let data = self.caller.call(action, params).await?;
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl Bot for OneBotBot {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn adapter_name(&self) -> &str {
        ADAPTER_NAME
    }

    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        self.caller.call(action, params).await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// =============================================================================
// Typed APIs
// =============================================================================

macro_rules! impl_api {
    // No return value
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<()> {
            self.caller.call(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(())
        }
    };
    // Deserializes the response data
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            self.call(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await
        }
    };
}

impl OneBotBot {
    /// Sends a private message and returns its message id.
    pub async fn send_private_msg(
        &self,
        user_id: i64,
        message: impl Into<OneBotMessage>,
    ) -> ApiResult<i64> {
        let params = json!({ "user_id": user_id, "message": message.into() });
        let sent: MessageId = self.call("send_private_msg", params).await?;
        Ok(sent.message_id)
    }

    /// Sends a group message and returns its message id.
    pub async fn send_group_msg(
        &self,
        group_id: i64,
        message: impl Into<OneBotMessage>,
    ) -> ApiResult<i64> {
        let params = json!({ "group_id": group_id, "message": message.into() });
        let sent: MessageId = self.call("send_group_msg", params).await?;
        Ok(sent.message_id)
    }

    /// Sends `message` to wherever `event` came from.
    ///
    /// Works for message events and pokes. Group events answer in the
    /// group, everything else answers the user privately.
    pub async fn send(
        &self,
        event: &dyn Event,
        message: impl Into<OneBotMessage>,
    ) -> ApiResult<i64> {
        match reply_target(event)? {
            Target::Group(group_id) => self.send_group_msg(group_id, message).await,
            Target::Private(user_id) => self.send_private_msg(user_id, message).await,
        }
    }

    /// Like [`send`](Self::send), quoting the original message.
    pub async fn reply(
        &self,
        event: &dyn Event,
        message: impl Into<OneBotMessage>,
    ) -> ApiResult<i64> {
        let Some(source) = event.view::<MessageEvent>() else {
            return Err(ApiError::NotSupported(format!(
                "cannot quote a {}",
                event.event_name()
            )));
        };
        let message: OneBotMessage = message.into();
        let quoted: OneBotMessage = std::iter::once(Segment::reply(source.message_id))
            .chain(message)
            .collect();
        self.send(event, quoted).await
    }

    impl_api!(
        /// Recalls a message.
        delete_msg,
        (message_id: i64)
    );

    impl_api!(
        get_msg,
        (message_id: i64) -> MessageRecord
    );

    impl_api!(
        /// Returns the account this connection is logged in as.
        get_login_info,
        () -> LoginInfo
    );

    impl_api!(
        get_stranger_info,
        (user_id: i64, no_cache: bool) -> UserInfo
    );

    impl_api!(
        get_friend_list,
        () -> Vec<UserInfo>
    );

    impl_api!(
        get_group_info,
        (group_id: i64, no_cache: bool) -> GroupInfo
    );

    impl_api!(
        get_group_list,
        () -> Vec<GroupInfo>
    );

    impl_api!(
        get_group_member_info,
        (group_id: i64, user_id: i64, no_cache: bool) -> GroupMemberInfo
    );

    impl_api!(
        get_group_member_list,
        (group_id: i64) -> Vec<GroupMemberInfo>
    );

    impl_api!(
        /// Removes a member from a group.
        set_group_kick,
        (group_id: i64, user_id: i64, reject_add_request: bool)
    );

    impl_api!(
        /// Mutes a member for `duration` seconds; 0 lifts the mute.
        set_group_ban,
        (group_id: i64, user_id: i64, duration: u64)
    );

    impl_api!(
        set_group_whole_ban,
        (group_id: i64, enable: bool)
    );

    impl_api!(
        /// Answers a friend request using the `flag` from its event.
        set_friend_add_request,
        (flag: &str, approve: bool, remark: &str)
    );

    impl_api!(
        /// Answers a group join request or invitation.
        set_group_add_request,
        (flag: &str, sub_type: &str, approve: bool, reason: &str)
    );
}

#[derive(Debug, PartialEq, Eq)]
enum Target {
    Group(i64),
    Private(i64),
}

fn reply_target(event: &dyn Event) -> ApiResult<Target> {
    if let Some(group) = event.view::<GroupMessageEvent>() {
        return Ok(Target::Group(group.group_id));
    }
    if let Some(message) = event.view::<MessageEvent>() {
        return Ok(Target::Private(message.user_id));
    }
    if let Some(poke) = event.view::<PokeNotice>() {
        return Ok(match poke.group_id {
            Some(group_id) => Target::Group(group_id),
            None => Target::Private(poke.user_id),
        });
    }
    Err(ApiError::NotSupported(format!(
        "no reply target for {}",
        event.event_name()
    )))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use sakiko_core::Context;

    use super::*;
    use crate::model::event::parse_event;

    /// Answers every request with `message_id` 1 and records it.
    fn bot_with_echo_server() -> (Arc<OneBotBot>, mpsc::UnboundedReceiver<Value>) {
        let (tx, mut rx) = mpsc::channel::<String>(8);
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        let caller = Arc::new(ApiCaller::new(tx, Duration::from_secs(5)));
        let bot = Arc::new(OneBotBot::new("10001", "sakiko", caller.clone()));

        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let request: Value = serde_json::from_str(&frame).unwrap();
                caller.handle_response(&json!({
                    "status": "ok",
                    "retcode": 0,
                    "data": {"message_id": 1},
                    "echo": request["echo"]
                }));
                let _ = seen_tx.send(request);
            }
        });
        (bot, seen_rx)
    }

    fn message_event(message_type: &str) -> sakiko_core::BoxedEvent {
        parse_event(&json!({
            "time": 1,
            "self_id": 10001,
            "post_type": "message",
            "message_type": message_type,
            "sub_type": "normal",
            "message_id": 55,
            "group_id": 777,
            "user_id": 20002,
            "message": "ping",
            "raw_message": "ping"
        }))
        .unwrap()
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_routes_by_event() {
        let (bot, mut seen) = bot_with_echo_server();

        let id = bot.send(&*message_event("group"), "pong").await.unwrap();
        assert_eq!(id, 1);
        let request = seen.recv().await.unwrap();
        assert_eq!(request["action"], "send_group_msg");
        assert_eq!(request["params"]["group_id"], 777);
        assert_eq!(request["params"]["message"][0]["data"]["text"], "pong");

        bot.send(&*message_event("private"), "pong").await.unwrap();
        let request = seen.recv().await.unwrap();
        assert_eq!(request["action"], "send_private_msg");
        assert_eq!(request["params"]["user_id"], 20002);
    }

    #[tokio::test]
    async fn test_send_from_handler_context() {
        let (bot, mut seen) = bot_with_echo_server();
        let ctx = Context::new(message_event("private"), bot.clone());

        bot.send(&**ctx.event(), "pong").await.unwrap();
        let request = seen.recv().await.unwrap();
        assert_eq!(request["action"], "send_private_msg");
        assert_eq!(request["params"]["user_id"], 20002);
    }

    #[tokio::test]
    async fn test_reply_quotes_source() {
        let (bot, mut seen) = bot_with_echo_server();

        bot.reply(&*message_event("group"), "pong").await.unwrap();
        let request = seen.recv().await.unwrap();
        let message = &request["params"]["message"];
        assert_eq!(message[0]["type"], "reply");
        assert_eq!(message[0]["data"]["id"], "55");
        assert_eq!(message[1]["data"]["text"], "pong");
    }

    #[tokio::test]
    async fn test_send_without_target_is_rejected() {
        let (bot, _seen) = bot_with_echo_server();
        let heartbeat = parse_event(&json!({
            "time": 1, "self_id": 10001, "post_type": "meta_event",
            "meta_event_type": "heartbeat", "interval": 5000
        }))
        .unwrap()
        .unwrap();

        let err = bot.send(&*heartbeat, "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::NotSupported(_)));
        assert_eq!(bot.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_typed_api_params() {
        let (bot, mut seen) = bot_with_echo_server();

        bot.set_group_ban(777, 20002, 600).await.unwrap();
        let request = seen.recv().await.unwrap();
        assert_eq!(request["action"], "set_group_ban");
        assert_eq!(
            request["params"],
            json!({"group_id": 777, "user_id": 20002, "duration": 600})
        );
    }

    #[test]
    fn test_bot_identity() {
        let (tx, _rx) = mpsc::channel(1);
        let caller = Arc::new(ApiCaller::new(tx, Duration::from_secs(1)));
        let bot = OneBotBot::new("10001", "sakiko", caller);

        assert_eq!(bot.self_id(), "10001");
        assert_eq!(bot.nickname(), "sakiko");
        assert_eq!(bot.adapter_name(), "onebot");
    }
}
