//! Fixtures shared by the unit tests.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sakiko_macros::BotEvent;
use serde_json::{Value, json};

use crate::foundation::event::{BoxedEvent, Event, EventMeta};
use crate::foundation::message::Messageable;
use crate::integration::bot::{ApiResult, Bot, BoxedBot};

// ============================================================================
// Bot
// ============================================================================

/// Bot that records API calls and echoes them back.
pub struct MockBot {
    self_id: String,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl MockBot {
    pub fn new(self_id: &str) -> Self {
        Self {
            self_id: self_id.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn boxed(self_id: &str) -> BoxedBot {
        Arc::new(Self::new(self_id))
    }
}

#[async_trait]
impl Bot for MockBot {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn nickname(&self) -> &str {
        "mock"
    }

    fn adapter_name(&self) -> &str {
        "test"
    }

    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        self.calls.lock().push((action.to_string(), params.clone()));
        Ok(json!({ "action": action, "params": params }))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// ============================================================================
// Single-level event
// ============================================================================

/// A flat event implemented by hand.
pub struct TestEvent {
    meta: EventMeta,
    text: String,
}

impl TestEvent {
    pub fn boxed(text: &str) -> BoxedEvent {
        BoxedEvent::new(Self {
            meta: EventMeta::stamp(),
            text: text.to_string(),
        })
    }
}

impl Event for TestEvent {
    fn event_name(&self) -> &'static str {
        "test.flat"
    }

    fn platform(&self) -> &'static str {
        "test"
    }

    fn meta(&self) -> &EventMeta {
        &self.meta
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn message(&self) -> Option<&dyn Messageable> {
        Some(&self.text)
    }
}

// ============================================================================
// Derived hierarchy
// ============================================================================
//
// TestRoot
// ├── MessageEvent
// │   ├── GroupMessageEvent
// │   └── PrivateMessageEvent
// └── NoticeEvent

#[derive(Debug, Clone, BotEvent)]
#[root_event(platform = "test")]
pub struct TestRoot {
    #[event(meta)]
    pub meta: EventMeta,
    #[event(self_id)]
    pub self_id: i64,
    #[event(raw_json)]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, BotEvent)]
#[event(name = "message", type = "message")]
pub struct MessageEvent {
    #[event(parent)]
    pub base: TestRoot,
    pub user_id: i64,
    #[event(message)]
    pub text: String,
}

#[derive(Debug, Clone, BotEvent)]
#[event(name = "message.group")]
pub struct GroupMessageEvent {
    #[event(parent)]
    pub message: MessageEvent,
    pub group_id: i64,
}

#[derive(Debug, Clone, BotEvent)]
#[event(name = "message.private")]
pub struct PrivateMessageEvent {
    #[event(parent)]
    pub message: MessageEvent,
}

#[derive(Debug, Clone, BotEvent)]
#[event(name = "notice", type = "notice")]
pub struct NoticeEvent {
    #[event(parent)]
    pub base: TestRoot,
    pub notice_type: String,
}

fn root() -> TestRoot {
    TestRoot {
        meta: EventMeta::stamp(),
        self_id: 10001,
        raw: Some(r#"{"post_type":"test"}"#.to_string()),
    }
}

fn message(text: &str) -> MessageEvent {
    MessageEvent {
        base: root(),
        user_id: 42,
        text: text.to_string(),
    }
}

pub fn group_message(text: &str) -> GroupMessageEvent {
    GroupMessageEvent {
        message: message(text),
        group_id: 7,
    }
}

pub fn private_message(text: &str) -> PrivateMessageEvent {
    PrivateMessageEvent {
        message: message(text),
    }
}

pub fn notice() -> NoticeEvent {
    NoticeEvent {
        base: root(),
        notice_type: "group_increase".to_string(),
    }
}

pub fn boxed_group_message(text: &str) -> BoxedEvent {
    BoxedEvent::new(group_message(text))
}

pub fn boxed_private_message(text: &str) -> BoxedEvent {
    BoxedEvent::new(private_message(text))
}

pub fn boxed_notice() -> BoxedEvent {
    BoxedEvent::new(notice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::EventType;
    use std::any::TypeId;

    #[test]
    fn test_derived_names_and_types() {
        let event = boxed_group_message("hi");

        assert_eq!(event.event_name(), "test.message.group");
        assert_eq!(event.platform(), "test");
        assert_eq!(event.event_type(), EventType::Message);
        assert_eq!(boxed_notice().event_type(), EventType::Notice);
        assert_eq!(event.self_id().as_deref(), Some("10001"));
        assert!(event.raw_json().is_some());
    }

    #[test]
    fn test_derived_lineage() {
        let event = boxed_group_message("hi");

        assert_eq!(
            event.lineage(),
            vec![
                TypeId::of::<GroupMessageEvent>(),
                TypeId::of::<MessageEvent>(),
                TypeId::of::<TestRoot>(),
            ]
        );
        assert!(event.is_a::<TestRoot>());
        assert!(!event.is_a::<PrivateMessageEvent>());
        assert_eq!(event.view::<MessageEvent>().map(|m| m.user_id), Some(42));
        assert_eq!(event.view::<GroupMessageEvent>().map(|g| g.group_id), Some(7));
    }

    #[test]
    fn test_message_and_meta_delegate_to_parent() {
        let group = group_message("hello");
        assert_eq!(group.message().map(|m| m.plain_text()).as_deref(), Some("hello"));
        assert_eq!(Event::meta(&group).id, group.message.base.meta.id);
        // Deref reaches the parent's fields.
        assert_eq!(group.user_id, 42);
        assert!(notice().message().is_none());
    }
}
