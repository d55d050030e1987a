//! Test fixtures.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use sakiko_core::{ApiResult, Bot, BoxedBot, BoxedEvent, EventMeta};
use sakiko_macros::BotEvent;
use serde_json::Value;

pub struct MockBot {
    self_id: String,
}

impl MockBot {
    pub fn boxed(self_id: &str) -> BoxedBot {
        Arc::new(Self {
            self_id: self_id.to_string(),
        })
    }
}

#[async_trait]
impl Bot for MockBot {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn nickname(&self) -> &str {
        ""
    }

    fn adapter_name(&self) -> &str {
        "test"
    }

    async fn call_api(&self, _action: &str, _params: Value) -> ApiResult<Value> {
        Ok(Value::Null)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[derive(Debug, Clone, BotEvent)]
#[root_event(platform = "test")]
pub struct Root {
    #[event(meta)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, BotEvent)]
#[event(name = "message", type = "message")]
pub struct TextEvent {
    #[event(parent)]
    pub base: Root,
    #[event(message)]
    pub text: String,
}

#[derive(Debug, Clone, BotEvent)]
#[event(name = "notice", type = "notice")]
pub struct NoticeEvent {
    #[event(parent)]
    pub base: Root,
}

pub fn text_message(text: &str) -> BoxedEvent {
    BoxedEvent::new(TextEvent {
        base: Root {
            meta: EventMeta::stamp(),
        },
        text: text.to_string(),
    })
}

pub fn notice() -> BoxedEvent {
    BoxedEvent::new(NoticeEvent {
        base: Root {
            meta: EventMeta::stamp(),
        },
    })
}
