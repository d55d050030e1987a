//! OneBot v11 adapter.
//!
//! Depending on [`ConnectionMode`], the adapter either listens for the
//! implementation's reverse WebSocket or dials every configured url. Each
//! connection becomes one [`OneBotBot`](crate::OneBotBot) once the
//! implementation announces itself with a lifecycle `connect` event.
//!
//! # Example
//!
//! ```rust,ignore
//! use sakiko::prelude::*;
//! use sakiko_adapter_onebot::OneBotAdapter;
//!
//! let sakiko = Sakiko::builder().build()?;
//! sakiko.register_adapter::<OneBotAdapter>().await?;
//! sakiko.run().await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sakiko_core::{Adapter, AdapterContext, AdapterError, AdapterResult, ConfigurableAdapter};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::bot::ADAPTER_NAME;
use crate::config::{ConnectionMode, OneBotConfig};
use crate::connection::{Shared, run_forward, run_listener};

pub struct OneBotAdapter {
    config: OneBotConfig,
    /// Address the reverse listener bound to.
    local_addr: Mutex<Option<SocketAddr>>,
}

impl OneBotAdapter {
    pub fn new(config: OneBotConfig) -> Self {
        Self {
            config,
            local_addr: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &OneBotConfig {
        &self.config
    }

    /// Returns the listener address once a reverse-mode adapter has started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}

impl Default for OneBotAdapter {
    fn default() -> Self {
        Self::new(OneBotConfig::default())
    }
}

#[async_trait]
impl Adapter for OneBotAdapter {
    fn name() -> &'static str {
        ADAPTER_NAME
    }

    async fn on_start(&self, ctx: AdapterContext) -> AdapterResult<()> {
        self.config.validate()?;
        let shared = Arc::new(Shared {
            ctx,
            config: self.config.clone(),
        });

        match self.config.mode {
            ConnectionMode::Forward => {
                for url in &self.config.urls {
                    tokio::spawn(run_forward(url.clone(), shared.clone()));
                }
                info!(count = self.config.urls.len(), "OneBot adapter dialling");
            }
            ConnectionMode::Reverse => {
                let addr = self.config.bind_addr();
                let listener = TcpListener::bind(&addr)
                    .await
                    .map_err(|e| AdapterError::connection(&addr, e))?;
                let local = listener.local_addr()?;
                *self.local_addr.lock() = Some(local);

                info!(addr = %local, path = %self.config.path, "OneBot adapter listening");
                tokio::spawn(run_listener(listener, shared));
            }
        }
        Ok(())
    }

    async fn on_shutdown(&self) -> AdapterResult<()> {
        // Connection tasks watch the shutdown token and close on their own.
        debug!("OneBot adapter stopped");
        Ok(())
    }
}

impl ConfigurableAdapter for OneBotAdapter {
    type Config = OneBotConfig;

    fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self::new(config)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use sakiko_core::{BotRegistry, Context, EventBus, downcast_bot, on};
    use serde_json::{Value, json};
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
    use tokio_tungstenite::{accept_hdr_async, connect_async};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::OneBotBot;
    use crate::model::event::PrivateMessageEvent;

    fn connect_frame() -> Message {
        frame(json!({
            "time": 1, "self_id": 10001, "post_type": "meta_event",
            "meta_event_type": "lifecycle", "sub_type": "connect"
        }))
    }

    fn private_message(text: &str) -> Message {
        frame(json!({
            "time": 1, "self_id": 10001, "post_type": "message",
            "message_type": "private", "sub_type": "friend",
            "message_id": 1, "user_id": 20002,
            "message": [{"type": "text", "data": {"text": text}}],
            "raw_message": text,
            "sender": {"user_id": 20002, "nickname": "alice"}
        }))
    }

    fn frame(value: Value) -> Message {
        Message::Text(value.to_string().into())
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..300 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    fn context() -> (AdapterContext, EventBus, BotRegistry, CancellationToken) {
        let bus = EventBus::new();
        bus.start();
        let bots = BotRegistry::new();
        let shutdown = CancellationToken::new();
        let ctx = AdapterContext::new(bus.clone(), bots.clone(), shutdown.clone());
        (ctx, bus, bots, shutdown)
    }

    #[tokio::test]
    async fn test_reverse_session_lifecycle() {
        let (ctx, bus, bots, shutdown) = context();
        let received = Arc::new(Mutex::new(Vec::new()));
        {
            let received = received.clone();
            on::<PrivateMessageEvent>()
                .handle(move |ctx: Context| {
                    let received = received.clone();
                    async move {
                        received.lock().push(ctx.plain_text().unwrap_or_default());
                    }
                })
                .commit(&bus)
                .unwrap();
        }

        let adapter = OneBotAdapter::new(OneBotConfig {
            port: 0,
            access_token: Some("secret".into()),
            ..Default::default()
        });
        adapter.on_start(ctx).await.unwrap();
        let addr = adapter.local_addr().unwrap();

        let mut request = format!("ws://{addr}/onebot/v11/ws")
            .into_client_request()
            .unwrap();
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        let (mut ws, _) = connect_async(request).await.unwrap();

        // Ignored: the bot is not bound yet.
        ws.send(private_message("early")).await.unwrap();
        ws.send(connect_frame()).await.unwrap();
        wait_until(|| bots.get("10001").is_some()).await;

        ws.send(private_message("hello")).await.unwrap();
        wait_until(|| received.lock().len() == 1).await;
        assert_eq!(*received.lock(), vec!["hello".to_string()]);

        let bot = downcast_bot::<OneBotBot>(bots.get("10001").unwrap()).unwrap();
        let call = tokio::spawn(async move { bot.get_login_info().await });
        let request = ws.next().await.unwrap().unwrap();
        let request: Value = serde_json::from_str(request.to_text().unwrap()).unwrap();
        assert_eq!(request["action"], "get_login_info");
        ws.send(frame(json!({
            "status": "ok",
            "retcode": 0,
            "data": {"user_id": 10001, "nickname": "sakiko"},
            "echo": request["echo"]
        })))
        .await
        .unwrap();
        assert_eq!(call.await.unwrap().unwrap().nickname, "sakiko");

        ws.close(None).await.unwrap();
        wait_until(|| bots.is_empty()).await;
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_reverse_rejects_bad_token() {
        let (ctx, _bus, bots, shutdown) = context();
        let adapter = OneBotAdapter::new(OneBotConfig {
            port: 0,
            access_token: Some("secret".into()),
            ..Default::default()
        });
        adapter.on_start(ctx).await.unwrap();
        let addr = adapter.local_addr().unwrap();

        assert!(connect_async(format!("ws://{addr}/onebot/v11/ws")).await.is_err());

        let mut request = format!("ws://{addr}/onebot/v11/ws")
            .into_client_request()
            .unwrap();
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer guess"));
        assert!(connect_async(request).await.is_err());
        assert!(bots.is_empty());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_forward_sends_token_and_closes_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (auth_tx, auth_rx) = oneshot::channel();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = move |request: &Request, response: Response| {
                let header = request
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let _ = auth_tx.send(header);
                Ok::<_, ErrorResponse>(response)
            };
            let mut ws = accept_hdr_async(stream, callback).await.unwrap();
            ws.send(connect_frame()).await.unwrap();

            // Runs until the adapter closes the connection.
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });

        let (ctx, _bus, bots, shutdown) = context();
        let adapter = OneBotAdapter::from_config(OneBotConfig {
            mode: ConnectionMode::Forward,
            urls: vec![format!("ws://{addr}")],
            access_token: Some("secret".into()),
            reconnect_interval_ms: 0,
            ..Default::default()
        })
        .unwrap();
        adapter.on_start(ctx).await.unwrap();

        assert_eq!(auth_rx.await.unwrap().as_deref(), Some("Bearer secret"));
        wait_until(|| bots.len() == 1).await;

        shutdown.cancel();
        wait_until(|| bots.is_empty()).await;
        server.await.unwrap();
    }

    #[test]
    fn test_from_config_validates() {
        let result = OneBotAdapter::from_config(OneBotConfig {
            mode: ConnectionMode::Forward,
            ..Default::default()
        });
        assert!(matches!(result, Err(AdapterError::InvalidConfig(_))));
        assert_eq!(OneBotAdapter::name(), "onebot");
    }
}
