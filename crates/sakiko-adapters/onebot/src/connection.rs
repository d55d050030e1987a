//! WebSocket sessions with a OneBot implementation.
//!
//! Both connection directions end up in [`run_session`], which:
//!
//! - binds a [`OneBotBot`] when the lifecycle `connect` event arrives,
//!   ignoring every frame before it
//! - routes API responses to the bot's [`ApiCaller`]
//! - decodes the remaining frames and dispatches them on the bus
//! - unregisters the bot and fails its pending calls when the socket closes

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use sakiko_core::{
    AdapterContext, AdapterError, AdapterResult, Bot, BoxedBot, BoxedEvent, EventType,
};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_hdr_async, connect_async};
use tracing::{debug, info, trace, warn};

use crate::api_caller::ApiCaller;
use crate::bot::OneBotBot;
use crate::config::OneBotConfig;
use crate::model::event::{
    GroupMessageEvent, MessageEvent, decode_event, is_api_response, is_connect_event,
};

/// State shared by every session of one adapter.
pub(crate) struct Shared {
    pub ctx: AdapterContext,
    pub config: OneBotConfig,
}

// =============================================================================
// Forward mode
// =============================================================================

/// Opens a client connection, sending the bearer token if one is configured.
pub(crate) async fn connect(
    url: &str,
    token: Option<&str>,
) -> AdapterResult<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let mut request = url
        .into_client_request()
        .map_err(|e| AdapterError::connection(url, e))?;
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| AdapterError::InvalidConfig(format!("access_token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (ws, _response) = connect_async(request)
        .await
        .map_err(|e| AdapterError::connection(url, e))?;
    Ok(ws)
}

/// Keeps a forward connection to `url` alive until shutdown.
pub(crate) async fn run_forward(url: String, shared: Arc<Shared>) {
    let shutdown = shared.ctx.shutdown().clone();

    loop {
        let connected = tokio::select! {
            _ = shutdown.cancelled() => return,
            result = connect(&url, shared.config.token()) => result,
        };
        match connected {
            Ok(ws) => {
                info!(url = %url, "Connected to OneBot implementation");
                run_session(ws, url.clone(), shared.clone()).await;
            }
            Err(e) => warn!(url = %url, error = %e, "OneBot connection failed"),
        }

        let Some(delay) = shared.config.reconnect_interval() else {
            debug!(url = %url, "Reconnection disabled");
            return;
        };
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        debug!(url = %url, "Reconnecting");
    }
}

// =============================================================================
// Reverse mode
// =============================================================================

/// Accepts connections on `listener` until shutdown.
pub(crate) async fn run_listener(listener: TcpListener, shared: Arc<Shared>) {
    let shutdown = shared.ctx.shutdown().clone();

    loop {
        let (stream, addr) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
        };

        let shared = shared.clone();
        tokio::spawn(async move {
            let path = shared.config.path.clone();
            let token = shared.config.token().map(str::to_string);
            let callback = move |request: &Request, response: Response| {
                authorize(request, &path, token.as_deref()).map(|()| response)
            };

            match accept_hdr_async(stream, callback).await {
                Ok(ws) => {
                    info!(peer = %addr, "OneBot implementation connected");
                    run_session(ws, addr.to_string(), shared).await;
                }
                Err(e) => debug!(peer = %addr, error = %e, "Handshake rejected"),
            }
        });
    }
    debug!("Listener stopped");
}

/// Checks the request path and access token of an incoming handshake.
pub(crate) fn authorize(
    request: &Request,
    path: &str,
    token: Option<&str>,
) -> Result<(), ErrorResponse> {
    if request.uri().path().trim_end_matches('/') != path.trim_end_matches('/') {
        return Err(reject(StatusCode::NOT_FOUND, "unknown path"));
    }

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).trim().to_string())
        .or_else(|| query_token(request));

    check_token(provided.as_deref(), token).map_err(|reason| {
        let status = if provided.is_some() {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::UNAUTHORIZED
        };
        reject(status, reason)
    })
}

/// Compares the provided token with the expected one.
pub(crate) fn check_token(provided: Option<&str>, expected: Option<&str>) -> Result<(), &'static str> {
    match (expected, provided) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err("no access token expected"),
        (Some(_), None) => Err("no access token provided"),
        (Some(expected), Some(provided)) if expected == provided => Ok(()),
        (Some(_), Some(_)) => Err("invalid access token"),
    }
}

/// Reads `access_token` from the query string.
fn query_token(request: &Request) -> Option<String> {
    request
        .uri()
        .query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "access_token")
        .map(|(_, value)| value.to_string())
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

// =============================================================================
// Session
// =============================================================================

/// Drives one WebSocket until it closes or the runtime shuts down.
pub(crate) async fn run_session<S>(ws: WebSocketStream<S>, peer: String, shared: Arc<Shared>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<String>(256);
    let shutdown = shared.ctx.shutdown().clone();
    let mut session = Session {
        peer,
        outbound,
        bot: None,
        shared,
    };

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(peer = %session.peer, "Closing connection for shutdown");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }

            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    warn!(peer = %session.peer, error = %e, "Failed to send frame");
                    break;
                }
            }

            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => session.on_frame(text.as_str()),
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => session.on_frame(text),
                    Err(_) => warn!(peer = %session.peer, "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Ping(data))) => {
                    trace!(peer = %session.peer, "Received ping, sending pong");
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(peer = %session.peer, frame = ?frame, "Peer closed connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(peer = %session.peer, error = %e, "WebSocket error");
                    break;
                }
                None => break,
            },
        }
    }

    session.close();
}

struct Session {
    peer: String,
    /// Write half handed to the bot's [`ApiCaller`].
    outbound: mpsc::Sender<String>,
    bot: Option<Arc<OneBotBot>>,
    shared: Arc<Shared>,
}

impl Session {
    fn on_frame(&mut self, text: &str) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "Dropping non-JSON frame");
                return;
            }
        };

        let Some(bot) = self.bot.clone() else {
            if is_connect_event(&frame) {
                self.bind(&frame);
            } else {
                trace!(peer = %self.peer, "Ignoring frame before lifecycle connect");
            }
            return;
        };

        if is_api_response(&frame) {
            bot.handle_response(&frame);
            return;
        }

        match decode_event(&frame, Arc::from(text)) {
            Ok(Some(event)) => {
                if self.shared.config.log_event {
                    log_event(&event);
                }
                self.shared.ctx.dispatch(bot, event);
            }
            Ok(None) => trace!(peer = %self.peer, "Ignoring non-event frame"),
            Err(e) => warn!(peer = %self.peer, error = %e, "Failed to decode event"),
        }
    }

    fn bind(&mut self, frame: &Value) {
        let self_id = match frame.get("self_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                warn!(peer = %self.peer, "Lifecycle event without self_id");
                return;
            }
        };
        let nickname = frame
            .get("nickname")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let caller = Arc::new(ApiCaller::new(
            self.outbound.clone(),
            self.shared.config.api_timeout(),
        ));
        let bot = Arc::new(OneBotBot::new(self_id.clone(), nickname, caller));

        if self.shared.ctx.bots().add(bot.clone()).is_some() {
            warn!(self_id = %self_id, "Replaced an existing connection for this bot");
        }
        info!(self_id = %self_id, peer = %self.peer, "Bot connected");
        self.bot = Some(bot);
    }

    fn close(self) {
        let Some(bot) = self.bot else {
            debug!(peer = %self.peer, "Connection closed before a bot was bound");
            return;
        };
        bot.disconnect();

        let self_id = bot.self_id().to_string();
        let boxed: BoxedBot = bot;
        if self.shared.ctx.bots().remove_instance(&boxed) {
            info!(self_id = %self_id, "Bot disconnected");
        }
    }
}

/// Logs a received event: messages at info, heartbeats at trace, the rest at debug.
fn log_event(event: &BoxedEvent) {
    if let Some(group) = event.view::<GroupMessageEvent>() {
        info!(
            "[{}] [group {}] {}({}): {}",
            group.self_id,
            group.group_id,
            group.sender.nickname.as_deref().unwrap_or("unknown"),
            group.user_id,
            group.message.summary()
        );
    } else if let Some(message) = event.view::<MessageEvent>() {
        info!(
            "[{}] [private] {}({}): {}",
            message.self_id,
            message.sender.nickname.as_deref().unwrap_or("unknown"),
            message.user_id,
            message.message.summary()
        );
    } else if event.event_type() == EventType::Meta {
        trace!(event = event.event_name(), "Received meta event");
    } else {
        debug!(event = event.event_name(), "Received event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake(uri: &str, auth: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_check_token() {
        assert!(check_token(None, None).is_ok());
        assert!(check_token(Some("secret"), Some("secret")).is_ok());
        assert_eq!(check_token(None, Some("secret")), Err("no access token provided"));
        assert_eq!(check_token(Some("guess"), Some("secret")), Err("invalid access token"));
        assert_eq!(check_token(Some("secret"), None), Err("no access token expected"));
    }

    #[test]
    fn test_authorize_handshake() {
        let path = "/onebot/v11/ws";

        assert!(authorize(&handshake(path, Some("Bearer secret")), path, Some("secret")).is_ok());
        assert!(authorize(&handshake("/onebot/v11/ws/", None), path, None).is_ok());
        assert!(
            authorize(&handshake("/onebot/v11/ws?access_token=secret", None), path, Some("secret"))
                .is_ok()
        );

        let missing = authorize(&handshake(path, None), path, Some("secret")).unwrap_err();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = authorize(&handshake(path, Some("Bearer guess")), path, Some("secret")).unwrap_err();
        assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
        assert_eq!(wrong.body().as_deref(), Some("invalid access token"));

        let elsewhere = authorize(&handshake("/other", None), path, None).unwrap_err();
        assert_eq!(elsewhere.status(), StatusCode::NOT_FOUND);
    }
}
