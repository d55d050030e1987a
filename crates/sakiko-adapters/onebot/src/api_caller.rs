//! Echo-matched API calls over a WebSocket connection.
//!
//! Each [`ApiCaller::call`]:
//! 1. Takes a fresh echo token from the snowflake generator (base 36).
//! 2. Registers a oneshot channel for it in the pending map.
//! 3. Queues the request on the connection's write channel.
//! 4. Waits for [`ApiCaller::handle_response`] to route the matching
//!    response back, or for the timeout.
//!
//! When the connection closes, [`ApiCaller::fail_all`] drops every pending
//! sender so the waiting calls return [`ApiError::NotConnected`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use sakiko_core::{ApiError, ApiResult, snowflake};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

pub struct ApiCaller {
    /// Write channel of the owning connection; carries serialized frames.
    outbound: mpsc::Sender<String>,
    /// echo → waiting call.
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    api_timeout: Duration,
}

impl ApiCaller {
    pub fn new(outbound: mpsc::Sender<String>, api_timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            api_timeout,
        }
    }

    /// Sends `action` and returns the `data` field of a successful response.
    pub async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        let echo = snowflake::global().next_base36();

        // Register before sending so a fast response cannot be missed.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(echo.clone(), tx);

        let request = json!({
            "action": action,
            "params": params,
            "echo": echo,
        });
        debug!(action, echo = %echo, "Calling OneBot API");
        trace!(request = %request, "API request");

        if self.outbound.send(request.to_string()).await.is_err() {
            self.pending.lock().remove(&echo);
            return Err(ApiError::NotConnected);
        }

        let response = match timeout(self.api_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ApiError::NotConnected),
            Err(_) => {
                self.pending.lock().remove(&echo);
                return Err(ApiError::Timeout {
                    action: action.to_string(),
                    echo,
                });
            }
        };

        validate_response(response)
    }

    /// Routes a response frame to its waiting call.
    ///
    /// Returns `false` if the frame has no echo or nobody is waiting for it.
    pub fn handle_response(&self, frame: &Value) -> bool {
        let echo = match frame.get("echo") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return false,
        };

        let Some(tx) = self.pending.lock().remove(&echo) else {
            warn!(echo = %echo, "Response for unknown echo (timed out?)");
            return false;
        };
        let _ = tx.send(frame.clone());
        true
    }

    /// Fails every pending call. Returns how many were waiting.
    pub fn fail_all(&self) -> usize {
        let mut pending = self.pending.lock();
        let count = pending.len();
        if count > 0 {
            debug!(count, "Failing pending API calls after disconnect");
        }
        pending.clear();
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Checks the response envelope and extracts `data`.
///
/// `status`, `retcode` and `data` must all be present, and `retcode` must be
/// 0.
pub fn validate_response(response: Value) -> ApiResult<Value> {
    let Value::Object(mut fields) = response else {
        return Err(ApiError::InvalidResponse("response is not an object".into()));
    };

    for key in ["status", "retcode", "data"] {
        if !fields.contains_key(key) {
            return Err(ApiError::InvalidResponse(format!("missing field '{key}'")));
        }
    }

    let retcode = fields
        .get("retcode")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::InvalidResponse("retcode is not an integer".into()))?;

    if retcode != 0 {
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
        return Err(ApiError::Failed {
            retcode,
            status: text("status").unwrap_or_default(),
            message: text("wording")
                .or_else(|| text("msg"))
                .or_else(|| text("message"))
                .unwrap_or_default(),
        });
    }

    Ok(fields.remove("data").unwrap_or(Value::Null))
}
