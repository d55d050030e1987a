//! Echo Bot Example
//!
//! A small OneBot v11 bot packaged as a plugin.
//!
//! # Matchers
//!
//! ```text
//! prio 100: [log]                               never blocks
//! prio  10: [echo, ping, help, info, group]     blocking
//! prio   0: [poke]
//! ```
//!
//! Matchers in one tier run concurrently. A command action only runs when
//! its filter passes, and it answers with [`Outcome::Block`] once it has
//! replied, so a handled command never reaches the lower tiers.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --config demos/echo_bot/sakiko.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sakiko::core::ApiError;
use sakiko::framework::StartsWithMatch;
use sakiko::onebot::{GroupMessageEvent, MessageEvent, OneBotAdapter, OneBotBot, PokeNotice};
use sakiko::prelude::*;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "echo-bot", version, about = "Echo bot for the Sakiko framework")]
struct Args {
    /// Config file to load instead of searching for sakiko.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Config profile to apply, e.g. "production"
    #[arg(short, long)]
    profile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct EchoConfig {
    prefix: String,
    poke_reply: String,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            prefix: "/echo ".into(),
            poke_reply: "Don't poke me!".into(),
        }
    }
}

const HELP: &str = r"╭─────────────────────────────╮
│     Echo Bot - Commands     │
├─────────────────────────────┤
│ /echo <text> - Echo text    │
│ /ping        - Pong!        │
│ /help        - This help    │
│ /info        - Message info │
│ /group       - Group only   │
╰─────────────────────────────╯";

fn onebot(ctx: &Context) -> Option<Arc<OneBotBot>> {
    downcast_bot::<OneBotBot>(ctx.bot().clone())
}

/// Replies to the event and claims it.
async fn reply_text(ctx: &Context, text: &str) -> Result<Outcome, ApiError> {
    let Some(bot) = onebot(ctx) else {
        return Ok(Outcome::Continue);
    };
    bot.send(&**ctx.event(), text).await?;
    Ok(Outcome::Block)
}

// ============================================================================
// Handlers
// ============================================================================

async fn log_message(ctx: Context) {
    let Some(msg) = ctx.view::<MessageEvent>() else {
        return;
    };
    match ctx.view::<GroupMessageEvent>() {
        Some(group) => info!(
            "[Group {}] {} ({}): {}",
            group.group_id,
            msg.sender.display_name(),
            msg.user_id,
            msg.message.summary()
        ),
        None => info!(
            "[Private] {} ({}): {}",
            msg.sender.display_name(),
            msg.user_id,
            msg.message.summary()
        ),
    }
}

async fn echo(ctx: Context) -> Result<Outcome, ApiError> {
    let Some(hit) = ctx.get::<StartsWithMatch>() else {
        return Ok(Outcome::Continue);
    };
    if hit.rest.trim().is_empty() {
        return Ok(Outcome::Continue);
    }
    reply_text(&ctx, &hit.rest).await
}

async fn info_text(ctx: Context) -> Result<Outcome, ApiError> {
    let Some(msg) = ctx.view::<MessageEvent>() else {
        return Ok(Outcome::Continue);
    };
    let text = match ctx.view::<GroupMessageEvent>() {
        Some(group) => format!(
            "📋 Message Info\n\
            • Type: Group\n\
            • From: {} ({})\n\
            • Group: {}\n\
            • Message ID: {}\n\
            • Sub Type: {}",
            msg.sender.display_name(),
            msg.user_id,
            group.group_id,
            msg.message_id,
            msg.sub_type
        ),
        None => format!(
            "📋 Message Info\n\
            • Type: Private\n\
            • From: {} ({})\n\
            • Message ID: {}\n\
            • Sub Type: {}",
            msg.sender.display_name(),
            msg.user_id,
            msg.message_id,
            msg.sub_type
        ),
    };
    reply_text(&ctx, &text).await
}

async fn group_only(ctx: Context) -> Result<Outcome, ApiError> {
    let Some(group) = ctx.view::<GroupMessageEvent>() else {
        return Ok(Outcome::Continue);
    };
    let text = format!(
        "✅ This is a group-only command!\n\
        • Group ID: {}\n\
        • User: {} ({})",
        group.group_id,
        group.sender.display_name(),
        group.user_id
    );
    reply_text(&ctx, &text).await
}

// ============================================================================
// Plugin
// ============================================================================

struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("echo")
            .display_name("Echo")
            .version(env!("CARGO_PKG_VERSION"))
            .description("Echoes text and answers a few commands")
    }

    async fn on_load(&self, ctx: &PluginContext) -> PluginResult<()> {
        let config: EchoConfig = ctx.config()?;
        let bus = ctx.bus();

        let matchers = [
            on::<MessageEvent>()
                .name("log")
                .priority(100)
                .handle(log_message),
            on::<MessageEvent>()
                .name("echo")
                .priority(10)
                .block(true)
                .with(starts_with([config.prefix.clone()], true))
                .handle(echo),
            on::<MessageEvent>()
                .name("ping")
                .priority(10)
                .block(true)
                .with(full_match(["/ping"], false))
                .handle(|ctx: Context| async move { reply_text(&ctx, "Pong! 🏓").await }),
            on::<MessageEvent>()
                .name("help")
                .priority(10)
                .block(true)
                .with(full_match(["/help"], false))
                .handle(|ctx: Context| async move { reply_text(&ctx, HELP).await }),
            on::<MessageEvent>()
                .name("info")
                .priority(10)
                .block(true)
                .with(full_match(["/info"], false))
                .handle(info_text),
            on::<GroupMessageEvent>()
                .name("group")
                .priority(10)
                .block(true)
                .with(full_match(["/group"], false))
                .handle(group_only),
            on::<PokeNotice>().name("poke").handle(move |ctx: Context| {
                let answer = config.poke_reply.clone();
                async move {
                    match ctx.view::<PokeNotice>() {
                        Some(poke) if poke.to_me() => reply_text(&ctx, &answer).await,
                        _ => Ok(Outcome::Continue),
                    }
                }
            }),
        ];

        for matcher in matchers {
            let registration = matcher.commit(bus).map_err(PluginError::other)?;
            ctx.track(registration);
        }
        Ok(())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = Sakiko::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let sakiko = builder.build()?;

    sakiko.register_adapter::<OneBotAdapter>().await?;
    sakiko.load_plugin(EchoPlugin).await?;

    sakiko.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sakiko::onebot::{ApiCaller, parse_event};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    use super::*;

    fn group_message(text: &str) -> sakiko::core::BoxedEvent {
        parse_event(&json!({
            "time": 1,
            "self_id": 10001,
            "post_type": "message",
            "message_type": "group",
            "sub_type": "normal",
            "message_id": 9,
            "group_id": 777,
            "user_id": 20002,
            "message": text,
            "raw_message": text
        }))
        .unwrap()
        .unwrap()
    }

    /// OneBot bot whose connection answers every call with `message_id` 1.
    fn answering_bot() -> (Arc<OneBotBot>, mpsc::UnboundedReceiver<Value>) {
        let (tx, mut rx) = mpsc::channel::<String>(8);
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        let caller = Arc::new(ApiCaller::new(tx, Duration::from_secs(5)));
        let bot = Arc::new(OneBotBot::new("10001", "echo", caller.clone()));

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

    #[tokio::test]
    async fn test_reply_text_answers_and_blocks() {
        let (bot, mut seen) = answering_bot();
        let ctx = Context::new(group_message("/ping"), bot);

        let outcome = reply_text(&ctx, "Pong!").await.unwrap();
        assert_eq!(outcome, Outcome::Block);

        let request = seen.recv().await.unwrap();
        assert_eq!(request["action"], "send_group_msg");
        assert_eq!(request["params"]["group_id"], 777);
        assert_eq!(request["params"]["message"][0]["data"]["text"], "Pong!");
    }

    #[tokio::test]
    async fn test_group_only_replies_in_group() {
        let (bot, mut seen) = answering_bot();
        let ctx = Context::new(group_message("/group"), bot);

        let outcome = group_only(ctx).await.unwrap();
        assert_eq!(outcome, Outcome::Block);

        let request = seen.recv().await.unwrap();
        let text = request["params"]["message"][0]["data"]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("777"));
        assert!(text.contains("20002"));
    }

    #[test]
    fn test_echo_config_defaults() {
        let config = EchoConfig::default();
        assert_eq!(config.prefix, "/echo ");
        assert_eq!(config.poke_reply, "Don't poke me!");
    }
}
