//! Procedural macros for the Sakiko bot framework.
//!
//! This crate provides:
//!
//! - `#[derive(BotEvent)]` - Implements `Event` for a struct, including the
//!   ancestor chain the event bus uses for polymorphic dispatch
//!
//! Generated code refers to `::sakiko_core`, so the deriving crate must depend
//! on `sakiko-core` (directly or through the `sakiko` facade, which re-exports
//! it under that name).

mod event;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `sakiko_core::Event` for a struct.
///
/// # Root events
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Deserialize, BotEvent)]
/// #[root_event(platform = "onebot")]
/// pub struct OneBotEvent {
///     #[serde(skip)]
///     #[event(meta)]
///     pub meta: EventMeta,
///     #[event(self_id)]
///     pub self_id: i64,
///     #[serde(skip)]
///     #[event(raw_json)]
///     pub raw: Option<Arc<str>>,
/// }
/// ```
///
/// # Child events
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Deserialize, BotEvent)]
/// #[event(name = "message", type = "message")]
/// pub struct MessageEvent {
///     #[serde(flatten)]
///     #[event(parent)]
///     pub base: OneBotEvent,
///     #[event(message)]
///     pub message: OneBotMessage,
/// }
/// ```
///
/// A child event reports `MessageEvent` and every ancestor in
/// `Event::lineage`, can be viewed as any of them through `Event::ancestor`,
/// and derefs to its parent.
#[proc_macro_derive(BotEvent, attributes(event, root_event))]
pub fn derive_bot_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match event::derive_bot_event(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
