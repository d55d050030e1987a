//! Live bot registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::bot::BoxedBot;

/// Tracks the bots currently connected, keyed by `self_id`.
///
/// Shared between the runtime and every adapter; cloning shares the same map.
#[derive(Clone, Default)]
pub struct BotRegistry {
    bots: Arc<RwLock<HashMap<String, BoxedBot>>>,
}

impl BotRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bot, replacing (and returning) any bot with the same id.
    pub fn add(&self, bot: BoxedBot) -> Option<BoxedBot> {
        let id = bot.self_id().to_string();
        let previous = self.bots.write().insert(id.clone(), bot);
        if previous.is_some() {
            warn!(bot_id = %id, "Bot reconnected, replacing previous instance");
        } else {
            debug!(bot_id = %id, "Bot added");
        }
        previous
    }

    /// Removes a bot by id.
    pub fn remove(&self, self_id: &str) -> Option<BoxedBot> {
        let removed = self.bots.write().remove(self_id);
        if removed.is_some() {
            debug!(bot_id = %self_id, "Bot removed");
        }
        removed
    }

    /// Removes a bot only if the registered instance is `bot` itself.
    ///
    /// Used on disconnect, so that a stale connection closing late does not
    /// evict the bot of a newer connection with the same account.
    pub fn remove_instance(&self, bot: &BoxedBot) -> bool {
        let mut bots = self.bots.write();
        match bots.get(bot.self_id()) {
            Some(current) if Arc::ptr_eq(current, bot) => {
                bots.remove(bot.self_id());
                debug!(bot_id = %bot.self_id(), "Bot removed");
                true
            }
            _ => false,
        }
    }

    /// Returns the bot with the given id.
    pub fn get(&self, self_id: &str) -> Option<BoxedBot> {
        self.bots.read().get(self_id).cloned()
    }

    /// Returns all connected bots.
    pub fn list(&self) -> Vec<BoxedBot> {
        self.bots.read().values().cloned().collect()
    }

    /// Number of connected bots.
    pub fn len(&self) -> usize {
        self.bots.read().len()
    }

    /// Returns `true` if no bot is connected.
    pub fn is_empty(&self) -> bool {
        self.bots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBot;

    #[test]
    fn test_add_get_remove() {
        let registry = BotRegistry::new();
        assert!(registry.add(MockBot::boxed("1")).is_none());
        assert!(registry.add(MockBot::boxed("2")).is_none());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("1").map(|b| b.self_id().to_string()), Some("1".into()));

        assert!(registry.remove("1").is_some());
        assert!(registry.remove("1").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_instance_ignores_stale_bot() {
        let registry = BotRegistry::new();
        let old = MockBot::boxed("7");
        let new = MockBot::boxed("7");

        registry.add(old.clone());
        assert!(registry.add(new.clone()).is_some());

        assert!(!registry.remove_instance(&old));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove_instance(&new));
        assert!(registry.is_empty());
    }
}
