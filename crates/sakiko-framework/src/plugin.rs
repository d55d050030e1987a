//! Plugin system.
//!
//! # Architecture
//!
//! A plugin is a value implementing [`Plugin`]. The [`PluginManager`] owns
//! every loaded plugin and drives its lifecycle:
//!
//! ```text
//! load ──▶ on_load ──▶ before_start ──▶ (bus running) ──▶ after_start
//!                                                             │
//! unload ◀── matchers unregistered ◀── on_unload ◀────────────┘
//! ```
//!
//! Matchers committed during a hook should be handed to
//! [`PluginContext::track`], so that unloading the plugin removes them from the
//! bus.
//!
//! # Configuration
//!
//! Each plugin sees its own section of the `plugins` config table:
//!
//! ```toml
//! [plugins.echo]
//! prefix = "/echo "
//! ```
//!
//! ```rust,ignore
//! #[derive(Deserialize, Default)]
//! #[serde(default)]
//! struct EchoConfig { prefix: String }
//!
//! #[async_trait]
//! impl Plugin for Echo {
//!     fn metadata(&self) -> PluginMetadata {
//!         PluginMetadata::new("echo")
//!     }
//!
//!     async fn on_load(&self, ctx: &PluginContext) -> PluginResult<()> {
//!         let cfg: EchoConfig = ctx.config()?;
//!         let registration = on::<MessageEvent>()
//!             .with(starts_with([cfg.prefix], true))
//!             .handle(echo)
//!             .commit(ctx.bus())
//!             .map_err(PluginError::other)?;
//!         ctx.track(registration);
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sakiko_core::{EventBus, Registration};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{PluginError, PluginResult};

// ============================================================================
// Metadata
// ============================================================================

/// Descriptive metadata attached to every plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Unique name; also the key of the plugin's config section.
    pub name: String,
    pub display_name: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            version: None,
            author: None,
            description: None,
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Display name if set, otherwise the name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

// ============================================================================
// Plugin trait
// ============================================================================

/// A unit of bot functionality.
///
/// Every hook has a no-op default; most plugins only implement
/// [`on_load`](Self::on_load).
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    fn metadata(&self) -> PluginMetadata;

    /// Called once when the plugin is loaded. Register matchers here.
    async fn on_load(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// Called when the plugin is unloaded, before its tracked matchers are
    /// removed.
    async fn on_unload(&self, _ctx: &PluginContext) {}

    /// Called by the runtime before the bus starts.
    async fn before_start(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// Called by the runtime once adapters are running.
    async fn after_start(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }
}

/// A shared plugin trait object.
pub type BoxedPlugin = Arc<dyn Plugin>;

// ============================================================================
// PluginContext
// ============================================================================

/// Handle a plugin receives in its hooks.
#[derive(Clone)]
pub struct PluginContext {
    name: Arc<str>,
    bus: EventBus,
    config: Arc<Value>,
    registrations: Arc<Mutex<Vec<Registration>>>,
}

impl PluginContext {
    pub(crate) fn new(name: &str, bus: EventBus, config: Value) -> Self {
        Self {
            name: Arc::from(name),
            bus,
            config: Arc::new(config),
            registrations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Name of the plugin this context belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Raw config section (`Value::Null` when absent).
    pub fn raw_config(&self) -> &Value {
        &self.config
    }

    /// Deserializes the plugin's config section.
    ///
    /// A missing section yields `T::default()`.
    pub fn config<T>(&self) -> PluginResult<T>
    where
        T: DeserializeOwned + Default,
    {
        if self.config.is_null() {
            return Ok(T::default());
        }
        T::deserialize(self.config.as_ref()).map_err(|source| PluginError::Config {
            plugin: self.name.to_string(),
            source,
        })
    }

    /// Ties a registration to this plugin's lifetime.
    pub fn track(&self, registration: Registration) {
        self.registrations.lock().push(registration);
    }

    /// Number of registrations currently tracked.
    pub fn tracked(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Unregisters every tracked matcher. Returns how many were removed.
    pub(crate) fn release(&self) -> usize {
        let registrations = std::mem::take(&mut *self.registrations.lock());
        registrations.iter().filter(|r| r.unregister()).count()
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .field("tracked", &self.tracked())
            .finish()
    }
}

// ============================================================================
// PluginManager
// ============================================================================

struct Loaded {
    plugin: BoxedPlugin,
    metadata: PluginMetadata,
    ctx: PluginContext,
}

/// Owns loaded plugins, in load order.
pub struct PluginManager {
    bus: EventBus,
    configs: HashMap<String, Value>,
    plugins: Mutex<Vec<Arc<Loaded>>>,
}

impl PluginManager {
    /// Creates a manager. `configs` maps plugin names to their config section.
    pub fn new(bus: EventBus, configs: HashMap<String, Value>) -> Self {
        Self {
            bus,
            configs,
            plugins: Mutex::new(Vec::new()),
        }
    }

    /// Loads a plugin and runs its `on_load` hook.
    ///
    /// Fails with [`PluginError::Duplicate`] if a plugin with the same name is
    /// already loaded. If `on_load` fails, anything it tracked is unregistered
    /// and the plugin is not kept.
    pub async fn load<P: Plugin>(&self, plugin: P) -> PluginResult<()> {
        self.load_shared(Arc::new(plugin)).await
    }

    /// Same as [`load`](Self::load) for an already shared plugin.
    pub async fn load_shared(&self, plugin: BoxedPlugin) -> PluginResult<()> {
        let metadata = plugin.metadata();
        let name = metadata.name.clone();

        if self.contains(&name) {
            return Err(PluginError::Duplicate { name });
        }

        let config = self.configs.get(&name).cloned().unwrap_or(Value::Null);
        let ctx = PluginContext::new(&name, self.bus.clone(), config);

        if let Err(err) = plugin.on_load(&ctx).await {
            let released = ctx.release();
            error!(plugin = %name, error = %err, released, "Plugin failed to load");
            return Err(hook_error(&name, "on_load", err));
        }

        let mut plugins = self.plugins.lock();
        // Checked again: another load may have finished while on_load ran.
        if plugins.iter().any(|p| p.metadata.name == name) {
            drop(plugins);
            ctx.release();
            return Err(PluginError::Duplicate { name });
        }

        info!(
            plugin = %metadata.label(),
            version = metadata.version.as_deref().unwrap_or("-"),
            matchers = ctx.tracked(),
            "Plugin loaded"
        );
        plugins.push(Arc::new(Loaded {
            plugin,
            metadata,
            ctx,
        }));
        Ok(())
    }

    /// Unloads one plugin: runs `on_unload`, then unregisters its matchers.
    pub async fn unload(&self, name: &str) -> PluginResult<()> {
        let loaded = {
            let mut plugins = self.plugins.lock();
            let index = plugins
                .iter()
                .position(|p| p.metadata.name == name)
                .ok_or_else(|| PluginError::NotLoaded {
                    name: name.to_string(),
                })?;
            plugins.remove(index)
        };
        Self::teardown(&loaded).await;
        Ok(())
    }

    /// Unloads every plugin, most recently loaded first.
    pub async fn unload_all(&self) {
        let drained: Vec<_> = std::mem::take(&mut *self.plugins.lock());
        for loaded in drained.iter().rev() {
            Self::teardown(loaded).await;
        }
    }

    async fn teardown(loaded: &Loaded) {
        loaded.plugin.on_unload(&loaded.ctx).await;
        let released = loaded.ctx.release();
        info!(plugin = %loaded.metadata.label(), released, "Plugin unloaded");
    }

    /// Runs every plugin's `before_start` hook in load order.
    ///
    /// Stops at the first failure.
    pub async fn before_start(&self) -> PluginResult<()> {
        for loaded in self.snapshot() {
            debug!(plugin = %loaded.metadata.name, "before_start");
            loaded
                .plugin
                .before_start(&loaded.ctx)
                .await
                .map_err(|err| hook_error(&loaded.metadata.name, "before_start", err))?;
        }
        Ok(())
    }

    /// Runs every plugin's `after_start` hook in load order.
    ///
    /// A failure is logged and does not stop the remaining hooks.
    pub async fn after_start(&self) {
        for loaded in self.snapshot() {
            if let Err(err) = loaded.plugin.after_start(&loaded.ctx).await {
                warn!(plugin = %loaded.metadata.name, error = %err, "after_start failed");
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.lock().iter().any(|p| p.metadata.name == name)
    }

    /// Loaded plugin names, in load order.
    pub fn names(&self) -> Vec<String> {
        self.plugins
            .lock()
            .iter()
            .map(|p| p.metadata.name.clone())
            .collect()
    }

    /// Metadata of every loaded plugin, in load order.
    pub fn metadata(&self) -> Vec<PluginMetadata> {
        self.plugins
            .lock()
            .iter()
            .map(|p| p.metadata.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<Loaded>> {
        self.plugins.lock().clone()
    }
}

fn hook_error(plugin: &str, hook: &'static str, err: PluginError) -> PluginError {
    match err {
        PluginError::Other(source) => PluginError::Hook {
            plugin: plugin.to_string(),
            hook,
            source,
        },
        other => other,
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::starts_with;
    use crate::testing::{MockBot, TextEvent, text_message};
    use sakiko_core::on;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct GreeterConfig {
        prefix: String,
        times: u32,
    }

    struct Greeter {
        name: &'static str,
        hits: Arc<AtomicUsize>,
        unloaded: Arc<AtomicUsize>,
    }

    impl Greeter {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                hits: Arc::new(AtomicUsize::new(0)),
                unloaded: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Plugin for Greeter {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new(self.name).version("0.1.0")
        }

        async fn on_load(&self, ctx: &PluginContext) -> PluginResult<()> {
            let cfg: GreeterConfig = ctx.config()?;
            let prefix = if cfg.prefix.is_empty() {
                "/hi".to_string()
            } else {
                cfg.prefix
            };
            let hits = Arc::clone(&self.hits);
            let registration = on::<TextEvent>()
                .with(starts_with([prefix], true))
                .handle(move |_| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .commit(ctx.bus())
                .map_err(PluginError::other)?;
            ctx.track(registration);
            Ok(())
        }

        async fn on_unload(&self, _ctx: &PluginContext) {
            self.unloaded.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Broken;

    #[async_trait]
    impl Plugin for Broken {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new("broken")
        }

        async fn on_load(&self, ctx: &PluginContext) -> PluginResult<()> {
            let registration = on::<TextEvent>()
                .handle(|_| async {})
                .commit(ctx.bus())
                .map_err(PluginError::other)?;
            ctx.track(registration);
            Err(PluginError::other("database unavailable"))
        }
    }

    #[tokio::test]
    async fn test_load_registers_and_unload_removes() {
        let bus = EventBus::new();
        bus.start();
        let manager = PluginManager::new(bus.clone(), HashMap::new());
        let greeter = Greeter::new("greeter");
        let hits = Arc::clone(&greeter.hits);
        let unloaded = Arc::clone(&greeter.unloaded);

        manager.load(greeter).await.unwrap();
        assert_eq!(bus.matcher_count(), 1);

        bus.publish(MockBot::boxed("1"), text_message("/hi there")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        manager.unload("greeter").await.unwrap();
        assert_eq!(bus.matcher_count(), 0);
        assert_eq!(unloaded.load(Ordering::SeqCst), 1);
        assert!(matches!(
            manager.unload("greeter").await,
            Err(PluginError::NotLoaded { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let bus = EventBus::new();
        let manager = PluginManager::new(bus.clone(), HashMap::new());

        manager.load(Greeter::new("same")).await.unwrap();
        let err = manager.load(Greeter::new("same")).await.unwrap_err();

        assert!(matches!(err, PluginError::Duplicate { ref name } if name == "same"));
        assert_eq!(manager.len(), 1);
        assert_eq!(bus.matcher_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_releases_registrations() {
        let bus = EventBus::new();
        let manager = PluginManager::new(bus.clone(), HashMap::new());

        let err = manager.load(Broken).await.unwrap_err();

        assert!(matches!(err, PluginError::Hook { hook: "on_load", .. }));
        assert!(err.to_string().contains("database unavailable"));
        assert!(manager.is_empty());
        assert_eq!(bus.matcher_count(), 0);
    }

    #[tokio::test]
    async fn test_config_section_is_passed() {
        let bus = EventBus::new();
        bus.start();
        let configs = HashMap::from([(
            "greeter".to_string(),
            json!({ "prefix": "!hello", "times": 2 }),
        )]);
        let manager = PluginManager::new(bus.clone(), configs);
        let greeter = Greeter::new("greeter");
        let hits = Arc::clone(&greeter.hits);
        manager.load(greeter).await.unwrap();

        bus.publish(MockBot::boxed("1"), text_message("/hi")).await;
        bus.publish(MockBot::boxed("1"), text_message("!hello")).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_config_shape_errors() {
        let ctx = PluginContext::new("p", EventBus::new(), json!({ "times": "many" }));
        let err = ctx.config::<GreeterConfig>().unwrap_err();
        assert!(matches!(err, PluginError::Config { ref plugin, .. } if plugin == "p"));

        let empty = PluginContext::new("p", EventBus::new(), Value::Null);
        let cfg: GreeterConfig = empty.config().unwrap();
        assert_eq!(cfg.times, 0);
    }

    #[tokio::test]
    async fn test_unload_all_runs_in_reverse_order() {
        struct Recorder {
            name: &'static str,
            order: Arc<Mutex<Vec<&'static str>>>,
        }

        #[async_trait]
        impl Plugin for Recorder {
            fn metadata(&self) -> PluginMetadata {
                PluginMetadata::new(self.name)
            }

            async fn on_unload(&self, _ctx: &PluginContext) {
                self.order.lock().push(self.name);
            }
        }

        let order = Arc::new(Mutex::new(Vec::new()));
        let manager = PluginManager::new(EventBus::new(), HashMap::new());
        for name in ["a", "b", "c"] {
            manager
                .load(Recorder {
                    name,
                    order: Arc::clone(&order),
                })
                .await
                .unwrap();
        }
        assert_eq!(manager.names(), vec!["a", "b", "c"]);

        manager.unload_all().await;

        assert_eq!(*order.lock(), vec!["c", "b", "a"]);
        assert!(manager.is_empty());
    }
}
