//! Main runtime orchestration.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sakiko_runtime::Sakiko;
//!
//! // Loads sakiko.toml from the current dir or the user config dir
//! let sakiko = Sakiko::builder().build()?;
//!
//! // Or start from an explicit file and profile
//! let sakiko = Sakiko::builder()
//!     .config_file("config/sakiko.toml")
//!     .profile("production")
//!     .build()?;
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! start: snowflake::install ─▶ plugins.before_start ─▶ bus.start
//!        ─▶ adapters.on_start ─▶ plugins.after_start
//! stop:  cancel shutdown token ─▶ adapters.on_shutdown (reverse)
//!        ─▶ plugins.unload_all ─▶ bus.stop
//! ```

use std::future::Future;
use std::path::Path;

use figment::Provider;
use parking_lot::Mutex;
use sakiko_core::{
    AdapterContext, BotRegistry, BoxedAdapter, ConfigurableAdapter, EventBus, SnowflakeError,
    snowflake,
};
use sakiko_framework::{BoxedPlugin, Plugin, PluginManager};
use tokio::signal;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, SakikoConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// The Sakiko runtime: wires adapters, plugins and the event bus together.
pub struct Sakiko {
    config: SakikoConfig,
    bus: EventBus,
    bots: BotRegistry,
    plugins: PluginManager,
    /// Adapters in registration order.
    adapters: RwLock<Vec<(String, BoxedAdapter)>>,
    /// Present while the runtime is running.
    shutdown: Mutex<Option<CancellationToken>>,
}

impl Sakiko {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging from `config.logging`; a subscriber installed
    /// earlier is kept.
    pub fn from_config(config: SakikoConfig) -> Self {
        logging::init_from_config(&config.logging);

        let bus = match config.bus.default_timeout() {
            Some(timeout) => EventBus::with_default_timeout(timeout),
            None => EventBus::new(),
        };
        let plugins = PluginManager::new(bus.clone(), config.plugins.clone());

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            default_timeout_ms = ?config.bus.default_timeout_ms,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            bus,
            bots: BotRegistry::new(),
            plugins,
            adapters: RwLock::new(Vec::new()),
            shutdown: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SakikoConfig {
        &self.config
    }

    /// The event bus. Matchers registered here outlive plugin unloads.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Bots currently connected through any adapter.
    pub fn bots(&self) -> &BotRegistry {
        &self.bots
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.lock().is_some()
    }

    /// Creates an adapter from its `adapters.<name>` config section and
    /// registers it.
    ///
    /// A missing section falls back to the adapter's default config.
    pub async fn register_adapter<A>(&self) -> RuntimeResult<()>
    where
        A: ConfigurableAdapter + 'static,
    {
        let adapter_name = A::name();

        let config: A::Config = match self.config.adapters.get(adapter_name) {
            Some(value) => value.deserialize().map_err(|e| {
                RuntimeError::AdapterConfigDeserialize {
                    adapter: adapter_name.to_string(),
                    reason: e.to_string(),
                }
            })?,
            None => {
                warn!(
                    adapter = adapter_name,
                    "No configuration found for adapter, using default"
                );
                A::Config::default()
            }
        };

        let adapter = A::from_config(config)?;
        self.add_adapter(adapter_name, adapter).await;
        Ok(())
    }

    /// Registers an adapter that was built by hand.
    ///
    /// An adapter registered under an existing name replaces it.
    pub async fn add_adapter(&self, name: impl Into<String>, adapter: BoxedAdapter) {
        let name = name.into();
        let mut adapters = self.adapters.write().await;
        match adapters.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => {
                warn!(adapter = %name, "Replacing previously registered adapter");
                slot.1 = adapter;
            }
            None => adapters.push((name.clone(), adapter)),
        }
        info!(adapter = %name, "Registered adapter");
    }

    pub async fn adapter_names(&self) -> Vec<String> {
        self.adapters
            .read()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Loads a plugin, running its `on_load` hook.
    pub async fn load_plugin<P: Plugin>(&self, plugin: P) -> RuntimeResult<()> {
        self.plugins.load(plugin).await?;
        Ok(())
    }

    /// Loads an already shared plugin.
    pub async fn load_shared_plugin(&self, plugin: BoxedPlugin) -> RuntimeResult<()> {
        self.plugins.load_shared(plugin).await?;
        Ok(())
    }

    /// Starts the runtime.
    ///
    /// Fails with [`RuntimeError::AlreadyRunning`] on a running runtime. An
    /// adapter that fails to start is logged and skipped.
    pub async fn start(&self) -> RuntimeResult<()> {
        let shutdown = {
            let mut state = self.shutdown.lock();
            if state.is_some() {
                return Err(RuntimeError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            *state = Some(token.clone());
            token
        };

        info!("Starting Sakiko runtime");

        if let Err(e) = self.prepare().await {
            *self.shutdown.lock() = None;
            return Err(e);
        }

        self.bus.start();

        let ctx = AdapterContext::new(self.bus.clone(), self.bots.clone(), shutdown);
        for (name, adapter) in self.adapters.read().await.iter() {
            match adapter.on_start(ctx.clone()).await {
                Ok(()) => info!(adapter = %name, "Adapter started"),
                Err(e) => error!(adapter = %name, error = %e, "Failed to start adapter"),
            }
        }

        self.plugins.after_start().await;

        info!(
            adapters = self.adapters.read().await.len(),
            plugins = self.plugins.len(),
            matchers = self.bus.matcher_count(),
            "Runtime started"
        );
        Ok(())
    }

    /// Steps that may still abort a start.
    async fn prepare(&self) -> RuntimeResult<()> {
        match snowflake::install(self.config.snowflake.clone()) {
            Ok(()) => debug!(
                worker_id = self.config.snowflake.worker_id,
                "Snowflake generator installed"
            ),
            Err(SnowflakeError::AlreadyInstalled) => warn!(
                "Snowflake generator was already initialized, keeping the existing one"
            ),
            Err(e) => return Err(e.into()),
        }

        self.plugins.before_start().await?;
        Ok(())
    }

    /// Stops the runtime, all adapters and all plugins.
    pub async fn stop(&self) -> RuntimeResult<()> {
        let Some(shutdown) = self.shutdown.lock().take() else {
            warn!("Runtime is not running");
            return Ok(());
        };

        info!("Stopping Sakiko runtime");
        shutdown.cancel();

        for (name, adapter) in self.adapters.read().await.iter().rev() {
            if let Err(e) = adapter.on_shutdown().await {
                error!(adapter = %name, error = %e, "Error during adapter shutdown");
            }
        }

        self.plugins.unload_all().await;
        self.bus.stop();

        info!("Runtime stopped");
        Ok(())
    }

    /// Runs until Ctrl+C (or SIGTERM on Unix).
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await?;
        info!("Sakiko is now running. Press Ctrl+C to stop.");

        let waited = wait_for_shutdown().await;
        self.stop().await?;
        waited
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.stop().await
    }
}

impl std::fmt::Debug for Sakiko {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sakiko")
            .field("bus", &self.bus)
            .field("bots", &self.bots.len())
            .field("plugins", &self.plugins)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`Sakiko`] runtime from layered configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges an override source on top of every other layer.
    pub fn merge<P: Provider>(mut self, provider: P) -> Self {
        self.config_loader = self.config_loader.merge(provider);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<Sakiko> {
        let config = self.config_loader.load()?;
        Ok(Sakiko::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
