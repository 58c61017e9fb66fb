//! hearthd — the hearth home-automation controller daemon.
//!
//! Wires the pieces together: configuration, storage, the type catalogue,
//! the plugin host, the thing registry, the rule engine, the dispatcher's
//! control loop, the 1 Hz tick source, and the JSON-RPC boundary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hearth_events::NotificationBus;
use hearth_plugins::{HearthPlugin, HostTimeouts, PluginHost};
use hearth_rpc::RpcService;
use hearth_rules::RuleEngine;
use hearth_runtime::{Dispatcher, spawn_tick_source};
use hearth_storage::{FileStore, Store};
use hearth_things::ThingRegistry;
use hearth_types::TypeCatalogue;

#[derive(Debug, Parser)]
#[command(name = "hearthd", about = "hearth home-automation controller", version)]
struct Args {
    /// Path to a configuration file; replaces the user-level config.
    #[arg(short, long, env = "HEARTH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// The statically linked plugin set.
///
/// Protocol plugins live in their own crates and register here; a bare
/// build runs the core with an empty set, which is still useful for the
/// RPC surface and rules over virtual things.
fn builtin_plugins() -> Vec<Arc<dyn HearthPlugin>> {
    Vec::new()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = hearth_config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(data_dir) = args.data_dir {
        config.server.data_dir = Some(data_dir);
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("building log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let data_dir = hearth_config::resolve_data_dir(&config);
    info!(name = %config.server.name, data_dir = %data_dir.display(), "starting hearthd");

    let store: Arc<dyn Store> =
        Arc::new(FileStore::open(&data_dir).context("opening the data directory")?);
    let bus = NotificationBus::new();
    let host = Arc::new(PluginHost::with_timeouts(HostTimeouts {
        setup: std::time::Duration::from_secs(config.plugins.setup_timeout_secs),
        action: std::time::Duration::from_secs(config.plugins.action_timeout_secs),
    }));

    let mut catalogue = TypeCatalogue::new();
    let plugins = builtin_plugins();
    for plugin in &plugins {
        catalogue
            .register_plugin(plugin.metadata())
            .with_context(|| format!("loading metadata of plugin '{}'", plugin.metadata().name))?;
    }
    let catalogue = Arc::new(catalogue);
    if plugins.is_empty() {
        warn!("no plugins linked in; running the bare core");
    }
    for plugin in plugins {
        let config_params = Vec::new();
        host.register_plugin(plugin, config_params)
            .await
            .context("registering plugin")?;
    }

    let upstream_rx = host
        .take_upstream_receiver()
        .context("the plugin host's upstream channel was already taken")?;
    let registry = ThingRegistry::new(
        Arc::clone(&catalogue),
        Arc::clone(&host),
        Arc::clone(&store),
        bus.clone(),
    );
    let engine = RuleEngine::new(Arc::clone(&store), bus.clone());

    let mut dispatcher = Dispatcher::new(registry, engine, Arc::clone(&host), upstream_rx, bus.clone());
    dispatcher.load().await.context("replaying persisted state")?;
    let handle = dispatcher.handle();

    let shutdown = CancellationToken::new();
    let tick_task = spawn_tick_source(handle.clone(), shutdown.clone());
    let core_task = tokio::spawn(dispatcher.run());

    let mut rpc_server = None;
    if config.rpc.enabled {
        let module = RpcService::new(Arc::clone(&catalogue), handle.clone(), bus.clone())
            .into_module()
            .context("assembling the RPC module")?;
        let server = jsonrpsee::server::Server::builder()
            .build(&config.rpc.listen)
            .await
            .with_context(|| format!("binding RPC listener on {}", config.rpc.listen))?;
        info!(listen = %config.rpc.listen, "serving JSON-RPC");
        rpc_server = Some(server.start(module));
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");

    if let Some(server) = rpc_server {
        let _ = server.stop();
    }
    shutdown.cancel();
    let _ = tick_task.await;
    handle.shutdown();
    core_task.await.context("joining the dispatcher")?;

    info!("bye");
    Ok(())
}
