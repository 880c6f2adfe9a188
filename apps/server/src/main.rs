//! Lakegate server entrypoint.
//!
//! Wires settings, the provider client, the lifecycle controller, and
//! (when the managed resource is ready) the credential manager and
//! connection pool, then serves HTTP until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lakegate_core::{
    HttpProviderClient, HttpProviderConfig, ResourceProvider, ResourceSpec, Settings, TokenSource,
};
use lakegate_gateway::{
    auth_mode_from_settings, AppState, DbStack, GatewayConfig, GatewayServer, LifecycleController,
    PgConnectionFactory, PoolConfig, PostgresPool, ReadyProbe, RouteCapabilitySnapshot,
    ServiceCredentialManager, UserCredentialCache,
};

const PROVIDER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LIFECYCLE_POLL_INTERVAL: Duration = Duration::from_secs(15);

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("lakegate_core=debug".parse().expect("valid directive"))
            .add_directive("lakegate_gateway=debug".parse().expect("valid directive"))
    });

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Arc::new(Settings::from_env().context("failed to load settings")?);
    info!(
        "[Server] Starting lakegate v{} (instance {})",
        env!("CARGO_PKG_VERSION"),
        settings.instance_name
    );

    let provider = Arc::new(
        HttpProviderClient::new(HttpProviderConfig {
            base_url: settings.provider_base_url.clone(),
            api_token: settings.provider_api_token.clone(),
            instance_name: settings.instance_name.clone(),
            request_timeout: PROVIDER_REQUEST_TIMEOUT,
        })
        .context("failed to build provider client")?,
    );

    let lifecycle = Arc::new(LifecycleController::new(
        provider.clone() as Arc<dyn ResourceProvider>,
        ResourceSpec::new(settings.instance_name.clone()),
    ));
    lifecycle.bootstrap().await;

    let shutdown = CancellationToken::new();
    lifecycle.spawn_poll_task(LIFECYCLE_POLL_INTERVAL, shutdown.clone());

    // The capability snapshot decides which route groups exist for the
    // lifetime of this process.
    let probe = ReadyProbe::new(lifecycle.clone());
    let snapshot = RouteCapabilitySnapshot::capture(&probe).await;

    let db = if snapshot.orders_available {
        Some(build_db_stack(&settings, provider.clone(), &shutdown).await?)
    } else {
        warn!(
            "[Server] Managed resource not ready; starting degraded (provisioning routes only)"
        );
        None
    };

    let state = AppState::new(settings.clone(), lifecycle, db);
    let server = GatewayServer::new(
        GatewayConfig {
            host: settings.host.clone(),
            port: settings.port,
            enable_cors: true,
        },
        state,
        snapshot,
    );
    let server_handle = server.spawn(shutdown.clone());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("[Server] Shutdown signal received");
    shutdown.cancel();

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("[Server] Server exited with error: {}", e),
        Err(e) => warn!("[Server] Server task panicked: {}", e),
    }

    info!("[Server] Goodbye");
    Ok(())
}

/// Build the database-facing stack: service credential manager (with
/// its refresh task), the per-user cache, and the connection pool.
async fn build_db_stack(
    settings: &Arc<Settings>,
    provider: Arc<HttpProviderClient>,
    shutdown: &CancellationToken,
) -> anyhow::Result<Arc<DbStack>> {
    let credentials = ServiceCredentialManager::bootstrap(
        provider as Arc<dyn TokenSource>,
        settings.credential_lifetime,
    )
    .await
    .context("initial credential mint failed")?;
    credentials.spawn_refresh_task(settings.refresh_period(), shutdown.clone());

    let user_cache = Arc::new(UserCredentialCache::new(
        settings.user_cache_ttl,
        settings.user_cache_max_entries,
    ));
    user_cache.spawn_sweep_task(settings.user_cache_ttl, shutdown.clone());

    let factory = PgConnectionFactory::new(
        settings.database_host.clone(),
        settings.database_port,
        settings.database_name.clone(),
        settings.database_user.clone(),
    );
    let pool = Arc::new(PostgresPool::new(
        factory,
        PoolConfig {
            size: settings.pool_size,
            max_overflow: settings.max_overflow,
            checkout_timeout: settings.checkout_timeout,
            command_timeout: settings.command_timeout,
            recycle_interval: settings.recycle_interval,
        },
    ));

    let auth_mode = auth_mode_from_settings(settings);
    info!("[Server] Database stack ready (auth mode {:?})", auth_mode);

    Ok(Arc::new(DbStack {
        credentials,
        user_cache,
        pool,
        auth_mode,
    }))
}
