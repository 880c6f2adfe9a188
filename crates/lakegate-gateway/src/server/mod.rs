//! Axum HTTP server: router assembly and serving.
//!
//! The router is built once at startup from a capability snapshot; the
//! orders group is merged in only when the managed resource was ready
//! at that point. Health and provisioning routes are always mounted.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lakegate_core::GatewayError;

mod auth_headers;
mod error;
mod handlers;
mod middleware_timing;
mod orders;
mod registry;
mod state;

pub use auth_headers::ForwardedIdentity;
pub use error::{ApiError, ApiResult};
pub use registry::{CapabilityProbe, ReadyProbe, RouteCapabilitySnapshot};
pub use state::{AppState, AuthMode, DbStack, OrdersState};

/// Bind address and transport options for the HTTP server.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl GatewayConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct GatewayServer {
    config: GatewayConfig,
    state: AppState,
    snapshot: RouteCapabilitySnapshot,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, state: AppState, snapshot: RouteCapabilitySnapshot) -> Self {
        Self {
            config,
            state,
            snapshot,
        }
    }

    /// Assemble the full router. Pure function of the state and the
    /// capability snapshot, so tests can drive it without a listener.
    pub fn build_router(state: AppState, snapshot: RouteCapabilitySnapshot) -> Router {
        let mut api = Router::new()
            .route("/healthcheck", get(handlers::healthcheck))
            .route(
                "/resources",
                post(handlers::create_resources).delete(handlers::delete_resources),
            )
            .route("/resources/status", get(handlers::resource_status))
            .with_state(state.clone());

        match (&state.db, snapshot.orders_available) {
            (Some(db), true) => {
                info!("[Gateway] Orders endpoints mounted");
                let orders_state = OrdersState {
                    settings: state.settings.clone(),
                    db: db.clone(),
                };
                api = api.merge(Self::orders_router(orders_state));
            }
            _ => {
                warn!(
                    "[Gateway] Orders endpoints not mounted; resource unavailable at startup"
                );
            }
        }

        Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health))
            .nest("/api/v1", api)
            .layer(middleware::from_fn(
                middleware_timing::process_time_middleware,
            ))
            .layer(TraceLayer::new_for_http())
    }

    fn orders_router(state: OrdersState) -> Router {
        Router::new()
            .route("/orders/count", get(orders::count))
            .route("/orders/sample", get(orders::sample))
            .route("/orders/pages", get(orders::pages))
            .route("/orders/stream", get(orders::stream))
            .route("/orders/{order_key}", get(orders::get_order))
            .route("/orders/{order_key}/status", post(orders::update_status))
            .with_state(state)
    }

    /// Bind and serve until the cancellation token fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), GatewayError> {
        let mut router = Self::build_router(self.state, self.snapshot);
        if self.config.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayError::Server(format!("failed to bind {}: {}", addr, e)))?;
        let local: SocketAddr = listener
            .local_addr()
            .map_err(|e| GatewayError::Server(format!("listener address unavailable: {}", e)))?;
        info!("[Gateway] Listening on http://{}", local);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;

        info!("[Gateway] Server stopped");
        Ok(())
    }

    /// Serve on a background task; the handle resolves when the server
    /// exits.
    pub fn spawn(
        self,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<Result<(), GatewayError>> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Convenience for wiring the per-user trust model from settings.
pub fn auth_mode_from_settings(settings: &lakegate_core::Settings) -> AuthMode {
    if settings.user_based_authentication {
        AuthMode::PerUser
    } else {
        AuthMode::AppLevel
    }
}

impl AppState {
    pub fn new(
        settings: Arc<lakegate_core::Settings>,
        lifecycle: Arc<crate::lifecycle::LifecycleController>,
        db: Option<Arc<DbStack>>,
    ) -> Self {
        Self {
            settings,
            lifecycle,
            db,
        }
    }
}
