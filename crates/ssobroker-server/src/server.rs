use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use ssobroker_auth::{
    JwtTokenSigner, StaticIdentityVerifier, TokenExchanger, UuidV7CodeGenerator,
};
use ssobroker_store::{DynSessionStore, InMemorySessionStore, spawn_sweeper};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    config::AppConfig,
    handlers::{self, api, browser, rpc},
    state::AppState,
};

pub struct SsoBrokerServer {
    addr: SocketAddr,
    app: Router,
    shutdown: CancellationToken,
    sweeper: JoinHandle<()>,
}

pub fn build_app(state: AppState, body_limit: usize) -> Router {
    let prefix = state.url_prefix.to_string();
    Router::new()
        // Browser sign-in
        .route(&format!("{prefix}/"), get(browser::index))
        .route(&format!("{prefix}/login"), post(browser::login))
        .route(&format!("{prefix}/logout"), get(browser::logout))
        // Application API
        .route("/api/login", post(api::login))
        .route("/api/refresh", post(api::refresh))
        // Service-to-service
        .route("/rpc/logout", post(rpc::logout))
        .route("/healthz", get(handlers::healthz))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            // Path only: query strings may carry redirect targets.
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.path = %req.uri().path(),
                                http.status_code = Empty,
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Wires the exchange engine and starts the store sweeper.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> anyhow::Result<SsoBrokerServer> {
        let cfg = self.config;

        let verifier = StaticIdentityVerifier::new(cfg.users.clone())?;
        if verifier.user_count() == 0 {
            tracing::warn!("No users configured; every login will be rejected");
        }
        let signer = JwtTokenSigner::from_config(&cfg.broker.signing)?;

        let store: DynSessionStore = Arc::new(InMemorySessionStore::new());
        let shutdown = CancellationToken::new();
        let sweeper = spawn_sweeper(
            store.clone(),
            cfg.broker.store.sweep_interval,
            shutdown.clone(),
        );

        let exchanger = TokenExchanger::new(
            store,
            Arc::new(UuidV7CodeGenerator::new()),
            Arc::new(verifier),
            Arc::new(signer),
            cfg.broker.session.clone(),
        );
        let state = AppState::new(exchanger, &cfg);

        Ok(SsoBrokerServer {
            addr: cfg.addr(),
            app: build_app(state, cfg.server.body_limit_bytes),
            shutdown,
            sweeper,
        })
    }
}

impl SsoBrokerServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        self.shutdown.cancel();
        if let Err(e) = self.sweeper.await {
            tracing::warn!(error = %e, "Session sweeper did not stop cleanly");
        }
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
