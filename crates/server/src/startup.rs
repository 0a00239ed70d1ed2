use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, auth};
use service::{
    access::AccessGate,
    branding::BrandingService,
    runtime,
    uploads::{LocalLogoStorage, LogoStorage, UploadPolicy},
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Open the documents and the logo store described by `cfg`.
pub async fn build_state(cfg: &AppConfig) -> Result<auth::ServerState, StartupError> {
    if cfg.auth.admin_email.trim().is_empty() {
        return Err(StartupError::InvalidConfig("auth.admin_email is empty".into()));
    }
    let gate = AccessGate::new(&cfg.auth.admin_email);
    let branding = BrandingService::open(
        cfg.storage.submissions_path(),
        cfg.storage.current_logo_path(),
        gate,
    )
    .await?;

    let policy = UploadPolicy::new(cfg.uploads.allowed_types.clone(), cfg.uploads.max_bytes);
    let logos = LocalLogoStorage::new(&cfg.uploads.dir, &cfg.uploads.public_prefix, policy).await?;
    let logos: Arc<dyn LogoStorage> = logos;

    Ok(auth::ServerState {
        branding: Arc::new(branding),
        logos,
        auth: auth::ServerAuthConfig { jwt_secret: cfg.auth.jwt_secret.clone() },
        uploads: auth::UploadSettings {
            dir: PathBuf::from(&cfg.uploads.dir),
            public_prefix: cfg.uploads.public_prefix.clone(),
            max_bytes: cfg.uploads.max_bytes,
        },
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Public entry: load configuration, build the app and run the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::load_and_validate()?;
    run_with_config(cfg).await
}

/// Build the app from an already validated configuration and serve it until Ctrl+C.
pub async fn run_with_config(cfg: AppConfig) -> anyhow::Result<()> {
    runtime::ensure_env(&cfg.storage.data_dir, &cfg.uploads.dir).await?;
    if cfg.auth.uses_default_secret() {
        warn!("auth.jwt_secret is the development default; set JWT_SECRET in production");
    }

    let state = build_state(&cfg).await?;
    info!(
        admin = %cfg.auth.admin_email,
        submissions = %cfg.storage.submissions_path().display(),
        current_logo = %cfg.storage.current_logo_path().display(),
        uploads = %cfg.uploads.dir,
        "branding state ready"
    );

    let app: Router = routes::build_router(state, build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
