use std::{process, sync::Arc};

use postcache::{
    application::{
        admin::AdminService,
        auth::{AccountPolicy, AuthService},
        error::AppError,
        posts::PostService,
    },
    cache::{
        CacheBackendKind, CacheConfig, CacheState, CacheStore, MemoryCacheStore, RedisCacheStore,
    },
    config,
    infra::{
        auth::JwtCodec,
        error::InfraError,
        http::{self, ApiState},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_api_state(&settings)?;
    serve_http(&settings, state).await
}

fn build_cache_store(cache: &CacheConfig) -> Result<Arc<dyn CacheStore>, AppError> {
    match cache.backend {
        CacheBackendKind::Memory => Ok(Arc::new(MemoryCacheStore::new())),
        CacheBackendKind::Redis => {
            let url = cache.redis_url.as_deref().ok_or_else(|| {
                AppError::from(InfraError::configuration(
                    "cache.redis_url is required for the redis backend",
                ))
            })?;
            let store = RedisCacheStore::connect(url)
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
            Ok(Arc::new(store))
        }
    }
}

fn build_api_state(settings: &config::Settings) -> Result<ApiState, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = build_cache_store(&cache_config)?;
    let cache = CacheState::new(&cache_config, store);

    info!(
        enabled = cache_config.enabled,
        backend = cache_config.backend.as_str(),
        ttl_seconds = cache_config.effective_ttl(),
        key_scope = cache_config.key_policy.as_str(),
        "cache configured"
    );

    let repositories = Arc::new(InMemoryRepositories::new());
    let tokens = Arc::new(JwtCodec::new(
        &settings.auth.jwt_secret,
        settings.auth.issuer.clone(),
        settings.auth.token_ttl_seconds.get(),
    ));
    let policy = AccountPolicy {
        default_role: settings.auth.default_role.clone(),
        first_user_admin: settings.auth.first_user_admin,
    };

    let auth = AuthService::new(
        repositories.clone(),
        repositories.clone(),
        tokens,
        cache.clone(),
        policy,
    );
    let posts = PostService::new(repositories.clone(), cache.clone());
    let admin = AdminService::new(repositories.clone(), repositories, cache);

    Ok(ApiState {
        auth: Arc::new(auth),
        posts: Arc::new(posts),
        admin: Arc::new(admin),
    })
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let stopping = Arc::new(Notify::new());
    let signal = stopping.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            signal.notify_one();
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_seconds = grace.as_secs(), "graceful shutdown timed out");
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => error!(error = %err, "failed to listen for shutdown signal"),
    }
}
