//! Application startup and lifecycle management.

use crate::config::AssistantConfig;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::unconfigured::UnconfiguredTextProvider;
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::ModelClient;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AssistantConfig>,
    pub model_client: ModelClient,
    /// Fired on shutdown; pending model backoffs stop waiting.
    pub shutdown: CancellationToken,
}

/// Pick the text provider for this configuration.
///
/// Without an API key the service still starts, but every model-backed
/// endpoint fails until a key is provided.
pub fn build_text_provider(config: &AssistantConfig) -> Result<Arc<dyn TextProvider>, AppError> {
    let Some(api_key) = config.google.api_key.clone() else {
        tracing::warn!("GOOGLE_API_KEY not set, model-backed endpoints are disabled");
        return Ok(Arc::new(UnconfiguredTextProvider::new(
            "GOOGLE_API_KEY is not set",
        )));
    };

    let mut gemini_config = GeminiConfig::new(api_key, config.model.text_model.clone());
    gemini_config.api_base = config.google.api_base.clone();
    gemini_config.params = GenerationParams {
        temperature: config.model.temperature,
        max_tokens: config.model.max_output_tokens,
    };

    let provider = GeminiTextProvider::new(gemini_config).map_err(|e| {
        tracing::error!("Failed to initialize Gemini provider: {}", e);
        AppError::InternalError(anyhow::anyhow!("Failed to initialize Gemini provider: {}", e))
    })?;

    tracing::info!(
        model = %config.model.text_model,
        "Initialized Gemini text provider"
    );

    Ok(Arc::new(provider))
}

fn cors_layer(config: &AssistantConfig) -> CorsLayer {
    let allow_origin = if config.cors.allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                    .ok()
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    AppError::InternalError(anyhow::anyhow!("handler panicked")).into_response()
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health_check))
        .route("/api/ready", get(handlers::readiness_check))
        .route("/api/chat", post(handlers::chat))
        .route("/api/summarize", post(handlers::summarize))
        .route("/api/tip", get(handlers::tip).post(handlers::tip))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(from_fn(http_metrics_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(cors)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the provider selected from the configuration.
    pub async fn build(config: AssistantConfig) -> Result<Self, AppError> {
        let provider = build_text_provider(&config)?;
        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: AssistantConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let policy = config.retry_policy();
        tracing::info!(
            max_attempts = policy.max_attempts,
            initial_delay_ms = policy.initial_delay.as_millis() as u64,
            max_delay_ms = policy.max_delay.as_millis() as u64,
            "Model retry policy"
        );

        let model_client =
            ModelClient::new(provider, policy).with_timeout(config.model.request_timeout);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let state = AppState {
            config: Arc::new(config),
            model_client,
            shutdown: CancellationToken::new(),
        };

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until the process is killed.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the application until `signal` resolves, then drain in-flight requests.
    pub async fn run_with_shutdown<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.state.shutdown.clone();
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                signal.await;
                shutdown.cancel();
            })
            .await
    }
}
