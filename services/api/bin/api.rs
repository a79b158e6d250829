//! Main Entrypoint for the Tutor API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the model client and command resolver.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tutor_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use tutor_core::{
    controller::ControllerConfig,
    llm_client::{GEMINI_BASE_URL, GeminiClient, LLMClient, OPENAI_BASE_URL, OpenAICompatibleClient},
    resolver::{CommandResolver, FallbackCommandResolver, LLMCommandResolver},
};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompt overrides from a directory.
///
/// A missing directory is not an error; the built-in prompts are used instead.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    if !prompts_path.is_dir() {
        warn!(path = %prompts_path.display(), "Prompts directory not found; using built-in prompts.");
        return Ok(prompts);
    }
    for entry in std::fs::read_dir(prompts_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

fn build_llm_client(config: &Config) -> anyhow::Result<Arc<dyn LLMClient>> {
    let client: Arc<dyn LLMClient> = match config.provider {
        Provider::Gemini => {
            info!("Using Gemini provider.");
            let base_url = config.llm_base_url.as_deref().unwrap_or(GEMINI_BASE_URL);
            Arc::new(
                GeminiClient::new(config.chat_model.clone(), config.llm_timeout)?
                    .with_base_url(base_url),
            )
        }
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let base_url = config.llm_base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            Arc::new(OpenAICompatibleClient::new(
                base_url,
                config.chat_model.clone(),
                config.llm_timeout,
            )?)
        }
    };
    Ok(client)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let resolver: Arc<dyn CommandResolver> = match config.credential() {
        Some(_) => {
            let prompts = load_prompts(&config.prompts_path)?;
            Arc::new(LLMCommandResolver::new(build_llm_client(&config)?, prompts))
        }
        None => {
            warn!("No API key configured; serving rule-based tutorials only.");
            Arc::new(FallbackCommandResolver)
        }
    };

    let app_state = Arc::new(AppState {
        resolver,
        controller_config: ControllerConfig {
            credential: config.credential().unwrap_or_default().to_string(),
            completion_delay: config.completion_delay,
            voice_guidance: config.voice_guidance,
        },
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
