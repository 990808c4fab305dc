use anyhow::Context;

use email_triage::api::{AppState, api_routes};
use email_triage::config::AppConfig;
use email_triage::llm::create_provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export GEMINI_API_KEY=...");
        std::process::exit(1);
    });

    let addr = config.server.addr();
    eprintln!("📬 Email Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Classify: http://{addr}/classify");
    eprintln!("   Regenerate: http://{addr}/regenerate-suggestion");
    match &config.server.allowed_origins {
        Some(origins) => eprintln!("   CORS: {}", origins.join(", ")),
        None => eprintln!("   CORS: any origin"),
    }

    let llm = create_provider(&config.llm)?;
    let state = AppState::new(llm).with_pdf_timeout(config.server.pdf_timeout);
    let app = api_routes(state, &config.server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Email triage server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
