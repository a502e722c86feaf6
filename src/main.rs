mod config;
mod error;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal in production.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env()?;
    let state = state::AppState::new(config);
    state.uploads.prepare().await?;

    let port = state.config.port;
    let app = routes::app(state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(
        %port,
        client_url = state.config.client_url(),
        upload_dir = %state.uploads.dir().display(),
        "menumaven listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
