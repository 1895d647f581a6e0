use dotenvy::dotenv;
use scoresection::config::ServerConfig;
use scoresection::server::{self, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    let config = ServerConfig::from_env();
    let state = AppState::from_config(&config);
    if !state.score_path.is_file() {
        warn!(path = %state.score_path.display(), "score file not found; /section.xml will fail");
    }

    let app = server::router(state);

    let addr = config.addr();
    info!("listening on http://{}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
