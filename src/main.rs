use tracing_subscriber::EnvFilter;

use order_gateway::api::{app_with_state, AppState};
use order_gateway::config::GatewayConfig;

#[tokio::main]
async fn main() {
    let config = GatewayConfig::from_env();
    let default_filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {addr}: {err}"));

    println!("HTTP server running on http://{addr}");
    println!("Abre esa URL en el navegador para usar el formulario.");
    axum::serve(listener, app_with_state(AppState::new(&config)))
        .await
        .expect("server error");
}
