use rpc_junction::{build_app, config::Config, logging, methods, rpc::Dispatcher, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();
    logging::install_panic_hook();

    let config = Config::from_env()?;
    let registry = methods::build_registry()?;
    let method_names = registry.method_names().join(",");

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(Dispatcher::new(registry), &config);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        rpc_path = %config.rpc_path,
        methods = %method_names,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
