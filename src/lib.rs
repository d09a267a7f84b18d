use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod methods;
pub mod rpc;

use config::Config;
use rpc::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub rpc_path: Arc<str>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, config: &Config) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            rpc_path: Arc::<str>::from(config.rpc_path.as_str()),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let rpc = Router::new()
        .route(&state.rpc_path, post(http::handlers::rpc_endpoint))
        .layer(DefaultBodyLimit::max(state.max_body_bytes));

    Router::new()
        .route("/health", get(http::handlers::health))
        .merge(rpc)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
