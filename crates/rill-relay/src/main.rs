//! rill-relay: streaming chat relay server
//!
//! Accepts chat requests over HTTP and forwards the upstream model stream to
//! the client increment by increment, without buffering the full response.

mod api;
mod config;

use axum::http::{Method, header};
use clap::Parser;
use rill_ai::providers::openai::OpenAIUpstream;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use api::AppState;
use config::RelayConfig;

/// rill-relay - streaming chat relay
#[derive(Parser, Debug)]
#[command(name = "rill-relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on (default 127.0.0.1:3000, or RILL_RELAY_BIND)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rill_relay=debug".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = RelayConfig::from_env(args.bind)?;

    let upstream =
        OpenAIUpstream::new(config.api_key).with_base_url(config.upstream_base_url.clone());
    let state = Arc::new(AppState {
        upstream: Arc::new(upstream),
    });

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = api::router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(
        upstream = %config.upstream_base_url,
        "rill relay listening on http://{}",
        config.bind
    );

    axum::serve(listener, app).await?;
    Ok(())
}
