//! Action server - starts a background action and serves a refresh-polled
//! progress page.

mod model;
mod render;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use actionbuf::io::config::load_config;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "actionbuf-ui")]
#[command(about = "Run an action in the background and watch it by page refresh")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "1340")]
    port: u16,

    /// Config file (TOML). Defaults apply when it does not exist.
    #[arg(long, default_value = "actionbuf.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    actionbuf::logging::init("warn,actionbuf=info,actionbuf_ui=info")?;

    let args = Args::parse();

    let config = load_config(&args.config)?;
    info!(
        config = %args.config.display(),
        refresh_secs = config.refresh_secs,
        display_url = %config.display_url,
        action_timeout_secs = ?config.action_timeout_secs,
        "starting actionbuf-ui"
    );

    let display_url = config.display_url.clone();
    let state = AppState::new(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::page_router(&display_url))
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("parse bind address {}:{}", args.bind, args.port))?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app).await.context("serve http")?;

    Ok(())
}
