// src/serve/mod.rs

//! Development server for the distribution directory.
//!
//! Static files come straight from disk; HTML pages get a small client that
//! listens on [`livereload::LIVERELOAD_PATH`] and reloads the page whenever
//! a file matching `[serve].files` changes below the distribution root.

pub mod livereload;
pub mod files;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::sync::{broadcast, oneshot};
use tracing::info;
use warp::Filter;

use crate::config::OutputCategory;
use crate::tasks::TaskContext;

/// Resolve `host:port`, accepting names as well as literal addresses.
pub async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("resolving {host}:{port}"))?
        .next()
        .ok_or_else(|| anyhow!("{host}:{port} did not resolve to any address"))
}

/// Serve until `stop` fires (or its sender is dropped).
///
/// The bound address is sent on `ready` once the listener is up.
pub async fn run(
    ctx: Arc<TaskContext>,
    ready: oneshot::Sender<SocketAddr>,
    stop: oneshot::Receiver<()>,
) -> Result<()> {
    let section = &ctx.config.serve;
    let dist = ctx.paths.output_abs(OutputCategory::Root);
    tokio::fs::create_dir_all(&dist)
        .await
        .with_context(|| format!("creating {:?}", dist))?;

    let (reloads, _) = broadcast::channel::<()>(16);
    let debounce = Duration::from_millis(ctx.config.config.debounce_ms);
    let _watcher = livereload::watch_dist(&dist, ctx.paths.serve_files(), debounce, reloads.clone())?;

    let routes = livereload::events_route(reloads)
        .or(files::route(Arc::new(dist.clone())))
        .with(warp::trace::request());

    let addr = resolve_addr(&section.host, section.port).await?;
    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = stop.await;
        })
        .with_context(|| format!("binding dev server to {addr}"))?;

    info!(addr = %bound, root = ?dist, "serving distribution directory");
    let _ = ready.send(bound);

    server.await;
    info!("dev server shut down");
    Ok(())
}
