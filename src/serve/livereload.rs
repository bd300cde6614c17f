// src/serve/livereload.rs

//! Reload signalling: a server-sent-events endpoint, the page client that
//! listens to it, and the watcher that fires it.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::Stream;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use warp::sse::Event;
use warp::{Filter, Rejection, Reply};

use crate::watch::path_utils::relative_str;

pub const LIVERELOAD_PATH: &str = "__livereload";

const CLIENT: &str = "<script>(function(){var s=new EventSource(\"/__livereload\");\
s.addEventListener(\"reload\",function(){location.reload();});})();</script>";

/// Insert the reload client before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len() + CLIENT.len());
    match lower.rfind("</body>") {
        Some(idx) => {
            out.push_str(&html[..idx]);
            out.push_str(CLIENT);
            out.push_str(&html[idx..]);
        }
        None => {
            out.push_str(html);
            out.push_str(CLIENT);
        }
    }
    out
}

/// `GET /__livereload`: one `reload` event per broadcast.
pub fn events_route(
    reloads: broadcast::Sender<()>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path(LIVERELOAD_PATH)
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            let events = reload_events(reloads.subscribe());
            warp::sse::reply(warp::sse::keep_alive().stream(events))
        })
}

fn reload_events(rx: broadcast::Receiver<()>) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(()) => return Some((Ok(Event::default().event("reload").data("reload")), rx)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

/// Keeps the distribution watcher alive; dropping it stops watching.
pub struct ReloadWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl std::fmt::Debug for ReloadWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadWatcher").finish()
    }
}

/// Compile the live-reload globs (relative to the distribution root).
pub fn reload_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid live-reload pattern: {pattern}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Broadcast a reload whenever a debounced change below `dist` matches one
/// of `patterns`.
pub fn watch_dist(
    dist: &Path,
    patterns: &[String],
    debounce: Duration,
    reloads: broadcast::Sender<()>,
) -> Result<ReloadWatcher> {
    let set = reload_set(patterns)?;
    let root: PathBuf = dist.canonicalize().unwrap_or_else(|_| dist.to_path_buf());

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let _ = tx.send(events.into_iter().map(|e| e.path).collect());
        }
        Err(err) => warn!(error = %err, "distribution watch error"),
    })
    .context("creating distribution watcher")?;

    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;
    info!(root = ?root, "live reload watching distribution directory");

    tokio::spawn(async move {
        while let Some(paths) = rx.recv().await {
            let changed: Vec<String> = paths
                .iter()
                .filter_map(|p| relative_str(&root, p))
                .filter(|rel| set.is_match(rel))
                .collect();
            if changed.is_empty() {
                continue;
            }
            info!(?changed, "reloading connected browsers");
            if reloads.send(()).is_err() {
                debug!("no browser connected");
            }
        }
        debug!("live reload watcher finished");
    });

    Ok(ReloadWatcher {
        _debouncer: debouncer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_goes_before_the_closing_body() {
        let out = inject_client("<html><BODY><p>x</p></BODY></html>");
        assert!(out.ends_with(&format!("{CLIENT}</BODY></html>")));
    }

    #[test]
    fn client_is_appended_to_fragments() {
        assert_eq!(inject_client("<p>x</p>"), format!("<p>x</p>{CLIENT}"));
    }

    #[test]
    fn reload_set_stays_in_its_directory() {
        let set = reload_set(&["css/*.css".to_string(), "*.html".to_string()]).unwrap();
        assert!(set.is_match("css/site.css"));
        assert!(set.is_match("index.html"));
        assert!(!set.is_match("css/maps/site.css.map"));
        assert!(!set.is_match("docs/index.html"));
    }
}
