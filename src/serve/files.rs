// src/serve/files.rs

//! Static file responses with live-reload injection for HTML.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use warp::http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderValue};
use warp::hyper::Body;
use warp::path::Tail;
use warp::reply::Response;
use warp::{Filter, Rejection};

use super::livereload::inject_client;

pub fn route(root: Arc<PathBuf>) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::get()
        .and(warp::path::tail())
        .and_then(move |tail: Tail| {
            let root = Arc::clone(&root);
            async move { serve_path(&root, tail.as_str()).await }
        })
}

/// Map a request tail onto a file below `root`.
///
/// Directory requests get their `index.html`; anything that would leave
/// the root is refused.
pub fn request_path(root: &Path, tail: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in tail.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment == "." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }
    if tail.is_empty() || tail.ends_with('/') {
        path.push("index.html");
    }
    Some(path)
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        "otf" => "font/otf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

async fn serve_path(root: &Path, tail: &str) -> Result<Response, Rejection> {
    let mut path = request_path(root, tail).ok_or_else(warp::reject::not_found)?;
    if tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
        path.push("index.html");
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        debug!(path = ?path, error = %e, "not found");
        warp::reject::not_found()
    })?;

    let mime = content_type(&path);
    let body = if mime.starts_with("text/html") {
        inject_client(&String::from_utf8_lossy(&bytes)).into_bytes()
    } else {
        bytes
    };

    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_map_to_their_index() {
        let root = Path::new("/srv/dist");
        assert_eq!(request_path(root, ""), Some(root.join("index.html")));
        assert_eq!(request_path(root, "docs/"), Some(root.join("docs/index.html")));
        assert_eq!(request_path(root, "css/site.css"), Some(root.join("css/site.css")));
    }

    #[test]
    fn traversal_is_refused() {
        assert_eq!(request_path(Path::new("/srv/dist"), "../secret"), None);
        assert_eq!(request_path(Path::new("/srv/dist"), "css/../../x"), None);
    }

    #[test]
    fn content_types_cover_the_outputs() {
        assert_eq!(content_type(Path::new("a/app-min.js")), "application/javascript; charset=utf-8");
        assert_eq!(content_type(Path::new("svg/spritemap.svg")), "image/svg+xml");
        assert_eq!(content_type(Path::new("maps/app.js.map")), "application/json");
        assert_eq!(content_type(Path::new("INDEX.HTML")), "text/html; charset=utf-8");
    }
}
