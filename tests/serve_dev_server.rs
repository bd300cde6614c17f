// tests/serve_dev_server.rs

use std::error::Error;

use tokio::sync::oneshot;

use assetpipe::serve;
use assetpipe::serve::livereload::LIVERELOAD_PATH;
use assetpipe_test_utils::builders::{ConfigFileBuilder, Project};
use assetpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn serves_dist_with_the_reload_client_injected() -> TestResult {
    init_tracing();
    let project = Project::new();
    project
        .write("dist/index.html", "<html><body><h1>hi</h1></body></html>")
        .write("dist/css/site.css", ".a{color:red}");

    let cfg = ConfigFileBuilder::new()
        .memory_cache()
        .edit(|raw| raw.serve.port = 0)
        .build();
    let tc = project.context(cfg);

    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel();
    let server = tokio::spawn(serve::run(tc.ctx.clone(), ready_tx, stop_rx));
    let addr = with_timeout(ready_rx).await?;

    let client = reqwest::Client::new();

    let index = client.get(format!("http://{addr}/")).send().await?;
    assert!(index.status().is_success());
    let body = index.text().await?;
    assert!(body.contains("<h1>hi</h1>"));
    assert!(body.contains(LIVERELOAD_PATH), "got {body}");

    let css = client.get(format!("http://{addr}/css/site.css")).send().await?;
    assert!(css.status().is_success());
    let content_type = css
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/css"), "got {content_type}");
    assert_eq!(css.text().await?, ".a{color:red}");

    let missing = client.get(format!("http://{addr}/nope.js")).send().await?;
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    let escape = client.get(format!("http://{addr}/..%2F..%2Fetc%2Fpasswd")).send().await?;
    assert!(!escape.status().is_success());

    stop_tx.send(()).map_err(|_| "server already gone")?;
    with_timeout(server).await??;
    Ok(())
}
