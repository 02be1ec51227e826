//! Inbound HTTP served through the mount table.

use axum::http::StatusCode;
use relay::client::Client;
use relay::config::{MountConfig, RelayConfig};
use relay::http::HttpServer;
use relay::mount::{Mount, MountTable, Mounts};
use relay::pipeline::step;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

mod common;

async fn start(config: RelayConfig, mounts: Arc<dyn MountTable>) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = HttpServer::new(config, mounts).unwrap();
    tokio::spawn(async move {
        let _ = server
            .run_until(listener, async {
                let _ = stopped.await;
            })
            .await;
    });
    (addr, stop)
}

fn http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn serves_configured_file_mount() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();

    let mut config = RelayConfig::default();
    config.mounts.push(MountConfig {
        name: "static".into(),
        host: None,
        path_prefix: Some("/".into()),
        priority: 0,
        upstream: url::Url::from_directory_path(dir.path()).unwrap().to_string(),
    });

    let client = Client::new(&config).unwrap();
    let mounts: Arc<dyn MountTable> = Arc::new(Mounts::from_config(
        &config.mounts,
        config.pipeline.clone(),
        &client,
    ));
    client.attach(mounts.clone());
    let (addr, stop) = start(config, mounts).await;

    let res = http().get(format!("http://{addr}/index.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<h1>home</h1>");

    let res = http().get(format!("http://{addr}/missing.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let _ = stop.send(());
}

#[tokio::test]
async fn proxies_to_gzip_backend() {
    let source = b"decoded at the edge".to_vec();
    let backend = common::start_backend(
        "200 OK",
        &[("Content-Encoding", "gzip"), ("Content-Type", "text/plain")],
        common::gzip(&source),
    )
    .await;

    let mut config = RelayConfig::default();
    config.mounts.push(MountConfig {
        name: "api".into(),
        host: None,
        path_prefix: Some("/api".into()),
        priority: 0,
        upstream: format!("http://{}", backend.addr),
    });
    let client = Client::new(&config).unwrap();
    let mounts: Arc<dyn MountTable> = Arc::new(Mounts::from_config(
        &config.mounts,
        config.pipeline.clone(),
        &client,
    ));
    let (addr, stop) = start(config, mounts).await;

    let res = http().get(format!("http://{addr}/api/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("content-encoding").is_none());
    assert_eq!(res.bytes().await.unwrap().to_vec(), source);

    let _ = stop.send(());
}

#[tokio::test]
async fn proxies_chunked_backend() {
    let backend = common::start_chunked_backend(
        &[("Content-Type", "text/plain"), ("Keep-Alive", "timeout=5")],
        &[b"hello ".as_slice(), b"world".as_slice()],
    )
    .await;

    let mut config = RelayConfig::default();
    config.mounts.push(MountConfig {
        name: "chunked".into(),
        host: None,
        path_prefix: None,
        priority: 0,
        upstream: format!("http://{}", backend.addr),
    });
    let client = Client::new(&config).unwrap();
    let mounts: Arc<dyn MountTable> = Arc::new(Mounts::from_config(
        &config.mounts,
        config.pipeline.clone(),
        &client,
    ));
    let (addr, stop) = start(config, mounts).await;

    let res = http().get(format!("http://{addr}/stream")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("content-type").unwrap(), "text/plain");
    assert!(res.headers().get("keep-alive").is_none());
    assert_eq!(res.headers().get("content-length").unwrap(), "11");
    assert_eq!(res.text().await.unwrap(), "hello world");

    let _ = stop.send(());
}

#[tokio::test]
async fn step_fault_becomes_500() {
    let mut mounts = Mounts::new(Default::default());
    mounts.add(Mount::new(
        "broken",
        vec![step(|_ctx, _next| Err("bad handler".into()))],
    ));
    let (addr, stop) = start(RelayConfig::default(), Arc::new(mounts)).await;

    let res = http().post(format!("http://{addr}/")).body("x").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        res.text().await.unwrap(),
        "Error occurred in pipe function. See log for details."
    );

    let _ = stop.send(());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = RelayConfig::default();
    config.limits.max_body_size = 8;
    let mounts = Mounts::new(Default::default());
    let (addr, stop) = start(config, Arc::new(mounts)).await;

    let res = http()
        .post(format!("http://{addr}/"))
        .body(vec![b'x'; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let _ = stop.send(());
}
