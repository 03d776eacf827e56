//! Kept in its own test binary: it changes the process environment.

use axum::{Json, Router, routing::any};
use deployments::RpcClient;
use serde_json::json;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_proxy_from_environment_is_ignored() {
    // a proxy posing as a chain, so a proxied call would succeed
    let proxy = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = proxy.local_addr().unwrap();
    let router = Router::new().fallback(any(|| async {
        Json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x7a69"}))
    }));
    tokio::spawn(async move { axum::serve(proxy, router).await.unwrap() });

    // SAFETY: this is the only test in the binary, nothing else reads the
    // environment concurrently.
    unsafe {
        for var in ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"] {
            std::env::set_var(var, format!("http://{proxy_addr}"));
        }
        std::env::remove_var("NO_PROXY");
        std::env::remove_var("no_proxy");
    }

    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let client = RpcClient::new(format!("http://{closed}")).unwrap();

    assert!(client.chain_id().await.is_err());
}
