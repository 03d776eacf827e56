//! Kept in its own test binary: it changes the process environment.

use axum::{Router, http::StatusCode, routing::any};
use devnet::{JsonRpcProbe, PollConfig, Readiness, wait_until_ready};
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_proxy_from_environment_is_ignored() {
    // a proxy that answers everything, so a proxied ping would always succeed
    let proxy = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = proxy.local_addr().unwrap();
    let router = Router::new().fallback(any(|| async { (StatusCode::BAD_GATEWAY, "bad gateway") }));
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
    let probe = JsonRpcProbe::new(format!("http://{closed}"), Duration::from_secs(1)).unwrap();
    let config = PollConfig {
        max_attempts: 3,
        delay: Duration::from_millis(10),
    };

    let readiness = wait_until_ready(&probe, &config).await;

    assert_eq!(readiness, Readiness::NotReady { attempts: 3 });
}
