use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// A single health check against the node.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn ping(&self) -> eyre::Result<()>;
}

/// Posts an `eth_chainId` request. Any completed HTTP exchange counts as
/// success, whatever the status code or payload, so the request always goes
/// straight to the node and never through a proxy from the environment.
pub struct JsonRpcProbe {
    rpc_url: String,
    client: reqwest::Client,
}

impl JsonRpcProbe {
    pub fn new(rpc_url: impl Into<String>, request_timeout: Duration) -> eyre::Result<Self> {
        Ok(Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::builder()
                .no_proxy()
                .timeout(request_timeout)
                .build()?,
        })
    }
}

#[async_trait]
impl Probe for JsonRpcProbe {
    async fn ping(&self) -> eyre::Result<()> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "method": "eth_chainId",
                "id": 1
            }))
            .send()
            .await?;

        // consume the body, the exchange is only complete once it is read
        response.bytes().await?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    NotReady { attempts: u32 },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            Readiness::Ready { attempts } | Readiness::NotReady { attempts } => attempts,
        }
    }
}

// One round of the polling loop, only kept around for logging.
#[derive(Debug)]
struct Attempt {
    sequence: u32,
    ready: bool,
    wait: Duration,
}

/// Pings the node until it answers or `max_attempts` pings have failed.
/// There is no delay after a successful ping nor after the last failed one.
pub async fn wait_until_ready(probe: &dyn Probe, config: &PollConfig) -> Readiness {
    let start = tokio::time::Instant::now();

    for sequence in 1..=config.max_attempts {
        tracing::debug!(sequence, "pinging node");

        let result = probe.ping().await;
        let ready = result.is_ok();
        let attempt = Attempt {
            sequence,
            ready,
            wait: if ready || sequence == config.max_attempts {
                Duration::ZERO
            } else {
                config.delay
            },
        };

        if attempt.ready {
            tracing::info!(attempts = attempt.sequence, elapsed = ?start.elapsed(), "node is listening");
            return Readiness::Ready { attempts: sequence };
        }

        if let Err(err) = result {
            tracing::info!(?attempt, "node is not listening yet: {err}");
        }

        if !attempt.wait.is_zero() {
            tokio::time::sleep(attempt.wait).await;
        }
    }

    tracing::warn!(
        attempts = config.max_attempts,
        elapsed = ?start.elapsed(),
        "node never became ready"
    );

    Readiness::NotReady {
        attempts: config.max_attempts,
    }
}
