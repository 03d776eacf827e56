use crate::{ArtifactStore, DeployOptions, Deployer, Deployment};
use alloy_primitives::{Address, B256, Bytes, address};
use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;

/// Arachnid's deterministic deployment proxy. Calldata is a 32 byte salt
/// followed by the init code; the contract lands at its CREATE2 address.
pub const DETERMINISTIC_DEPLOYMENT_PROXY: Address =
    address!("0x4e59b44847b379578588920ca78fbf26c0b4956c");

/// Minimal Ethereum JSON-RPC client.
#[derive(Clone)]
pub struct RpcClient {
    rpc_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        // pre-byzantium receipts carry no status
        self.status.as_deref().is_none_or(|status| status != "0x0")
    }
}

impl RpcClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(rpc_url: String) -> eyre::Result<Self> {
        Self::with_timeout(rpc_url, Self::DEFAULT_TIMEOUT)
    }

    /// The node is always addressed directly, proxy environment variables
    /// are ignored.
    pub fn with_timeout(rpc_url: String, timeout: Duration) -> eyre::Result<Self> {
        Ok(Self {
            rpc_url,
            client: reqwest::Client::builder()
                .no_proxy()
                .timeout(timeout)
                .build()?,
        })
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> eyre::Result<T> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await?;

        let json: serde_json::Value = response.json().await?;

        if let Some(error) = json.get("error") {
            return Err(eyre::eyre!("RPC error calling {}: {}", method, error));
        }

        let result = json
            .get("result")
            .cloned()
            .ok_or_else(|| eyre::eyre!("No result in RPC response to {}", method))?;

        Ok(serde_json::from_value(result)?)
    }

    pub async fn chain_id(&self) -> eyre::Result<u64> {
        let result: String = self.call("eth_chainId", json!([])).await?;

        // Result is a hex string like "0x7a69"
        let chain_id = u64::from_str_radix(result.trim_start_matches("0x"), 16)?;

        Ok(chain_id)
    }

    pub async fn accounts(&self) -> eyre::Result<Vec<Address>> {
        self.call("eth_accounts", json!([])).await
    }

    pub async fn code(&self, address: Address) -> eyre::Result<Bytes> {
        self.call("eth_getCode", json!([address, "latest"])).await
    }

    pub async fn send_transaction(&self, tx: serde_json::Value) -> eyre::Result<B256> {
        self.call("eth_sendTransaction", json!([tx])).await
    }

    pub async fn receipt(&self, hash: B256) -> eyre::Result<Option<Receipt>> {
        self.call("eth_getTransactionReceipt", json!([hash])).await
    }
}

/// Deploys through `eth_sendTransaction`, so `from` must be an account the
/// node can sign for, as on a local devnet.
pub struct RpcDeployer {
    client: RpcClient,
    artifacts: ArtifactStore,
    receipt_attempts: u32,
    receipt_delay: Duration,
}

impl RpcDeployer {
    pub fn new(client: RpcClient, artifacts: ArtifactStore) -> Self {
        Self {
            client,
            artifacts,
            receipt_attempts: 50,
            receipt_delay: Duration::from_millis(200),
        }
    }

    pub fn receipt_polling(mut self, attempts: u32, delay: Duration) -> Self {
        self.receipt_attempts = attempts;
        self.receipt_delay = delay;
        self
    }

    async fn wait_for_receipt(&self, name: &str, hash: B256) -> eyre::Result<Receipt> {
        for attempt in 1..=self.receipt_attempts {
            if let Some(receipt) = self.client.receipt(hash).await? {
                if !receipt.succeeded() {
                    eyre::bail!("Deployment of {} reverted in {}", name, hash);
                }
                return Ok(receipt);
            }
            if attempt < self.receipt_attempts {
                tokio::time::sleep(self.receipt_delay).await;
            }
        }

        Err(eyre::eyre!(
            "No receipt for {} deployment {} after {} attempts",
            name,
            hash,
            self.receipt_attempts
        ))
    }

    async fn deploy_deterministic(
        &self,
        name: &str,
        from: Address,
        init_code: &Bytes,
    ) -> eyre::Result<(Address, bool)> {
        let salt = B256::ZERO;
        let address = DETERMINISTIC_DEPLOYMENT_PROXY.create2_from_code(salt, init_code);

        if !self.client.code(address).await?.is_empty() {
            return Ok((address, false));
        }

        if self
            .client
            .code(DETERMINISTIC_DEPLOYMENT_PROXY)
            .await?
            .is_empty()
        {
            eyre::bail!(
                "Deterministic deployment proxy {} is not deployed on this network",
                DETERMINISTIC_DEPLOYMENT_PROXY
            );
        }

        let mut data = salt.to_vec();
        data.extend_from_slice(init_code);

        let hash = self
            .client
            .send_transaction(json!({
                "from": from,
                "to": DETERMINISTIC_DEPLOYMENT_PROXY,
                "data": Bytes::from(data),
            }))
            .await?;
        self.wait_for_receipt(name, hash).await?;

        if self.client.code(address).await?.is_empty() {
            eyre::bail!("No code at {} after deploying {}", address, name);
        }

        Ok((address, true))
    }

    async fn deploy_create(
        &self,
        name: &str,
        from: Address,
        init_code: &Bytes,
    ) -> eyre::Result<Address> {
        let hash = self
            .client
            .send_transaction(json!({
                "from": from,
                "data": init_code,
            }))
            .await?;
        let receipt = self.wait_for_receipt(name, hash).await?;

        receipt
            .contract_address
            .ok_or_else(|| eyre::eyre!("Receipt {} has no contract address", receipt.transaction_hash))
    }
}

#[async_trait]
impl Deployer for RpcDeployer {
    async fn deploy(&self, name: &str, opts: &DeployOptions) -> eyre::Result<Deployment> {
        let artifact = self.artifacts.load(name)?;
        let init_code = artifact.init_code(&opts.args);

        let (address, newly_deployed) = if opts.deterministic {
            self.deploy_deterministic(name, opts.from, &init_code).await?
        } else {
            (self.deploy_create(name, opts.from, &init_code).await?, true)
        };

        if opts.log {
            if newly_deployed {
                tracing::info!(%address, "deployed {name}");
            } else {
                tracing::info!(%address, "reusing {name}");
            }
        }

        Ok(Deployment {
            name: name.to_string(),
            address,
            newly_deployed,
            abi: artifact.abi,
        })
    }
}
