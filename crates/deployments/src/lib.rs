use alloy_primitives::Address;
use async_trait::async_trait;

pub mod artifacts;
pub mod delegatecall;
pub mod export;
pub mod factory;
pub mod rpc;

pub use artifacts::{Artifact, ArtifactStore};
pub use delegatecall::Delegatecall;
pub use factory::Factory;
pub use rpc::{RpcClient, RpcDeployer};

// IoTeX doesn't have support yet, see https://github.com/safe-global/safe-singleton-factory/issues/199
// Chiado is not working, see https://github.com/safe-global/safe-singleton-factory/issues/201
pub const NON_DETERMINISTIC_NETWORKS: &[&str] = &["iotex_testnet", "chiado"];

pub fn is_deterministic(network: &str) -> bool {
    !NON_DETERMINISTIC_NETWORKS.contains(&network)
}

/// Network the scripts run against and the account paying for them.
#[derive(Debug, Clone)]
pub struct Context {
    pub network: String,
    pub deployer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    pub from: Address,
    pub deterministic: bool,
    /// Constructor arguments.
    pub args: Vec<Address>,
    pub log: bool,
}

impl DeployOptions {
    pub fn new(ctx: &Context) -> Self {
        Self {
            from: ctx.deployer,
            deterministic: is_deterministic(&ctx.network),
            args: vec![],
            log: true,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Address>) -> Self {
        self.args = args.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Deployment {
    pub name: String,
    pub address: Address,
    /// False when an identical deterministic deployment was already on chain.
    pub newly_deployed: bool,
    pub abi: serde_json::Value,
}

/// Deploys a named contract and returns where it lives.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, name: &str, opts: &DeployOptions) -> eyre::Result<Deployment>;
}

#[async_trait]
pub trait DeployScript: Send + Sync {
    fn tag(&self) -> &'static str;

    async fn run(&self, deployer: &dyn Deployer, ctx: &Context) -> eyre::Result<Vec<Deployment>>;
}

/// All scripts, in the order they run.
pub fn scripts() -> Vec<Box<dyn DeployScript>> {
    vec![Box::new(Factory), Box::new(Delegatecall)]
}

/// Runs the scripts matching `tags`, or every script when `tags` is empty.
pub async fn run(
    tags: &[String],
    deployer: &dyn Deployer,
    ctx: &Context,
) -> eyre::Result<Vec<Deployment>> {
    let scripts = scripts();

    if let Some(unknown) = tags
        .iter()
        .find(|tag| !scripts.iter().any(|script| script.tag() == tag.as_str()))
    {
        return Err(eyre::eyre!(
            "Unknown deploy tag: {}. Supported tags: {}",
            unknown,
            scripts
                .iter()
                .map(|script| script.tag())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let mut deployments = vec![];
    for script in scripts
        .iter()
        .filter(|script| tags.is_empty() || tags.iter().any(|tag| tag == script.tag()))
    {
        tracing::info!(tag = script.tag(), network = %ctx.network, "running deploy script");
        deployments.extend(script.run(deployer, ctx).await?);
    }

    Ok(deployments)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Hands out sequential addresses and remembers what it was asked.
    #[derive(Default)]
    pub(crate) struct RecordingDeployer {
        pub calls: Mutex<Vec<(String, DeployOptions)>>,
    }

    impl RecordingDeployer {
        pub fn names(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Deployer for RecordingDeployer {
        async fn deploy(&self, name: &str, opts: &DeployOptions) -> eyre::Result<Deployment> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((name.to_string(), opts.clone()));
            Ok(Deployment {
                name: name.to_string(),
                address: Address::with_last_byte(calls.len() as u8),
                newly_deployed: true,
                abi: serde_json::Value::Array(vec![]),
            })
        }
    }

    pub(crate) fn ctx(network: &str) -> Context {
        Context {
            network: network.to_string(),
            deployer: Address::repeat_byte(0xaa),
        }
    }

    #[test]
    fn test_deterministic_networks() {
        assert!(is_deterministic("localhost"));
        assert!(is_deterministic("mainnet"));
        assert!(is_deterministic("sepolia"));
        assert!(!is_deterministic("iotex_testnet"));
        assert!(!is_deterministic("chiado"));
    }

    #[test]
    fn test_deploy_options_follow_network() {
        let opts = DeployOptions::new(&ctx("chiado"));
        assert!(!opts.deterministic);
        assert_eq!(opts.from, Address::repeat_byte(0xaa));
        assert!(opts.log);
        assert!(opts.args.is_empty());

        assert!(DeployOptions::new(&ctx("localhost")).deterministic);
    }

    #[tokio::test]
    async fn test_run_all_scripts_in_order() {
        let deployer = RecordingDeployer::default();

        let deployments = run(&[], &deployer, &ctx("localhost")).await.unwrap();

        assert_eq!(
            deployer.names(),
            vec![
                "AuthorityFactory",
                "ApplicationFactory",
                "SafeERC20Transfer",
                "AssetTransferToENS"
            ]
        );
        assert_eq!(deployments.len(), 4);
        assert_eq!(deployments[3].address, Address::with_last_byte(4));
    }

    #[tokio::test]
    async fn test_run_filters_by_tag() {
        let deployer = RecordingDeployer::default();

        run(&["Delegatecall".to_string()], &deployer, &ctx("localhost"))
            .await
            .unwrap();

        assert_eq!(
            deployer.names(),
            vec!["SafeERC20Transfer", "AssetTransferToENS"]
        );
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_tag() {
        let deployer = RecordingDeployer::default();

        let err = run(&["Bridge".to_string()], &deployer, &ctx("localhost"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Unknown deploy tag: Bridge"));
        assert!(deployer.names().is_empty());
    }
}
