use crate::{Context, DeployOptions, DeployScript, Deployer, Deployment};
use async_trait::async_trait;

/// Authority and application factories.
pub struct Factory;

#[async_trait]
impl DeployScript for Factory {
    fn tag(&self) -> &'static str {
        "Factory"
    }

    async fn run(&self, deployer: &dyn Deployer, ctx: &Context) -> eyre::Result<Vec<Deployment>> {
        let opts = DeployOptions::new(ctx);

        Ok(vec![
            deployer.deploy("AuthorityFactory", &opts).await?,
            deployer.deploy("ApplicationFactory", &opts).await?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{RecordingDeployer, ctx};

    #[tokio::test]
    async fn test_factory_on_non_deterministic_network() {
        let deployer = RecordingDeployer::default();

        Factory.run(&deployer, &ctx("iotex_testnet")).await.unwrap();

        let calls = deployer.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(_, opts)| !opts.deterministic));
        assert!(calls.iter().all(|(_, opts)| opts.args.is_empty()));
    }
}
