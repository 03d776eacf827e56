use crate::{Context, DeployOptions, DeployScript, Deployer, Deployment};
use alloy_primitives::{Address, address};
use async_trait::async_trait;

/// ENS registry, same address on every network that has ENS.
pub const ENS_REGISTRY: Address = address!("0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

/// Helpers meant to be used through `DELEGATECALL`.
pub struct Delegatecall;

#[async_trait]
impl DeployScript for Delegatecall {
    fn tag(&self) -> &'static str {
        "Delegatecall"
    }

    async fn run(&self, deployer: &dyn Deployer, ctx: &Context) -> eyre::Result<Vec<Deployment>> {
        let opts = DeployOptions::new(ctx);

        let safe_transfer = deployer.deploy("SafeERC20Transfer", &opts).await?;
        let ens_transfer = deployer
            .deploy("AssetTransferToENS", &opts.with_args([ENS_REGISTRY]))
            .await?;

        Ok(vec![safe_transfer, ens_transfer])
    }
}
