use async_trait::async_trait;
use clap::{Parser, Subcommand};
use deployments::{ArtifactStore, Context, RpcClient, RpcDeployer};
use devnet::{
    CannonBuild, JsonRpcProbe, NodeConfig, PollConfig, Step, Supervisor,
    poller::DEFAULT_RPC_URL, step::ANVIL_PRIVATE_KEY,
};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devnet")]
#[command(about = "Runs build and deploy steps against a local anvil devnet", long_about = None)]
struct Cli {
    /// RPC URL the node listens on
    #[arg(long, env = "DEVNET_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    rpc_url: String,

    /// Node command, program followed by leading arguments
    #[arg(long, env = "ANVIL_COMMAND", default_value = "anvil", global = true)]
    anvil_command: String,

    /// How many times the node is pinged before giving up
    #[arg(long, default_value_t = 20, global = true)]
    max_attempts: u32,

    /// Delay between two pings, in milliseconds
    #[arg(long, default_value_t = 500, global = true)]
    delay_ms: u64,

    /// Timeout of a single ping, in milliseconds
    #[arg(long, default_value_t = 2000, global = true)]
    request_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Builds the cannon package against a fresh devnet and dumps its state
    Build {
        #[arg(long, default_value = "state.json")]
        dump_state: PathBuf,

        /// Where cannon writes the deployments
        #[arg(long, default_value = "deployments")]
        deployments: PathBuf,

        #[arg(long, env = "DEVNET_PRIVATE_KEY", default_value = ANVIL_PRIVATE_KEY, hide_default_value = true)]
        private_key: String,

        #[arg(long)]
        silent: bool,
    },
    /// Deploys the contracts to a fresh devnet and dumps its state
    Deploy {
        #[arg(long, default_value = "state.json")]
        dump_file: PathBuf,

        /// Export file, defaults to export/abi/<network>.json
        #[arg(long)]
        export_file: Option<PathBuf>,

        #[arg(long, default_value = "localhost")]
        network: String,

        /// Directory holding the compiled contract artifacts
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Only run the deploy scripts with these tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long)]
        silent: bool,
    },
}

/// Runs the deploy scripts against the devnet and writes the export file.
struct DeployStep {
    rpc_url: String,
    network: String,
    artifacts: PathBuf,
    tags: Vec<String>,
    export_file: PathBuf,
}

#[async_trait]
impl Step for DeployStep {
    async fn run(&self) -> eyre::Result<()> {
        let client = RpcClient::new(self.rpc_url.clone())?;

        let deployer_account = *client
            .accounts()
            .await?
            .first()
            .ok_or_else(|| eyre::eyre!("Node has no unlocked accounts"))?;
        let ctx = Context {
            network: self.network.clone(),
            deployer: deployer_account,
        };

        let deployer = RpcDeployer::new(client.clone(), ArtifactStore::new(&self.artifacts));
        let deployed = deployments::run(&self.tags, &deployer, &ctx).await?;

        let chain_id = client.chain_id().await?;
        deployments::export::write(&self.export_file, &self.network, chain_id, &deployed)?;

        Ok(())
    }
}

/// The node listens where the RPC URL points.
fn node_config(cli: &Cli, rpc_url: &reqwest::Url, dump_state: PathBuf, silent: bool) -> NodeConfig {
    let mut config = NodeConfig::new(dump_state)
        .command(cli.anvil_command.split_whitespace())
        .silent(silent);
    if let Some(host) = rpc_url.host_str() {
        config = config.host(host.trim_start_matches('[').trim_end_matches(']'));
    }
    if let Some(port) = rpc_url.port_or_known_default() {
        config = config.port(port);
    }
    config
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let poll = PollConfig {
        max_attempts: cli.max_attempts,
        delay: Duration::from_millis(cli.delay_ms),
    };
    let probe = JsonRpcProbe::new(
        cli.rpc_url.clone(),
        Duration::from_millis(cli.request_timeout_ms),
    )?;
    let rpc_url = reqwest::Url::parse(&cli.rpc_url)?;

    let node = |dump_state: PathBuf, silent: bool| node_config(&cli, &rpc_url, dump_state, silent);

    match cli.command {
        Command::Build {
            ref dump_state,
            ref deployments,
            ref private_key,
            silent,
        } => {
            tracing::info!(rpc_url = %cli.rpc_url, dump_state = %dump_state.display(), "building devnet");

            let node = node(dump_state.clone(), silent).preserve_historical_states(true);
            let step = CannonBuild {
                rpc_url: cli.rpc_url.clone(),
                private_key: private_key.clone(),
                deployments_dir: deployments.clone(),
                wipe: true,
            };

            Supervisor::new(node, probe, poll).run(&step).await?;
            tracing::info!("cannon build succeeded");
        }
        Command::Deploy {
            ref dump_file,
            ref export_file,
            ref network,
            ref artifacts,
            ref tags,
            silent,
        } => {
            tracing::info!("deploying to anvil and dumping state to {}", dump_file.display());

            let step = DeployStep {
                rpc_url: cli.rpc_url.clone(),
                network: network.clone(),
                artifacts: artifacts.clone(),
                tags: tags.clone(),
                export_file: export_file
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(format!("export/abi/{network}.json"))),
            };

            Supervisor::new(node(dump_file.clone(), silent), probe, poll)
                .run(&step)
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["devnet", "deploy", "--tags", "Factory,Delegatecall"]).unwrap();

        assert_eq!(cli.max_attempts, 20);
        assert_eq!(cli.delay_ms, 500);
        match cli.command {
            Command::Deploy {
                dump_file,
                export_file,
                network,
                tags,
                silent,
                ..
            } => {
                assert_eq!(dump_file, PathBuf::from("state.json"));
                assert_eq!(export_file, None);
                assert_eq!(network, "localhost");
                assert_eq!(tags, vec!["Factory", "Delegatecall"]);
                assert!(!silent);
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_node_listens_on_rpc_url() {
        let cli = Cli::try_parse_from(["devnet", "build", "--rpc-url", "http://0.0.0.0:9545"]).unwrap();
        let rpc_url = reqwest::Url::parse(&cli.rpc_url).unwrap();

        let config = node_config(&cli, &rpc_url, PathBuf::from("state.json"), false);

        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.port, Some(9545));
        assert_eq!(
            config.args(),
            vec!["--dump-state", "state.json", "--host", "0.0.0.0", "--port", "9545"]
        );
    }

    #[test]
    fn test_cli_build_flags() {
        let cli = Cli::try_parse_from([
            "devnet",
            "build",
            "--dump-state",
            "out/state.json",
            "--max-attempts",
            "5",
            "--silent",
        ])
        .unwrap();

        assert_eq!(cli.max_attempts, 5);
        match cli.command {
            Command::Build {
                dump_state,
                deployments,
                silent,
                ..
            } => {
                assert_eq!(dump_state, PathBuf::from("out/state.json"));
                assert_eq!(deployments, PathBuf::from("deployments"));
                assert!(silent);
            }
            _ => panic!("expected build"),
        }
    }
}
