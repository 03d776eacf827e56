use async_trait::async_trait;
use eyre::WrapErr;
use std::{fmt, path::PathBuf};
use tokio::process::Command;

/// Default private key of the first anvil dev account.
pub const ANVIL_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// The build/deploy action run once the node is ready.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self) -> eyre::Result<()>;
}

/// Runs an external program with inherited stdio. A non-zero exit status is
/// an error.
#[derive(Debug, Clone)]
pub struct CommandStep {
    program: String,
    args: Vec<String>,
}

impl CommandStep {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg2(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arg(name).arg(value)
    }

    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[async_trait]
impl Step for CommandStep {
    async fn run(&self) -> eyre::Result<()> {
        tracing::info!(command = %self, "running");

        let status = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .status()
            .await
            .wrap_err_with(|| format!("failed to run `{self}`"))?;

        if !status.success() {
            eyre::bail!("`{}` failed with {}", self.program, status);
        }

        Ok(())
    }
}

/// `cannon build` against the devnet, writing the deployments to a directory.
#[derive(Debug, Clone)]
pub struct CannonBuild {
    pub rpc_url: String,
    pub private_key: String,
    pub deployments_dir: PathBuf,
    pub wipe: bool,
}

impl CannonBuild {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            private_key: ANVIL_PRIVATE_KEY.to_string(),
            deployments_dir: PathBuf::from("deployments"),
            wipe: true,
        }
    }
}

impl From<&CannonBuild> for CommandStep {
    fn from(build: &CannonBuild) -> Self {
        let mut step = CommandStep::new("cannon")
            .arg("build")
            .arg2("--private-key", &build.private_key)
            .arg2("--rpc-url", &build.rpc_url);
        if build.wipe {
            step = step.arg("--wipe");
        }
        step.arg2(
            "--write-deployments",
            build.deployments_dir.display().to_string(),
        )
    }
}

#[async_trait]
impl Step for CannonBuild {
    async fn run(&self) -> eyre::Result<()> {
        CommandStep::from(self)
            .run()
            .await
            .wrap_err("cannon build failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cannon_build_command() {
        let build = CannonBuild::new("http://127.0.0.1:8545");

        assert_eq!(
            CommandStep::from(&build).to_string(),
            format!(
                "cannon build --private-key {ANVIL_PRIVATE_KEY} --rpc-url http://127.0.0.1:8545 --wipe --write-deployments deployments"
            )
        );
    }

    #[tokio::test]
    async fn test_command_step_success() {
        let step = CommandStep::new("sh").arg2("-c", "exit 0");
        step.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_command_step_failure_status() {
        let step = CommandStep::new("sh").arg2("-c", "exit 3");

        let err = step.run().await.unwrap_err();
        assert!(err.to_string().contains("`sh` failed"), "{err}");
    }

    #[tokio::test]
    async fn test_command_step_missing_program() {
        let step = CommandStep::new("definitely-not-a-real-build-tool").arg("build");

        let err = step.run().await.unwrap_err();
        assert!(
            err.to_string()
                .contains("failed to run `definitely-not-a-real-build-tool build`"),
            "{err}"
        );
    }
}
