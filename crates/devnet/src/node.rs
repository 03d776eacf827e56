use std::{ffi::OsString, path::PathBuf, process::Stdio, sync::Arc, time::Duration};
use tokio::{
    process::{Child, Command},
    sync::Mutex,
};

pub const DEFAULT_NODE_COMMAND: &str = "anvil";

/// How the local chain node is started.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Program followed by any leading arguments, e.g. `["anvil"]` or a
    /// wrapper such as `["docker", "run", "--rm", "foundry", "anvil"]`.
    pub command: Vec<String>,
    /// Where the node writes its state when it shuts down.
    pub dump_state: PathBuf,
    pub silent: bool,
    pub preserve_historical_states: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// How long the node gets to exit after SIGTERM before it is killed.
    pub grace_period: Duration,
}

impl NodeConfig {
    pub fn new(dump_state: impl Into<PathBuf>) -> Self {
        // Allow using some custom logic to spawn the node by setting `ANVIL_COMMAND`.
        let command = std::env::var("ANVIL_COMMAND")
            .unwrap_or_else(|_| DEFAULT_NODE_COMMAND.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            command,
            dump_state: dump_state.into(),
            silent: false,
            preserve_historical_states: false,
            host: None,
            port: None,
            grace_period: Duration::from_secs(5),
        }
    }

    pub fn command<I>(mut self, command: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn preserve_historical_states(mut self, preserve: bool) -> Self {
        self.preserve_historical_states = preserve;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Node flags, appended after the leading part of `command`. The dump
    /// path is passed through as is, it need not be valid UTF-8.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--dump-state".into(), self.dump_state.clone().into()];
        if self.preserve_historical_states {
            args.push("--preserve-historical-states".into());
        }
        if self.silent {
            args.push("--silent".into());
        }
        if let Some(host) = &self.host {
            args.push("--host".into());
            args.push(host.into());
        }
        if let Some(port) = self.port {
            args.push("--port".into());
            args.push(port.to_string().into());
        }
        args
    }
}

/// Handle to a spawned node. The only thing it can do is tell whether the
/// node is still alive and terminate it; clones share the same process.
#[derive(Clone)]
pub struct NodeHandle {
    child: Arc<Mutex<Option<Child>>>,
    pid: Option<u32>,
    grace_period: Duration,
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle").field("pid", &self.pid).finish()
    }
}

impl NodeHandle {
    /// Spawns the node. A failure to spawn is logged and yields a handle with
    /// no process behind it, which the readiness check then reports as a
    /// timeout.
    pub fn launch(config: &NodeConfig) -> Self {
        if let Some(parent) = config.dump_state.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    tracing::warn!(?err, dir = %parent.display(), "failed to create state dump directory");
                }
            }
        }

        let Some((program, leading)) = config.command.split_first() else {
            tracing::error!("no node command configured");
            return Self::from_child(None, config.grace_period);
        };

        let mut command = Command::new(program);
        command
            .args(leading)
            .args(config.args())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if config.silent {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        tracing::info!(command = %config.command.join(" "), "spawning node");

        let child = match command.spawn() {
            Ok(child) => {
                tracing::info!(pid = ?child.id(), "node spawned");
                Some(child)
            }
            Err(err) => {
                tracing::error!(?err, program = %program, "failed to spawn node");
                None
            }
        };

        Self::from_child(child, config.grace_period)
    }

    fn from_child(child: Option<Child>, grace_period: Duration) -> Self {
        let pid = child.as_ref().and_then(Child::id);
        Self {
            child: Arc::new(Mutex::new(child)),
            pid,
            grace_period,
        }
    }

    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    pub async fn is_running(&self) -> bool {
        match self.child.lock().await.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Terminates the node and waits for it to exit. Calling this again, from
    /// any clone, is a no-op.
    pub async fn terminate(&self) {
        // The lock is held until the process is reaped so a concurrent caller
        // only returns once the node is gone.
        let mut slot = self.child.lock().await;
        let Some(mut child) = slot.take() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            tracing::info!(%status, "node already exited");
            return;
        }

        tracing::info!(pid = ?self.pid, "killing node");

        if terminate_gracefully(&mut child, self.grace_period).await {
            return;
        }

        if let Err(err) = child.kill().await {
            tracing::error!("failed to kill node: {err:?}");
        }
    }
}

/// Sends SIGTERM so the node gets to write its state dump, then waits up to
/// `grace_period`. Returns whether the node exited.
#[cfg(unix)]
async fn terminate_gracefully(child: &mut Child, grace_period: Duration) -> bool {
    use nix::{
        sys::signal::{Signal, kill},
        unistd::Pid,
    };

    let Some(pid) = child.id() else {
        return false;
    };

    if let Err(err) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(?err, "failed to send SIGTERM to node");
        return false;
    }

    match tokio::time::timeout(grace_period, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::info!(%status, "node exited");
            true
        }
        Ok(Err(err)) => {
            tracing::warn!(?err, "failed to wait for node");
            false
        }
        Err(_) => {
            tracing::warn!(?grace_period, "node did not exit after SIGTERM");
            false
        }
    }
}

#[cfg(not(unix))]
async fn terminate_gracefully(_child: &mut Child, _grace_period: Duration) -> bool {
    false
}
