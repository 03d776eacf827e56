use crate::{
    node::{NodeConfig, NodeHandle},
    poller::{PollConfig, Probe, Readiness, wait_until_ready},
    signal::{ShutdownSignal, SignalListener},
    step::Step,
};

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Also covers a node binary that could not be spawned at all.
    #[error("node is not listening after {attempts} attempts")]
    ReadinessTimeout { attempts: u32 },

    #[error("{0:#}")]
    Downstream(eyre::Report),

    #[error("interrupted by {0}")]
    Interrupted(ShutdownSignal),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Launching,
    Polling,
    Timeout,
    Ready,
    Running,
    Succeeded,
    Failed,
    Terminated,
}

impl State {
    /// An interrupt may end the run from any state, so every state but
    /// `Terminated` itself can move to `Terminated`.
    pub fn can_advance_to(self, next: State) -> bool {
        use State::*;

        matches!(
            (self, next),
            (Idle, Launching)
                | (Launching, Polling)
                | (Polling, Timeout | Ready)
                | (Ready, Running)
                | (Running, Succeeded | Failed)
        ) || (self != Terminated && next == Terminated)
    }
}

struct Lifecycle {
    state: State,
}

impl Lifecycle {
    fn advance(&mut self, next: State) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = ?self.state, to = ?next, "supervisor state");
        self.state = next;
    }
}

/// Launches the node, waits for it to listen, runs a step against it and
/// terminates the node on the way out, whichever way that is.
pub struct Supervisor<P> {
    node: NodeConfig,
    probe: P,
    poll: PollConfig,
}

impl<P: Probe> Supervisor<P> {
    pub fn new(node: NodeConfig, probe: P, poll: PollConfig) -> Self {
        Self { node, probe, poll }
    }

    /// Runs `step` once the node is ready. SIGINT and SIGTERM terminate the
    /// node and end the run with [`SupervisorError::Interrupted`].
    pub async fn run(&self, step: &dyn Step) -> Result<(), SupervisorError> {
        let mut signals = SignalListener::install()?;
        self.run_until(step, signals.recv()).await
    }

    /// Same as [`Supervisor::run`] with the interrupt source supplied by the
    /// caller.
    pub async fn run_until<F>(&self, step: &dyn Step, shutdown: F) -> Result<(), SupervisorError>
    where
        F: Future<Output = ShutdownSignal>,
    {
        let mut lifecycle = Lifecycle { state: State::Idle };

        lifecycle.advance(State::Launching);
        let node = NodeHandle::launch(&self.node);

        let result = tokio::select! {
            result = self.drive(step, &mut lifecycle) => result,
            signal = shutdown => Err(SupervisorError::Interrupted(signal)),
        };

        node.terminate().await;
        lifecycle.advance(State::Terminated);

        match &result {
            Ok(()) => tracing::info!("devnet run succeeded"),
            Err(err) => tracing::error!("devnet run failed: {err}"),
        }

        result
    }

    async fn drive(&self, step: &dyn Step, lifecycle: &mut Lifecycle) -> Result<(), SupervisorError> {
        lifecycle.advance(State::Polling);

        match wait_until_ready(&self.probe, &self.poll).await {
            Readiness::Ready { .. } => lifecycle.advance(State::Ready),
            Readiness::NotReady { attempts } => {
                lifecycle.advance(State::Timeout);
                return Err(SupervisorError::ReadinessTimeout { attempts });
            }
        }

        lifecycle.advance(State::Running);

        match step.run().await {
            Ok(()) => {
                lifecycle.advance(State::Succeeded);
                Ok(())
            }
            Err(err) => {
                lifecycle.advance(State::Failed);
                Err(SupervisorError::Downstream(err))
            }
        }
    }
}
