pub mod node;
pub mod poller;
pub mod signal;
pub mod step;
pub mod supervisor;

pub use node::{NodeConfig, NodeHandle};
pub use poller::{JsonRpcProbe, PollConfig, Probe, Readiness, wait_until_ready};
pub use signal::{ShutdownSignal, SignalListener};
pub use step::{CannonBuild, CommandStep, Step};
pub use supervisor::{Supervisor, SupervisorError};
