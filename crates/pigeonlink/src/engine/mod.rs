pub mod cancel;
pub mod runner;

pub use cancel::CancelToken;
pub use runner::{LoopAction, Runner, RunnerReport, RunnerState, Worker};
