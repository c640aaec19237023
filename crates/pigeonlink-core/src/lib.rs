pub mod queue;
pub mod sys;

#[cfg(not(target_os = "linux"))]
pub mod stubs;

pub use queue::HandoffQueue;
