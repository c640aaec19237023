//! pigeonlink moves frames between two machines with no network between
//! them, over whatever physical carrier is at hand: printed barcodes read
//! back by a camera, files on removable media, or a console dump.
//!
//! A [`PigeonLink`] pairs one receiving and one sending carrier, chosen from
//! a [`Registry`] by probing each in order, and joins them with a
//! [`FrameQueue`]. Each carrier runs its own [`Worker`] on a [`Runner`]
//! thread.

pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod link;
pub mod linkmod;
pub mod peripheral;
pub mod queue;
pub mod registry;

#[cfg(any(test, feature = "simulator"))]
pub mod simulator;

pub use config::LinkConfig;
pub use engine::{CancelToken, LoopAction, Runner, RunnerReport, RunnerState, Worker};
pub use error::{FrameError, LinkError, Result};
pub use frame::Frame;
pub use link::PigeonLink;
pub use linkmod::{ActiveLink, Direction, LinkContext, Linkmod, LinkmodDescriptor};
pub use queue::FrameQueue;
pub use registry::Registry;
