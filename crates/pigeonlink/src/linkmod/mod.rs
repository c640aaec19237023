//! Pluggable carriers.
//!
//! A linkmod moves frames across one physical medium in one direction. Each
//! one is a [`Linkmod`] type: a probe saying whether the medium is usable on
//! this machine, a constructor that starts a [`Runner`](crate::engine::Runner)
//! around the carrier's [`Worker`](crate::engine::Worker), and `shutdown`,
//! which stops that runner and releases the carrier.
//!
//! To add a carrier, implement [`Linkmod`] and register
//! [`LinkmodDescriptor::of`] in [`Registry::standard`](crate::registry::Registry::standard).

pub mod camera;
pub mod console;
pub mod files;
pub mod null;
pub mod printer;

use std::fmt;
use std::sync::Arc;

use crate::config::LinkConfig;
use crate::engine::RunnerState;
use crate::error::Result;
use crate::peripheral::{Peripherals, SystemPeripherals};
use crate::queue::FrameQueue;

pub use camera::CameraRx;
pub use console::ConsoleTx;
pub use files::{FilesRx, FilesTx};
pub use null::{NullRx, NullTx};
pub use printer::PrinterTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Tx,
    Rx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tx => f.write_str("TX"),
            Self::Rx => f.write_str("RX"),
        }
    }
}

/// What probes and constructors get to look at.
#[derive(Clone)]
pub struct LinkContext {
    config: LinkConfig,
    peripherals: Arc<dyn Peripherals>,
}

impl LinkContext {
    pub fn new(config: LinkConfig, peripherals: Arc<dyn Peripherals>) -> Self {
        Self { config, peripherals }
    }

    pub fn system(config: LinkConfig) -> Self {
        Self::new(config, Arc::new(SystemPeripherals))
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn peripherals(&self) -> &Arc<dyn Peripherals> {
        &self.peripherals
    }
}

pub trait Linkmod: Send + Sized + 'static {
    const NAME: &'static str;
    const DIRECTION: Direction;

    /// Side-effect free availability check.
    fn is_available(ctx: &LinkContext) -> bool;

    /// Builds the carrier and starts its runner.
    fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self>;

    fn state(&self) -> RunnerState;

    /// Stops the runner (blocking until its thread exits) and releases the
    /// carrier.
    fn shutdown(self) -> Result<()>;
}

/// A running linkmod with its concrete type erased.
pub trait ActiveLink: Send {
    fn name(&self) -> &str;
    fn direction(&self) -> Direction;
    fn state(&self) -> RunnerState;
    fn shutdown(self: Box<Self>) -> Result<()>;
}

impl<L: Linkmod> ActiveLink for L {
    fn name(&self) -> &str {
        L::NAME
    }

    fn direction(&self) -> Direction {
        L::DIRECTION
    }

    fn state(&self) -> RunnerState {
        Linkmod::state(self)
    }

    fn shutdown(self: Box<Self>) -> Result<()> {
        Linkmod::shutdown(*self)
    }
}

pub type ProbeFn = Arc<dyn Fn(&LinkContext) -> bool + Send + Sync>;
pub type ConstructFn =
    Arc<dyn Fn(&LinkContext, FrameQueue) -> Result<Box<dyn ActiveLink>> + Send + Sync>;

/// Immutable registry entry for one carrier.
#[derive(Clone)]
pub struct LinkmodDescriptor {
    direction: Direction,
    name: String,
    probe: ProbeFn,
    construct: ConstructFn,
}

impl LinkmodDescriptor {
    pub fn new(
        direction: Direction,
        name: &str,
        probe: ProbeFn,
        construct: ConstructFn,
    ) -> Self {
        Self {
            direction,
            name: name.to_string(),
            probe,
            construct,
        }
    }

    pub fn of<L: Linkmod>() -> Self {
        Self::new(
            L::DIRECTION,
            L::NAME,
            Arc::new(L::is_available),
            Arc::new(|ctx: &LinkContext, queue: FrameQueue| {
                L::new(ctx, queue).map(|l| Box::new(l) as Box<dyn ActiveLink>)
            }),
        )
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self, ctx: &LinkContext) -> bool {
        (self.probe)(ctx)
    }

    pub fn construct(&self, ctx: &LinkContext, queue: FrameQueue) -> Result<Box<dyn ActiveLink>> {
        (self.construct)(ctx, queue)
    }
}

impl fmt::Debug for LinkmodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkmodDescriptor")
            .field("direction", &self.direction)
            .field("name", &self.name)
            .finish()
    }
}
