use tracing::{error, info};

use crate::error::Result;
use crate::linkmod::{ActiveLink, Direction, LinkContext};
use crate::queue::FrameQueue;
use crate::registry::Registry;

/// One RX carrier feeding one TX carrier through a shared queue.
pub struct PigeonLink {
    queue: FrameQueue,
    rx: Box<dyn ActiveLink>,
    tx: Box<dyn ActiveLink>,
}

impl PigeonLink {
    /// Selects and starts RX, then TX. If no TX carrier can be started the
    /// RX carrier is shut down again before the error is returned.
    pub fn open(registry: &Registry, ctx: &LinkContext) -> Result<Self> {
        let queue = FrameQueue::new();
        let rx = registry.select(Direction::Rx, ctx, &queue)?;

        let tx = match registry.select(Direction::Tx, ctx, &queue) {
            Ok(tx) => tx,
            Err(e) => {
                let name = rx.name().to_string();
                if let Err(stop_err) = rx.shutdown() {
                    error!("[{}] shutdown after failed TX selection: {}", name, stop_err);
                }
                return Err(e);
            }
        };

        info!("Link up: {} -> {}", rx.name(), tx.name());
        Ok(Self { queue, rx, tx })
    }

    pub fn queue(&self) -> &FrameQueue {
        &self.queue
    }

    pub fn rx_name(&self) -> &str {
        self.rx.name()
    }

    pub fn tx_name(&self) -> &str {
        self.tx.name()
    }

    pub fn rx(&self) -> &dyn ActiveLink {
        self.rx.as_ref()
    }

    pub fn tx(&self) -> &dyn ActiveLink {
        self.tx.as_ref()
    }

    /// Shuts down RX first so nothing new is queued, then TX. Both are
    /// always stopped; the first failure is returned.
    pub fn close(self) -> Result<()> {
        let Self { queue, rx, tx } = self;
        let rx_result = rx.shutdown();
        let tx_result = tx.shutdown();

        if !queue.is_empty() {
            info!("Closing with {} frames still queued", queue.len());
        }
        rx_result.and(tx_result)
    }
}

impl std::fmt::Debug for PigeonLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PigeonLink")
            .field("rx", &self.rx.name())
            .field("tx", &self.tx.name())
            .field("queued", &self.queue.len())
            .finish()
    }
}
