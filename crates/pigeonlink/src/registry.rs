use tracing::{debug, info};

use crate::error::{LinkError, Result};
use crate::linkmod::{
    ActiveLink, CameraRx, ConsoleTx, Direction, FilesRx, FilesTx, LinkContext, LinkmodDescriptor,
    NullRx, NullTx, PrinterTx,
};
use crate::queue::FrameQueue;

/// Ordered carrier lists, one per direction. Earlier entries win.
#[derive(Debug, Clone)]
pub struct Registry {
    tx: Vec<LinkmodDescriptor>,
    rx: Vec<LinkmodDescriptor>,
}

impl Registry {
    /// The carriers pigeond ships with, most capable first and the null
    /// carriers last.
    pub fn standard() -> Self {
        Self::builder()
            .register(LinkmodDescriptor::of::<PrinterTx>())
            .register(LinkmodDescriptor::of::<FilesTx>())
            .register(LinkmodDescriptor::of::<ConsoleTx>())
            .register(LinkmodDescriptor::of::<NullTx>())
            .register(LinkmodDescriptor::of::<CameraRx>())
            .register(LinkmodDescriptor::of::<FilesRx>())
            .register(LinkmodDescriptor::of::<NullRx>())
            .build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn descriptors(&self, direction: Direction) -> &[LinkmodDescriptor] {
        match direction {
            Direction::Tx => &self.tx,
            Direction::Rx => &self.rx,
        }
    }

    /// First descriptor whose probe passes, without constructing anything.
    pub fn first_available(
        &self,
        direction: Direction,
        ctx: &LinkContext,
    ) -> Option<&LinkmodDescriptor> {
        self.descriptors(direction).iter().find(|desc| {
            let available = desc.is_available(ctx);
            debug!("[{}] probe {}: {}", direction, desc.name(), available);
            available
        })
    }

    /// Starts the first available carrier for `direction` on `queue`.
    ///
    /// Only the chosen descriptor is constructed. If its constructor fails
    /// that error is returned; later descriptors are not tried.
    pub fn select(
        &self,
        direction: Direction,
        ctx: &LinkContext,
        queue: &FrameQueue,
    ) -> Result<Box<dyn ActiveLink>> {
        let desc = self
            .first_available(direction, ctx)
            .ok_or(LinkError::NoTransportAvailable(direction))?;
        info!("Selected {} linkmod {}", direction, desc.name());
        desc.construct(ctx, queue.clone())
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tx: Vec<LinkmodDescriptor>,
    rx: Vec<LinkmodDescriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the list of the descriptor's own direction.
    pub fn register(mut self, desc: LinkmodDescriptor) -> Self {
        match desc.direction() {
            Direction::Tx => self.tx.push(desc),
            Direction::Rx => self.rx.push(desc),
        }
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            tx: self.tx,
            rx: self.rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::linkmod::Linkmod;
    use crate::simulator::SimPeripherals;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn context(config: LinkConfig) -> LinkContext {
        LinkContext::new(
            config.idle_poll(Duration::from_millis(1)),
            Arc::new(SimPeripherals::new()),
        )
    }

    fn fake(name: &str, available: bool, built: &Arc<AtomicUsize>) -> LinkmodDescriptor {
        let built = built.clone();
        LinkmodDescriptor::new(
            Direction::Tx,
            name,
            Arc::new(move |_: &LinkContext| available),
            Arc::new(move |ctx: &LinkContext, queue: FrameQueue| {
                built.fetch_add(1, Ordering::SeqCst);
                NullTx::new(ctx, queue).map(|l| Box::new(l) as Box<dyn ActiveLink>)
            }),
        )
    }

    #[test]
    fn test_standard_order() {
        let registry = Registry::standard();
        let names = |dir| {
            registry
                .descriptors(dir)
                .iter()
                .map(|d| d.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(Direction::Tx), ["print-tx", "files-tx", "console-tx", "null-tx"]);
        assert_eq!(names(Direction::Rx), ["scan-rx", "files-rx", "null-rx"]);
    }

    #[test]
    fn test_first_available_is_constructed_only() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let c = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .register(fake("a", false, &a))
            .register(fake("b", true, &b))
            .register(fake("c", true, &c))
            .build();

        let ctx = context(LinkConfig::new());
        let link = registry
            .select(Direction::Tx, &ctx, &FrameQueue::new())
            .expect("b is available");
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(c.load(Ordering::SeqCst), 0);
        link.shutdown().expect("clean shutdown");
    }

    #[test]
    fn test_nothing_available() {
        let a = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder().register(fake("a", false, &a)).build();
        let ctx = context(LinkConfig::new());

        let result = registry.select(Direction::Tx, &ctx, &FrameQueue::new());
        assert!(matches!(result, Err(LinkError::NoTransportAvailable(Direction::Tx))));

        let result = registry.select(Direction::Rx, &ctx, &FrameQueue::new());
        assert!(matches!(result, Err(LinkError::NoTransportAvailable(Direction::Rx))));
    }

    #[test]
    fn test_constructor_error_does_not_fall_through() {
        let later = Arc::new(AtomicUsize::new(0));
        let failing = LinkmodDescriptor::new(
            Direction::Tx,
            "broken",
            Arc::new(|_: &LinkContext| true),
            Arc::new(|_: &LinkContext, _: FrameQueue| -> Result<Box<dyn ActiveLink>> {
                Err(LinkError::InvalidConfiguration("broken".to_string()))
            }),
        );
        let registry = Registry::builder()
            .register(failing)
            .register(fake("later", true, &later))
            .build();

        let ctx = context(LinkConfig::new());
        let result = registry.select(Direction::Tx, &ctx, &FrameQueue::new());
        assert!(matches!(result, Err(LinkError::InvalidConfiguration(_))));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let registry = Registry::standard();
        let ctx = context(LinkConfig::new().files_tx("/tmp/out").camera_enabled(true));
        for _ in 0..3 {
            let tx = registry.first_available(Direction::Tx, &ctx).map(|d| d.name());
            let rx = registry.first_available(Direction::Rx, &ctx).map(|d| d.name());
            assert_eq!(tx, Some(FilesTx::NAME));
            assert_eq!(rx, Some(CameraRx::NAME));
        }
    }

    #[test]
    fn test_bare_environment_falls_back() {
        let registry = Registry::standard();
        let ctx = context(LinkConfig::new());
        assert_eq!(
            registry.first_available(Direction::Tx, &ctx).map(|d| d.name()),
            Some(ConsoleTx::NAME)
        );
        assert_eq!(
            registry.first_available(Direction::Rx, &ctx).map(|d| d.name()),
            Some(NullRx::NAME)
        );
    }
}
