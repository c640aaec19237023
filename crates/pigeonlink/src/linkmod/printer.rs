use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::{CancelToken, LoopAction, Runner, RunnerState, Worker};
use crate::error::{LinkError, Result};
use crate::frame::Frame;
use crate::linkmod::{Direction, LinkContext, Linkmod};
use crate::peripheral::{Notifier, PrintSink, UiAction};
use crate::queue::FrameQueue;

/// Sends each frame's payload to a print queue, for the far side to scan.
pub struct PrinterTx {
    runner: Runner<PrinterWorker>,
}

impl Linkmod for PrinterTx {
    const NAME: &'static str = "print-tx";
    const DIRECTION: Direction = Direction::Tx;

    fn is_available(ctx: &LinkContext) -> bool {
        ctx.config().printer_queue().is_some()
    }

    fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let worker = PrinterWorker::new(ctx, queue)?;
        Ok(Self {
            runner: Runner::start("linkmod-printer-tx", worker)?,
        })
    }

    fn state(&self) -> RunnerState {
        self.runner.state()
    }

    fn shutdown(self) -> Result<()> {
        self.runner.stop()?.into_result().map(drop)
    }
}

pub struct PrinterWorker {
    queue: FrameQueue,
    sink: Box<dyn PrintSink>,
    notifier: Arc<dyn Notifier>,
    idle_poll: Duration,
    pending: Option<Frame>,
}

impl PrinterWorker {
    pub fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let name = ctx.config().printer_queue().ok_or_else(|| LinkError::Unavailable {
            name: PrinterTx::NAME.to_string(),
        })?;
        Ok(Self {
            queue,
            sink: ctx.peripherals().printer(name),
            notifier: ctx.peripherals().notifier(),
            idle_poll: ctx.config().idle_poll_interval(),
            pending: None,
        })
    }
}

impl Worker for PrinterWorker {
    fn start(&mut self) -> Result<()> {
        self.sink.open().map_err(|e| LinkError::StartFailed {
            name: PrinterTx::NAME.to_string(),
            reason: e.to_string(),
        })?;
        info!("[{}] printer ready", PrinterTx::NAME);
        Ok(())
    }

    fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
        let Some(frame) = self.pending.take().or_else(|| self.queue.pop()) else {
            cancel.sleep(self.idle_poll);
            return LoopAction::Continue;
        };

        match self.sink.print(frame.payload()) {
            Ok(()) => {
                debug!("[{}] printed frame seq={}", PrinterTx::NAME, frame.sequence());
                self.notifier.notify(UiAction::TxSuccess);
            }
            Err(e) => {
                warn!("[{}] print failed: {}", PrinterTx::NAME, e);
                self.pending = Some(frame);
                self.notifier.notify(UiAction::TxRetry);
                cancel.sleep(self.idle_poll);
            }
        }
        LoopAction::Continue
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(frame) = self.pending.take() {
            warn!("[{}] discarding unprinted frame seq={}", PrinterTx::NAME, frame.sequence());
        }
        self.sink.close().map_err(|e| LinkError::StopFailed {
            name: PrinterTx::NAME.to_string(),
            reason: e.to_string(),
        })
    }
}
