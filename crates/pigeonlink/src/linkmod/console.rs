use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::{CancelToken, LoopAction, Runner, RunnerState, Worker};
use crate::error::Result;
use crate::frame::Frame;
use crate::linkmod::{Direction, LinkContext, Linkmod};
use crate::peripheral::Peripherals;
use crate::queue::FrameQueue;

/// Dumps every outgoing frame to a diagnostic stream. Always available.
pub struct ConsoleTx {
    runner: Runner<ConsoleWorker>,
}

impl Linkmod for ConsoleTx {
    const NAME: &'static str = "console-tx";
    const DIRECTION: Direction = Direction::Tx;

    fn is_available(_ctx: &LinkContext) -> bool {
        true
    }

    fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let worker = ConsoleWorker::new(ctx, queue);
        Ok(Self {
            runner: Runner::start("linkmod-console-tx", worker)?,
        })
    }

    fn state(&self) -> RunnerState {
        self.runner.state()
    }

    fn shutdown(self) -> Result<()> {
        self.runner.stop()?.into_result().map(drop)
    }
}

pub struct ConsoleWorker {
    queue: FrameQueue,
    peripherals: Arc<dyn Peripherals>,
    sink: Option<Box<dyn Write + Send>>,
    idle_poll: Duration,
}

impl ConsoleWorker {
    pub fn new(ctx: &LinkContext, queue: FrameQueue) -> Self {
        Self {
            queue,
            peripherals: ctx.peripherals().clone(),
            sink: None,
            idle_poll: ctx.config().idle_poll_interval(),
        }
    }

    fn emit(&mut self, frame: &Frame) -> std::io::Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        writeln!(sink, "{}: Got next frame", ConsoleTx::NAME)?;
        frame.print_header(sink.as_mut())?;
        frame.print_data(sink.as_mut())?;
        sink.flush()
    }
}

impl Worker for ConsoleWorker {
    fn start(&mut self) -> Result<()> {
        self.sink = Some(self.peripherals.console());
        Ok(())
    }

    fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
        match self.queue.pop() {
            Some(frame) => {
                debug!("[{}] frame seq={} len={}", ConsoleTx::NAME, frame.sequence(), frame.len());
                if let Err(e) = self.emit(&frame) {
                    warn!("[{}] could not write frame: {}", ConsoleTx::NAME, e);
                }
            }
            None => {
                cancel.sleep(self.idle_poll);
            }
        }
        LoopAction::Continue
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(mut sink) = self.sink.take() {
            let _ = sink.flush();
        }
        Ok(())
    }
}
