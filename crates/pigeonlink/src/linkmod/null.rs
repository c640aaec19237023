//! Carriers that move nothing. They anchor the end of both selection
//! lists so a daemon can always start.

use std::time::Duration;

use tracing::trace;

use crate::engine::{CancelToken, LoopAction, Runner, RunnerState, Worker};
use crate::error::Result;
use crate::linkmod::{Direction, LinkContext, Linkmod};
use crate::queue::FrameQueue;

pub struct NullRx {
    runner: Runner<NullRxWorker>,
}

impl Linkmod for NullRx {
    const NAME: &'static str = "null-rx";
    const DIRECTION: Direction = Direction::Rx;

    fn is_available(_ctx: &LinkContext) -> bool {
        true
    }

    fn new(ctx: &LinkContext, _queue: FrameQueue) -> Result<Self> {
        let worker = NullRxWorker {
            idle_poll: ctx.config().idle_poll_interval(),
        };
        Ok(Self {
            runner: Runner::start("linkmod-null-rx", worker)?,
        })
    }

    fn state(&self) -> RunnerState {
        self.runner.state()
    }

    fn shutdown(self) -> Result<()> {
        self.runner.stop()?.into_result().map(drop)
    }
}

struct NullRxWorker {
    idle_poll: Duration,
}

impl Worker for NullRxWorker {
    fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
        cancel.sleep(self.idle_poll);
        LoopAction::Continue
    }
}

pub struct NullTx {
    runner: Runner<NullTxWorker>,
}

impl Linkmod for NullTx {
    const NAME: &'static str = "null-tx";
    const DIRECTION: Direction = Direction::Tx;

    fn is_available(_ctx: &LinkContext) -> bool {
        true
    }

    fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let worker = NullTxWorker {
            queue,
            idle_poll: ctx.config().idle_poll_interval(),
        };
        Ok(Self {
            runner: Runner::start("linkmod-null-tx", worker)?,
        })
    }

    fn state(&self) -> RunnerState {
        self.runner.state()
    }

    fn shutdown(self) -> Result<()> {
        self.runner.stop()?.into_result().map(drop)
    }
}

struct NullTxWorker {
    queue: FrameQueue,
    idle_poll: Duration,
}

impl Worker for NullTxWorker {
    fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
        match self.queue.pop() {
            Some(frame) => trace!("[{}] dropped frame seq={}", NullTx::NAME, frame.sequence()),
            None => {
                cancel.sleep(self.idle_poll);
            }
        }
        LoopAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::frame::Frame;
    use crate::simulator::SimPeripherals;
    use std::sync::Arc;
    use std::thread;

    fn context() -> LinkContext {
        let config = LinkConfig::new().idle_poll(Duration::from_millis(1));
        LinkContext::new(config, Arc::new(SimPeripherals::new()))
    }

    #[test]
    fn test_null_tx_drains_queue() {
        let queue = FrameQueue::new();
        for i in 0..5u8 {
            queue.push(Frame::new(vec![i]).expect("small frame"));
        }
        let tx = NullTx::new(&context(), queue.clone()).expect("start null-tx");

        for _ in 0..200 {
            if queue.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(queue.is_empty());
        assert_eq!(Linkmod::state(&tx), RunnerState::Running);
        Linkmod::shutdown(tx).expect("clean shutdown");
    }

    #[test]
    fn test_null_rx_produces_nothing() {
        let queue = FrameQueue::new();
        let rx = NullRx::new(&context(), queue.clone()).expect("start null-rx");
        thread::sleep(Duration::from_millis(20));
        assert!(queue.is_empty());
        Linkmod::shutdown(rx).expect("clean shutdown");
    }
}
