use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::{CancelToken, LoopAction, Runner, RunnerState, Worker};
use crate::error::{LinkError, Result};
use crate::frame::Frame;
use crate::linkmod::{Direction, LinkContext, Linkmod};
use crate::peripheral::{BarcodeReader, MotionSensor, Notifier, UiAction};
use crate::queue::FrameQueue;

/// Receives frames by scanning printed barcodes.
///
/// Waits for a vertical joystick deflection, then runs one capture. Enabled
/// by the presence of `PIGEOND_CAMERA_RX`.
pub struct CameraRx {
    runner: Runner<CameraWorker>,
}

impl Linkmod for CameraRx {
    const NAME: &'static str = "scan-rx";
    const DIRECTION: Direction = Direction::Rx;

    fn is_available(ctx: &LinkContext) -> bool {
        ctx.config().is_camera_enabled()
    }

    fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let worker = CameraWorker::new(ctx, queue)?;
        Ok(Self {
            runner: Runner::start("linkmod-camera-rx", worker)?,
        })
    }

    fn state(&self) -> RunnerState {
        self.runner.state()
    }

    fn shutdown(self) -> Result<()> {
        self.runner.stop()?.into_result().map(drop)
    }
}

pub struct CameraWorker {
    queue: FrameQueue,
    sensor: Box<dyn MotionSensor>,
    reader: Box<dyn BarcodeReader>,
    notifier: Arc<dyn Notifier>,
    input_poll: Duration,
    sensor_failing: bool,
}

impl CameraWorker {
    pub fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let peripherals = ctx.peripherals();
        Ok(Self {
            queue,
            sensor: peripherals.motion_sensor(ctx.config()),
            reader: peripherals.barcode_reader(ctx.config())?,
            notifier: peripherals.notifier(),
            input_poll: ctx.config().input_poll_interval(),
            sensor_failing: false,
        })
    }

    fn scan(&mut self, cancel: &CancelToken) {
        let buffer = match self.reader.capture(cancel) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("[{}] capture failed: {}", CameraRx::NAME, e);
                self.notifier.notify(UiAction::RxRetry);
                return;
            }
        };

        if buffer.is_empty() {
            if cancel.is_cancelled() {
                debug!("[{}] scan abandoned for shutdown", CameraRx::NAME);
            } else {
                self.notifier.notify(UiAction::RxRetry);
            }
            return;
        }

        match Frame::from_capture(buffer) {
            Ok(frame) => {
                debug!("[{}] captured frame seq={} len={}", CameraRx::NAME, frame.sequence(), frame.len());
                self.queue.push(frame);
                self.notifier.notify(UiAction::RxSuccess);
            }
            Err(e) => {
                warn!("[{}] capture rejected: {}", CameraRx::NAME, e);
                self.notifier.notify(UiAction::RxRetry);
            }
        }
    }
}

impl Worker for CameraWorker {
    fn start(&mut self) -> Result<()> {
        self.sensor.open().map_err(|e| LinkError::StartFailed {
            name: CameraRx::NAME.to_string(),
            reason: format!("input device: {}", e),
        })
    }

    fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
        let motion = match self.sensor.motion() {
            Ok(m) => {
                if self.sensor_failing {
                    info!("[{}] input device recovered", CameraRx::NAME);
                    self.sensor_failing = false;
                }
                m
            }
            Err(e) => {
                if !self.sensor_failing {
                    warn!("[{}] input device read failed: {}", CameraRx::NAME, e);
                    self.sensor_failing = true;
                }
                cancel.sleep(self.input_poll);
                return LoopAction::Continue;
            }
        };

        if motion.is_trigger() {
            debug!("[{}] scan triggered", CameraRx::NAME);
            self.scan(cancel);
        } else {
            cancel.sleep(self.input_poll);
        }
        LoopAction::Continue
    }

    fn stop(&mut self) -> Result<()> {
        self.sensor.close().map_err(|e| LinkError::StopFailed {
            name: CameraRx::NAME.to_string(),
            reason: format!("input device: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::peripheral::{Peripherals, PrintSink, SystemPeripherals};
    use crate::simulator::SimPeripherals;
    use std::time::Instant;

    fn context(sim: &SimPeripherals) -> LinkContext {
        LinkContext::new(
            LinkConfig::new()
                .camera_enabled(true)
                .input_poll(Duration::from_millis(1)),
            Arc::new(sim.clone()),
        )
    }

    #[test]
    fn test_probe_follows_toggle() {
        let sim = SimPeripherals::new();
        assert!(CameraRx::is_available(&context(&sim)));

        let off = LinkContext::new(LinkConfig::new(), Arc::new(sim));
        assert!(!CameraRx::is_available(&off));
    }

    #[test]
    fn test_empty_captures_retry_then_push_once() {
        let sim = SimPeripherals::new()
            .hold_trigger()
            .with_captures([vec![], vec![], vec![1, 2, 3, 4, 5]]);
        let queue = FrameQueue::new();
        let mut worker = CameraWorker::new(&context(&sim), queue.clone()).unwrap();
        worker.start().unwrap();

        let cancel = CancelToken::new();
        for _ in 0..3 {
            assert_eq!(worker.poll(&cancel), LoopAction::Continue);
        }

        assert_eq!(
            sim.notifications(),
            vec![UiAction::RxRetry, UiAction::RxRetry, UiAction::RxSuccess]
        );
        let frame = queue.pop().expect("one frame");
        assert_eq!(frame.payload(), &[1, 2, 3, 4, 5]);
        assert!(queue.pop().is_none());

        worker.stop().unwrap();
        assert_eq!(sim.sensor_closes(), 1);
    }

    #[test]
    fn test_no_capture_without_vertical_motion() {
        let sim = SimPeripherals::new()
            .with_motion([0, 0, 0])
            .with_captures([vec![9]]);
        let queue = FrameQueue::new();
        let mut worker = CameraWorker::new(&context(&sim), queue.clone()).unwrap();
        worker.start().unwrap();

        let cancel = CancelToken::new();
        for _ in 0..3 {
            worker.poll(&cancel);
        }
        assert!(queue.is_empty());
        assert!(sim.notifications().is_empty());
        assert_eq!(sim.captures_remaining(), 1);
    }

    #[test]
    fn test_trigger_after_idle_motion() {
        let sim = SimPeripherals::new()
            .with_motion([0, 0, -300])
            .with_captures([b"scan".to_vec()]);
        let queue = FrameQueue::new();
        let mut worker = CameraWorker::new(&context(&sim), queue.clone()).unwrap();
        worker.start().unwrap();

        let cancel = CancelToken::new();
        for _ in 0..3 {
            worker.poll(&cancel);
        }
        assert_eq!(queue.pop().map(|f| f.into_payload()), Some(b"scan".to_vec()));
    }

    #[test]
    fn test_sensor_open_failure_fails_start() {
        let sim = SimPeripherals::new().fail_sensor_open();
        let mut worker = CameraWorker::new(&context(&sim), FrameQueue::new()).unwrap();
        assert!(matches!(worker.start(), Err(LinkError::StartFailed { .. })));
    }

    /// Simulated joystick in front of the real scan command.
    #[cfg(unix)]
    struct RealScanner(SimPeripherals);

    #[cfg(unix)]
    impl Peripherals for RealScanner {
        fn motion_sensor(&self, config: &LinkConfig) -> Box<dyn MotionSensor> {
            self.0.motion_sensor(config)
        }

        fn barcode_reader(&self, config: &LinkConfig) -> Result<Box<dyn BarcodeReader>> {
            SystemPeripherals.barcode_reader(config)
        }

        fn printer(&self, queue: &str) -> Box<dyn PrintSink> {
            self.0.printer(queue)
        }

        fn console(&self) -> Box<dyn std::io::Write + Send> {
            self.0.console()
        }

        fn notifier(&self) -> Arc<dyn Notifier> {
            self.0.notifier()
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_shutdown_interrupts_scan_in_flight() {
        let sim = SimPeripherals::new().hold_trigger();
        let config = LinkConfig::new()
            .camera_enabled(true)
            .scan_command("sleep 3")
            .input_poll(Duration::from_millis(5));
        let ctx = LinkContext::new(config, Arc::new(RealScanner(sim.clone())));
        let rx = CameraRx::new(&ctx, FrameQueue::new()).expect("start scan-rx");

        std::thread::sleep(Duration::from_millis(100));
        let start = Instant::now();
        Linkmod::shutdown(rx).expect("clean shutdown");

        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(sim.notifications().is_empty());
        assert_eq!(sim.sensor_closes(), 1);
    }
}
