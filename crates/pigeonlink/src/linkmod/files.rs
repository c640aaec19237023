//! Frames carried as files in a directory, typically on removable media.
//!
//! Each frame is one `*.pgf` file holding its encoded wire bytes. Writers
//! go through a hidden `.tmp` file and rename, so a reader never sees a
//! partial frame.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::engine::{CancelToken, LoopAction, Runner, RunnerState, Worker};
use crate::error::{LinkError, Result};
use crate::frame::Frame;
use crate::linkmod::{Direction, LinkContext, Linkmod};
use crate::peripheral::{Notifier, UiAction};
use crate::queue::FrameQueue;

pub const FRAME_EXTENSION: &str = "pgf";
pub const REJECTED_EXTENSION: &str = "rejected";

pub struct FilesTx {
    runner: Runner<FilesTxWorker>,
}

impl Linkmod for FilesTx {
    const NAME: &'static str = "files-tx";
    const DIRECTION: Direction = Direction::Tx;

    fn is_available(ctx: &LinkContext) -> bool {
        ctx.config().files_tx_dir().is_some()
    }

    fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let worker = FilesTxWorker::new(ctx, queue)?;
        Ok(Self {
            runner: Runner::start("linkmod-files-tx", worker)?,
        })
    }

    fn state(&self) -> RunnerState {
        self.runner.state()
    }

    fn shutdown(self) -> Result<()> {
        self.runner.stop()?.into_result().map(drop)
    }
}

pub struct FilesTxWorker {
    queue: FrameQueue,
    dir: PathBuf,
    notifier: Arc<dyn Notifier>,
    idle_poll: Duration,
    pending: Option<Frame>,
    dir_missing: bool,
}

impl FilesTxWorker {
    pub fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let dir = ctx.config().files_tx_dir().ok_or_else(|| LinkError::Unavailable {
            name: FilesTx::NAME.to_string(),
        })?;
        Ok(Self {
            queue,
            dir: dir.to_path_buf(),
            notifier: ctx.peripherals().notifier(),
            idle_poll: ctx.config().idle_poll_interval(),
            pending: None,
            dir_missing: false,
        })
    }

    fn dir_ready(&mut self) -> bool {
        let ready = self.dir.is_dir();
        if ready && self.dir_missing {
            info!("[{}] {} is back", FilesTx::NAME, self.dir.display());
        } else if !ready && !self.dir_missing {
            info!("[{}] waiting for {}", FilesTx::NAME, self.dir.display());
        }
        self.dir_missing = !ready;
        ready
    }
}

impl Worker for FilesTxWorker {
    fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
        let Some(frame) = self.pending.take().or_else(|| self.queue.pop()) else {
            cancel.sleep(self.idle_poll);
            return LoopAction::Continue;
        };

        if !self.dir_ready() {
            self.pending = Some(frame);
            cancel.sleep(self.idle_poll);
            return LoopAction::Continue;
        }

        match write_frame(&self.dir, &frame) {
            Ok(path) => {
                debug!("[{}] wrote {}", FilesTx::NAME, path.display());
                self.notifier.notify(UiAction::TxSuccess);
            }
            Err(e) => {
                warn!("[{}] write to {} failed: {}", FilesTx::NAME, self.dir.display(), e);
                self.pending = Some(frame);
                self.notifier.notify(UiAction::TxRetry);
                cancel.sleep(self.idle_poll);
            }
        }
        LoopAction::Continue
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(frame) = self.pending.take() {
            warn!("[{}] discarding unwritten frame seq={}", FilesTx::NAME, frame.sequence());
        }
        Ok(())
    }
}

pub struct FilesRx {
    runner: Runner<FilesRxWorker>,
}

impl Linkmod for FilesRx {
    const NAME: &'static str = "files-rx";
    const DIRECTION: Direction = Direction::Rx;

    fn is_available(ctx: &LinkContext) -> bool {
        ctx.config().files_rx_dir().is_some()
    }

    fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let worker = FilesRxWorker::new(ctx, queue)?;
        Ok(Self {
            runner: Runner::start("linkmod-files-rx", worker)?,
        })
    }

    fn state(&self) -> RunnerState {
        self.runner.state()
    }

    fn shutdown(self) -> Result<()> {
        self.runner.stop()?.into_result().map(drop)
    }
}

pub struct FilesRxWorker {
    queue: FrameQueue,
    dir: PathBuf,
    notifier: Arc<dyn Notifier>,
    idle_poll: Duration,
}

impl FilesRxWorker {
    pub fn new(ctx: &LinkContext, queue: FrameQueue) -> Result<Self> {
        let dir = ctx.config().files_rx_dir().ok_or_else(|| LinkError::Unavailable {
            name: FilesRx::NAME.to_string(),
        })?;
        Ok(Self {
            queue,
            dir: dir.to_path_buf(),
            notifier: ctx.peripherals().notifier(),
            idle_poll: ctx.config().idle_poll_interval(),
        })
    }

    fn take(&self, path: &Path) {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!("[{}] read {} failed: {}", FilesRx::NAME, path.display(), e);
                return;
            }
        };

        let frame = match Frame::decode(&bytes) {
            Ok(f) => f,
            Err(e) => {
                warn!("[{}] rejecting {}: {}", FilesRx::NAME, path.display(), e);
                if let Err(e) = fs::rename(path, path.with_extension(REJECTED_EXTENSION)) {
                    warn!("[{}] could not set aside {}: {}", FilesRx::NAME, path.display(), e);
                }
                return;
            }
        };

        // Remove before pushing: a file that cannot be removed would
        // otherwise be delivered again on every pass.
        if let Err(e) = fs::remove_file(path) {
            warn!("[{}] remove {} failed: {}", FilesRx::NAME, path.display(), e);
            return;
        }

        debug!("[{}] read frame seq={} from {}", FilesRx::NAME, frame.sequence(), path.display());
        self.queue.push(frame);
        self.notifier.notify(UiAction::RxSuccess);
    }
}

impl Worker for FilesRxWorker {
    fn poll(&mut self, cancel: &CancelToken) -> LoopAction {
        if self.dir.is_dir() {
            for path in frame_files(&self.dir) {
                if cancel.is_cancelled() {
                    break;
                }
                self.take(&path);
            }
        }
        cancel.sleep(self.idle_poll);
        LoopAction::Continue
    }
}

/// Frame files directly inside `dir`, in file-name order.
pub fn frame_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == FRAME_EXTENSION))
        .map(|e| e.into_path())
        .collect()
}

/// Writes `frame` into `dir` and returns the final path.
pub fn write_frame(dir: &Path, frame: &Frame) -> io::Result<PathBuf> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let stem = format!("frame-{:013}-{:010}", millis, frame.sequence());
    write_frame_as(dir, &stem, frame)
}

/// Writes `<stem>.pgf` through a hidden temp file. On any failure the temp
/// file is removed, so a full or yanked medium does not collect leftovers.
fn write_frame_as(dir: &Path, stem: &str, frame: &Frame) -> io::Result<PathBuf> {
    let tmp = dir.join(format!(".{}.tmp", stem));
    let dest = dir.join(format!("{}.{}", stem, FRAME_EXTENSION));

    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(&frame.encode())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &dest)
    });

    if let Err(e) = written {
        if tmp.exists() {
            if let Err(rm) = fs::remove_file(&tmp) {
                warn!("[{}] could not remove {}: {}", FilesTx::NAME, tmp.display(), rm);
            }
        }
        return Err(e);
    }
    Ok(dest)
}
