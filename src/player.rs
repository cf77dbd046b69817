//! The playback state machine and its worker thread.
//!
//! A [`Controller`] owns the playlist, the current source, and the sink. Every operation, and
//! every tick of the worker, runs under a single mutex, so transitions never interleave.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context as _, ensure};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, error, error_span, info, trace, warn};

use crate::brightness::Brightness;
use crate::playlist::{PlayMode, Playlist};
use crate::sink::FrameSink;
use crate::source::{AnimationSource, Pull, SourceLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

impl PlayerState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Worker {
    handle: JoinHandle<()>,
    /// Dropped to cancel the worker.
    cancel: Sender<()>,
}

struct Inner {
    state: PlayerState,
    playlist: Playlist,
    cursor: usize,
    fps: u32,
    source: Option<Box<dyn AnimationSource>>,
    sink: Box<dyn FrameSink>,
    loader: Box<dyn SourceLoader>,
    worker: Option<Worker>,
    /// Cleared by the worker itself when it exits on its own.
    running: bool,
}

pub struct Controller {
    shared: Arc<Mutex<Inner>>,
}

fn lock(shared: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Controller {
    pub fn new(
        playlist: Playlist,
        sink: Box<dyn FrameSink>,
        loader: Box<dyn SourceLoader>,
        fps: u32,
    ) -> anyhow::Result<Self> {
        ensure!(fps > 0, "fps must be at least 1");

        let inner = Inner {
            state: PlayerState::Stopped,
            playlist,
            cursor: 0,
            fps,
            source: None,
            sink,
            loader,
            worker: None,
            running: false,
        };

        Ok(Self {
            shared: Arc::new(Mutex::new(inner)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.shared)
    }

    pub fn state(&self) -> PlayerState {
        self.lock().state
    }

    pub fn play(&self) -> anyhow::Result<()> {
        let mut inner = self.lock();
        self.start(&mut inner)
    }

    fn start(&self, inner: &mut Inner) -> anyhow::Result<()> {
        if inner.state == PlayerState::Playing {
            return Ok(());
        }

        if !inner.running {
            // A worker that stopped itself has already released the lock for good.
            if let Some(finished) = inner.worker.take() {
                drop(finished.cancel);
                if finished.handle.join().is_err() {
                    error!("playback worker panicked");
                }
            }

            let (cancel, cancelled) = channel::bounded(0);
            let shared = Arc::clone(&self.shared);
            let span = error_span!("playback");

            let handle = thread::Builder::new()
                .name("playback".to_owned())
                .spawn(move || span.in_scope(|| playback_loop(&shared, &cancelled)))
                .context("failed to spawn playback worker")?;

            inner.worker = Some(Worker { handle, cancel });
            inner.running = true;
        }

        info!("playing");
        inner.state = PlayerState::Playing;
        Ok(())
    }

    /// Idle the worker without releasing the current source.
    pub fn pause(&self) {
        let mut inner = self.lock();
        if inner.state != PlayerState::Paused {
            info!("paused");
            inner.state = PlayerState::Paused;
        }
    }

    pub fn resume(&self) -> anyhow::Result<()> {
        let mut inner = self.lock();
        if inner.state == PlayerState::Paused {
            self.start(&mut inner)?;
        }
        Ok(())
    }

    /// Stop playback, blank the output, and wait for the worker to exit.
    pub fn stop(&self) {
        let handle = {
            let mut inner = self.lock();
            if inner.state != PlayerState::Stopped {
                info!("stopped");
            }
            inner.halt();
            inner.running = false;

            inner.worker.take().map(|Worker { handle, cancel }| {
                drop(cancel);
                handle
            })
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("playback worker panicked");
            }
            debug!("playback worker joined");
        }
    }

    /// Stop and release the output for good.
    pub fn shutdown(&self) {
        self.stop();
        self.lock().sink.close();
    }

    pub fn next(&self) -> anyhow::Result<()> {
        self.lock().step(1)
    }

    pub fn prev(&self) -> anyhow::Result<()> {
        self.lock().step(-1)
    }

    pub fn restart(&self) -> anyhow::Result<()> {
        let mut inner = self.lock();
        if inner.playlist.is_empty() {
            debug!("playlist is empty, nothing to restart");
            return Ok(());
        }
        inner.load()
    }

    pub fn seek(&self, frame: u64) -> anyhow::Result<()> {
        let mut inner = self.lock();
        let source = inner.source.as_mut().context("nothing is loaded")?;
        source.seek(frame)?;
        debug!("seeked to frame {frame}");
        Ok(())
    }

    pub fn brightness(&self) -> Brightness {
        self.lock().sink.brightness()
    }

    pub fn set_brightness(&self, brightness: Brightness) {
        debug!("brightness set to {brightness}");
        self.lock().sink.set_brightness(brightness);
    }

    pub fn fps(&self) -> u32 {
        self.lock().fps
    }

    pub fn set_fps(&self, fps: u32) -> anyhow::Result<()> {
        ensure!(fps > 0, "fps must be at least 1");
        debug!("fps set to {fps}");
        self.lock().fps = fps;
        Ok(())
    }

    pub fn mode(&self) -> PlayMode {
        self.lock().playlist.mode()
    }

    pub fn set_mode(&self, mode: PlayMode) {
        debug!("play mode set to {mode}");
        self.lock().playlist.set_mode(mode);
    }

    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    /// The name of the entry under the cursor.
    pub fn current_media(&self) -> Option<String> {
        let inner = self.lock();
        inner
            .playlist
            .get(inner.cursor)
            .map(|entry| entry.name().to_owned())
    }

    pub fn is_worker_running(&self) -> bool {
        self.lock().running
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps))
    }

    fn tick(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }

        if self.source.is_none() && !self.playlist.is_empty() {
            if let Err(err) = self.load() {
                error!("{err:#}");
                self.finish_entry();
                return;
            }
        }

        let Some(source) = self.source.as_mut() else {
            return;
        };

        match source.pull() {
            Ok(Pull::Frame(frame)) => {
                if let Err(err) = self.sink.send(frame) {
                    warn!("dropped frame: {err}");
                }
            }
            Ok(Pull::Underrun) => trace!("source underrun"),
            Ok(Pull::Exhausted) => {
                debug!("end of stream");
                self.finish_entry();
            }
            Err(err) => {
                error!("failed to read frame: {err:#}");
                self.finish_entry();
            }
        }
    }

    /// Release the source and reset to the top of the playlist.
    fn halt(&mut self) {
        let was_stopped = self.state == PlayerState::Stopped;

        self.state = PlayerState::Stopped;
        self.source = None;
        self.cursor = 0;

        if !was_stopped {
            if let Err(err) = self.sink.clear() {
                warn!("failed to clear output: {err}");
            }
        }
    }

    /// Move the cursor by `offset`, wrapping, and load the entry there.
    fn step(&mut self, offset: isize) -> anyhow::Result<()> {
        let len = self.playlist.len();
        if len == 0 {
            debug!("playlist is empty, nothing to skip to");
            return Ok(());
        }

        self.cursor = if offset < 0 {
            (self.cursor + len - offset.unsigned_abs() % len) % len
        } else {
            (self.cursor + offset.unsigned_abs()) % len
        };
        self.load()
    }

    fn load(&mut self) -> anyhow::Result<()> {
        self.source = None;

        let Some(entry) = self.playlist.get(self.cursor) else {
            return Ok(());
        };

        info!("loading {}", entry.name());
        let source = self
            .loader
            .open(entry)
            .with_context(|| format!("failed to load {}", entry.filepath().display()))?;
        self.source = Some(source);

        Ok(())
    }

    fn finish_entry(&mut self) {
        self.source = None;

        let result = match self.playlist.mode() {
            PlayMode::RepeatOne => self.load(),
            PlayMode::Repeat => self.step(1),
            PlayMode::RepeatNone if self.cursor + 1 < self.playlist.len() => self.step(1),
            PlayMode::RepeatNone => {
                info!("reached the end of the playlist");
                self.halt();
                Ok(())
            }
        };

        if let Err(err) = result {
            error!("{err:#}");
        }
    }
}

fn playback_loop(shared: &Mutex<Inner>, cancelled: &Receiver<()>) {
    debug!("playback worker started");

    loop {
        let started = Instant::now();

        let period = {
            let mut inner = lock(shared);

            if let Err(TryRecvError::Disconnected) = cancelled.try_recv() {
                break;
            }

            if inner.state == PlayerState::Stopped {
                inner.running = false;
                break;
            }

            inner.tick();
            inner.period()
        };

        match cancelled.recv_deadline(started + period) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("playback worker exited");
}
