//! Warm decryption worker.
//!
//! A dedicated thread owns the most recently used file handle, key, IV and
//! payload length. Callers talk to it only through an ordered command
//! channel, so the cached state is never touched concurrently. The file is
//! reopened only when a request names a different path or key.

mod protocol;
mod state;

pub use protocol::WorkerStats;
pub(crate) use protocol::{Command, Frame};

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::config::WorkerConfig;
use crate::crypto::{CipherKey, KeyInput};
use crate::error::DecryptError;
use state::WorkerLoop;

/// Opens the files the worker decrypts from.
///
/// The worker calls this on every cache miss; the handle then stays cached
/// until a request names a different file or key.
pub trait FileOpener: Send + 'static {
    type Handle: Read + Seek + Send;

    fn open(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// Opens files from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOpener;

impl FileOpener for FsOpener {
    type Handle = File;

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }
}

/// Handle to the background decryption worker.
///
/// Construct once with [`WarmWorker::spawn`] and stop with
/// [`WarmWorker::shutdown`]. Dropping the handle also stops the worker once
/// queued commands are done, without waiting for it.
pub struct WarmWorker {
    commands: mpsc::UnboundedSender<Command>,
    /// Held from a call's Open until its Decrypt is enqueued, so commands of
    /// concurrent calls never interleave.
    call_lock: Mutex<()>,
    config: WorkerConfig,
    thread: Option<JoinHandle<()>>,
}

impl WarmWorker {
    /// Start the worker thread reading from the local file system.
    pub fn spawn(config: WorkerConfig) -> Result<Self, DecryptError> {
        Self::spawn_with(config, FsOpener)
    }

    /// Start the worker thread with a custom [`FileOpener`].
    pub fn spawn_with<O: FileOpener>(config: WorkerConfig, opener: O) -> Result<Self, DecryptError> {
        config.validate()?;

        let (commands, receiver) = mpsc::unbounded_channel();
        let loop_config = config.clone();
        let thread = std::thread::Builder::new()
            .name("ctrseek-worker".to_string())
            .spawn(move || WorkerLoop::new(receiver, loop_config, opener).run())?;

        log::info!("Decrypt worker spawned (chunk size: {})", config.chunk_size);

        Ok(Self {
            commands,
            call_lock: Mutex::new(()),
            config,
            thread: Some(thread),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Open `path` with `key` ahead of time so the next request is a cache hit.
    ///
    /// Returns the payload length (file size minus the IV).
    pub async fn preload(
        &self,
        path: impl AsRef<Path>,
        key: impl Into<KeyInput>,
    ) -> Result<u64, DecryptError> {
        let key = key.into().decode()?;
        let path = path.as_ref().to_path_buf();

        let _guard = self.call_lock.lock().await;
        self.open(path, key).await
    }

    /// Snapshot of the worker's cache counters.
    pub async fn stats(&self) -> Result<WorkerStats, DecryptError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply })?;
        rx.await.map_err(|_| DecryptError::WorkerUnavailable)
    }

    /// Stop the worker and wait for its thread to exit.
    ///
    /// Commands already queued run first.
    pub fn shutdown(mut self) -> Result<(), DecryptError> {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| DecryptError::WorkerUnavailable)?;
        }
        log::info!("Decrypt worker shut down");
        Ok(())
    }

    /// Send Open and wait for the worker's reply. Caller must hold `call_lock`.
    pub(crate) async fn open(&self, path: PathBuf, key: CipherKey) -> Result<u64, DecryptError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Open { path, key, reply })?;
        rx.await.map_err(|_| DecryptError::WorkerUnavailable)?
    }

    pub(crate) fn send(&self, command: Command) -> Result<(), DecryptError> {
        self.commands
            .send(command)
            .map_err(|_| DecryptError::WorkerUnavailable)
    }

    pub(crate) fn call_lock(&self) -> &Mutex<()> {
        &self.call_lock
    }
}

impl Drop for WarmWorker {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}
