//! Worker-thread state: the warm cache and the command loop.
//!
//! Everything here runs on the worker thread only. The cached handle, key,
//! IV and payload length are never visible to callers.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use super::protocol::{Command, Frame, WorkerStats};
use super::FileOpener;
use crate::config::WorkerConfig;
use crate::crypto::{CipherKey, AES_CTR_IV_SIZE};
use crate::error::DecryptError;
use crate::range::{read_header, ByteRange, RangeDecryptor};

/// The file currently held open by the worker.
struct OpenFile<H> {
    path: PathBuf,
    key: CipherKey,
    handle: H,
    iv: [u8; AES_CTR_IV_SIZE],
    payload_len: u64,
}

impl<H> OpenFile<H> {
    fn matches(&self, path: &Path, key: &CipherKey) -> bool {
        self.path.as_path() == path && &self.key == key
    }
}

enum WorkerState<H> {
    Idle,
    Ready(OpenFile<H>),
}

pub(crate) struct WorkerLoop<O: FileOpener> {
    commands: mpsc::UnboundedReceiver<Command>,
    config: WorkerConfig,
    opener: O,
    state: WorkerState<O::Handle>,
    stats: WorkerStats,
}

impl<O: FileOpener> WorkerLoop<O> {
    pub(crate) fn new(
        commands: mpsc::UnboundedReceiver<Command>,
        config: WorkerConfig,
        opener: O,
    ) -> Self {
        Self {
            commands,
            config,
            opener,
            state: WorkerState::Idle,
            stats: WorkerStats::default(),
        }
    }

    /// Process commands until `Shutdown` or until every sender is dropped.
    pub(crate) fn run(mut self) {
        log::debug!("Decrypt worker started (chunk size: {})", self.config.chunk_size);

        while let Some(command) = self.commands.blocking_recv() {
            match command {
                Command::Open { path, key, reply } => {
                    let result = self.open(path, key);
                    let _ = reply.send(result);
                }
                Command::Decrypt { start, end, reply } => {
                    self.stats.requests += 1;
                    self.decrypt(start, end, &reply);
                }
                Command::Stats { reply } => {
                    let _ = reply.send(self.stats);
                }
                Command::Shutdown => break,
            }
        }

        self.close();
        log::debug!("Decrypt worker stopped");
    }

    /// Reuse the cached file if `(path, key)` is unchanged, otherwise reopen.
    fn open(&mut self, path: PathBuf, key: CipherKey) -> Result<u64, DecryptError> {
        if let WorkerState::Ready(open) = &self.state {
            if open.matches(&path, &key) {
                self.stats.cache_hits += 1;
                log::debug!("Worker cache hit: {:?}", path);
                return Ok(open.payload_len);
            }
        }

        self.close();

        let mut handle = self.opener.open(&path).map_err(|e| {
            log::warn!("Failed to open {:?}: {}", path, e);
            DecryptError::from(e)
        })?;
        let header = read_header(&mut handle)?;

        self.stats.opens += 1;
        log::info!(
            "Worker opened {:?} (payload: {} bytes, AES-{})",
            path,
            header.payload_len,
            key.key_size() * 8
        );

        self.state = WorkerState::Ready(OpenFile {
            path,
            key,
            handle,
            iv: header.iv,
            payload_len: header.payload_len,
        });
        Ok(header.payload_len)
    }

    fn decrypt(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
        reply: &mpsc::UnboundedSender<Frame>,
    ) {
        let open = match &mut self.state {
            WorkerState::Ready(open) => open,
            WorkerState::Idle => {
                log::warn!("Decrypt requested with no open file");
                let _ = reply.send(Frame::Failed(DecryptError::NotOpened));
                return;
            }
        };

        let range = ByteRange::resolve(start, end, open.payload_len);
        let decryptor = match RangeDecryptor::with_payload_len(
            &mut open.handle,
            &open.key,
            &open.iv,
            range,
            open.payload_len,
            self.config.chunk_size,
        ) {
            Ok(decryptor) => decryptor,
            Err(e) => {
                let _ = reply.send(Frame::Failed(e));
                return;
            }
        };

        for chunk in decryptor {
            match chunk {
                Ok(chunk) => {
                    // Unbounded: a caller that stops reading never stalls the worker.
                    if reply.send(Frame::Chunk(chunk)).is_err() {
                        // Receiver dropped: nobody is reading any more.
                        log::debug!("Decrypt stream abandoned at {:?}", range);
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("Decrypt of {:?} failed: {}", open.path, e);
                    let _ = reply.send(Frame::Failed(e));
                    return;
                }
            }
        }

        let _ = reply.send(Frame::End);
    }

    fn close(&mut self) {
        if let WorkerState::Ready(open) = std::mem::replace(&mut self.state, WorkerState::Idle) {
            log::debug!("Worker closing {:?}", open.path);
        }
    }
}
