//! Messages exchanged between callers and the worker thread.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};

use crate::crypto::CipherKey;
use crate::error::DecryptError;

/// Commands processed in arrival order by the worker thread.
pub(crate) enum Command {
    /// Make `(path, key)` the cached file. Replies with the payload length.
    Open {
        path: PathBuf,
        key: CipherKey,
        reply: oneshot::Sender<Result<u64, DecryptError>>,
    },
    /// Decrypt a range of the cached file, streaming frames to `reply`.
    Decrypt {
        start: Option<u64>,
        end: Option<u64>,
        reply: mpsc::UnboundedSender<Frame>,
    },
    Stats {
        reply: oneshot::Sender<WorkerStats>,
    },
    /// Close the cached handle and stop the worker.
    Shutdown,
}

/// One message on a Decrypt reply channel.
///
/// A successful stream is zero or more `Chunk`s followed by `End`; a failed
/// one ends with `Failed` instead.
#[derive(Debug)]
pub(crate) enum Frame {
    Chunk(Vec<u8>),
    End,
    Failed(DecryptError),
}

/// Counters describing how the worker's cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Files opened (cache misses that succeeded).
    pub opens: u64,
    /// Open commands that reused the cached handle.
    pub cache_hits: u64,
    /// Decrypt commands processed.
    pub requests: u64,
}
