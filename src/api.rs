//! Public request API: ranged reads through the warm worker.

use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;

use crate::crypto::KeyInput;
use crate::error::DecryptError;
use crate::range::ByteRange;
use crate::worker::{Command, Frame, WarmWorker};

impl WarmWorker {
    /// Decrypt `[start, end]` (inclusive, payload offsets) of `path`.
    ///
    /// `start` defaults to 0 and `end` to the last payload byte; `start > end`
    /// gives an empty stream. The key (base64 text or raw bytes) is decoded
    /// before anything is sent to the worker, so `InvalidKeyLength` and
    /// `TruncatedFile` are returned here rather than from the stream.
    ///
    /// The worker decrypts the whole range without waiting for the caller;
    /// chunks not yet read are buffered in the stream until it is dropped.
    pub async fn open_decrypt_read(
        &self,
        path: impl AsRef<Path>,
        key: impl Into<KeyInput>,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<DecryptStream, DecryptError> {
        let key = key.into().decode()?;
        let path = path.as_ref().to_path_buf();
        let (reply, frames) = mpsc::unbounded_channel();

        let payload_len = {
            let _guard = self.call_lock().lock().await;
            let payload_len = self.open(path, key).await?;
            self.send(Command::Decrypt { start, end, reply })?;
            payload_len
        };

        Ok(DecryptStream {
            frames,
            payload_len,
            range: ByteRange::resolve(start, end, payload_len).clamp_to(payload_len),
            done: false,
        })
    }
}

/// Lazy sequence of decrypted chunks produced by the worker.
///
/// Chunk boundaries carry no meaning; only the concatenated bytes do.
/// Usable as a [`Stream`], through [`DecryptStream::next`], or blocking via
/// [`DecryptStream::blocking_next`] outside an async runtime.
pub struct DecryptStream {
    frames: mpsc::UnboundedReceiver<Frame>,
    payload_len: u64,
    range: ByteRange,
    done: bool,
}

impl DecryptStream {
    /// Payload length of the file being read.
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// The requested range after defaults were applied, clamped to the payload.
    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub async fn next(&mut self) -> Option<Result<Vec<u8>, DecryptError>> {
        if self.done {
            return None;
        }
        let frame = self.frames.recv().await;
        self.on_frame(frame)
    }

    pub fn blocking_next(&mut self) -> Option<Result<Vec<u8>, DecryptError>> {
        if self.done {
            return None;
        }
        let frame = self.frames.blocking_recv();
        self.on_frame(frame)
    }

    /// Collect every remaining chunk into one buffer.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>, DecryptError> {
        let mut out = Vec::with_capacity(self.range.len().min(1 << 20) as usize);
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    fn on_frame(&mut self, frame: Option<Frame>) -> Option<Result<Vec<u8>, DecryptError>> {
        match frame {
            Some(Frame::Chunk(chunk)) => Some(Ok(chunk)),
            Some(Frame::End) => {
                self.done = true;
                None
            }
            Some(Frame::Failed(e)) => {
                self.done = true;
                Some(Err(e))
            }
            // Channel closed without an end marker: the worker went away.
            None => {
                self.done = true;
                Some(Err(DecryptError::WorkerUnavailable))
            }
        }
    }
}

impl Stream for DecryptStream {
    type Item = Result<Vec<u8>, DecryptError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.frames.poll_recv(cx) {
            Poll::Ready(frame) => Poll::Ready(this.on_frame(frame)),
            Poll::Pending => Poll::Pending,
        }
    }
}
