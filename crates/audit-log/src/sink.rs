use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::entry::AuditEntry;
use crate::writer::{AuditWriteError, AuditWriter};

/// Channel buffer size used between producers and the background writer task.
const CHANNEL_BUFFER: usize = 1024;

/// Flush the writer after this much channel inactivity.
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Cloneable handle for submitting [`AuditEntry`] values to the background
/// writer.
///
/// The writer task exits, after a final flush, once every clone is dropped.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditEntry>,
}

impl AuditSink {
    /// Open the log file at `path` and spawn the writer task.
    ///
    /// Must be called from within a tokio runtime. I/O errors inside the task
    /// are logged via `tracing::error` and the entry is skipped.
    pub async fn start(path: impl AsRef<Path>) -> Result<(Self, JoinHandle<()>), AuditWriteError> {
        let writer = AuditWriter::open(path).await?;
        Ok(Self::spawn(writer))
    }

    /// Spawn the writer task over an arbitrary async writer.
    pub fn spawn<W>(mut writer: AuditWriter<W>) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<AuditEntry>(CHANNEL_BUFFER);
        let handle = tokio::spawn(async move {
            run_writer_loop(&mut writer, rx).await;
        });
        (Self { tx }, handle)
    }

    /// Send an entry, waiting for channel capacity if necessary.
    ///
    /// If the writer task has already exited the entry is dropped with a
    /// warning.
    pub async fn log(&self, entry: AuditEntry) {
        if let Err(err) = self.tx.send(entry).await {
            tracing::warn!(
                event_type = ?err.0.event_type,
                "audit sink channel closed, entry dropped"
            );
        }
    }

    /// Non-blocking variant of [`log`](Self::log) for synchronous callers.
    ///
    /// Returns `false` and drops the entry when the channel is full or closed.
    pub fn try_log(&self, entry: AuditEntry) -> bool {
        match self.tx.try_send(entry) {
            Ok(()) => true,
            Err(TrySendError::Full(entry)) => {
                tracing::warn!(event_type = ?entry.event_type, "audit sink full, entry dropped");
                false
            }
            Err(TrySendError::Closed(entry)) => {
                tracing::warn!(
                    event_type = ?entry.event_type,
                    "audit sink channel closed, entry dropped"
                );
                false
            }
        }
    }
}

/// Drain the channel into `writer`, flushing on idle and on close.
async fn run_writer_loop<W>(writer: &mut AuditWriter<W>, mut rx: mpsc::Receiver<AuditEntry>)
where
    W: AsyncWrite + Unpin,
{
    let mut dirty = false;

    loop {
        match tokio::time::timeout(FLUSH_INTERVAL, rx.recv()).await {
            Ok(Some(entry)) => {
                if let Err(err) = writer.write(&entry).await {
                    tracing::error!(%err, "failed to write audit entry");
                } else {
                    dirty = true;
                }
            }
            Ok(None) => {
                if dirty {
                    if let Err(err) = writer.flush().await {
                        tracing::error!(%err, "failed to flush audit log on shutdown");
                    }
                }
                tracing::debug!(written = writer.written(), "audit writer shutting down");
                return;
            }
            Err(_) => {
                if dirty {
                    if let Err(err) = writer.flush().await {
                        tracing::error!(%err, "periodic audit log flush failed");
                    } else {
                        dirty = false;
                    }
                }
            }
        }
    }
}
