//! A durable, single-writer/single-reader FIFO queue backed by rolling data files on the local
//! filesystem.
//!
//! A [`DiskQueue`] absorbs bursts of traffic for a higher-level broker: producers call
//! [`DiskQueue::put`] to append opaque byte strings, and a consumer drains them in order from
//! [`DiskQueue::read_chan`]. The queue survives process restarts and quarantines, rather than
//! panics on, localized on-disk corruption.
//!
//! All mutable state -- cursors, open file handles -- is owned by a single background thread;
//! every other method here is a rendezvous hand-off to that thread.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
extern crate tracing;

mod config;
mod cursor;
mod diagnostic;
mod durability;
mod error;
mod fast_forward;
mod files;
mod metadata;
mod pool;
mod reader;
mod record;
mod worker;

pub use config::{Config, ConfigBuilder, ConfigError};
pub use diagnostic::{advance_read_cursor_by_one, load_snapshot, QueueSnapshot};
pub use error::{QueueError, Result};

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use pool::BufferPool;
use worker::Request;

/// A durable FIFO queue over a directory of rolling data files.
///
/// Construction attempts to load existing metadata from `config.data_dir()`; a missing metadata
/// file simply means the queue starts fresh with all cursors at zero. Cloning is not supported --
/// wrap a `DiskQueue` in an `Arc` to share it between a producer and a consumer thread.
pub struct DiskQueue {
    name: String,
    req_tx: Sender<Request>,
    read_rx: Receiver<Vec<u8>>,
    pool: Arc<BufferPool>,
    depth: Arc<AtomicI64>,

    /// Serializes `close`/`delete` against every other public entry point, mirroring the
    /// exit-coordination lock described for the queue's concurrency model: shared for ordinary
    /// requests, exclusive for teardown.
    exit_lock: RwLock<()>,
    exit_flag: AtomicBool,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl DiskQueue {
    /// Opens (or creates) a queue over `config.data_dir()`.
    pub fn new(config: Config) -> Self {
        let name = config.name().to_owned();
        let pool = Arc::new(BufferPool::new(config.max_msg_size()));
        let depth = Arc::new(AtomicI64::new(0));

        let (req_tx, read_rx, handle) = worker::spawn(config, Arc::clone(&depth), Arc::clone(&pool));

        Self {
            name,
            req_tx,
            read_rx,
            pool,
            depth,
            exit_lock: RwLock::new(()),
            exit_flag: AtomicBool::new(false),
            handle: parking_lot::Mutex::new(Some(handle)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `payload`. Rejected with [`QueueError::Exiting`] after `close`/`delete`, or with
    /// [`QueueError::InvalidMessageSize`] if outside the configured bounds -- in neither case is
    /// any state changed.
    pub fn put(&self, payload: Vec<u8>) -> Result<()> {
        let _guard = self.exit_lock.read();
        if self.exit_flag.load(Ordering::SeqCst) {
            return Err(QueueError::Exiting);
        }

        let (resp_tx, resp_rx) = crossbeam_channel::bounded(0);
        if self
            .req_tx
            .send(Request::Put { payload, resp: resp_tx })
            .is_err()
        {
            return Err(QueueError::Exiting);
        }
        resp_rx.recv().map_err(|_| QueueError::Exiting)?
    }

    /// The channel the consumer receives records from, in enqueue order, one at a time.
    ///
    /// Receiving from this channel is the commit point: a record handed off here will not be
    /// redelivered unless the process crashes before the next successful receive.
    pub fn read_chan(&self) -> &Receiver<Vec<u8>> {
        &self.read_rx
    }

    /// Returns a consumer-owned buffer to the pool for reuse. Silently ignored unless its
    /// capacity equals the configured maximum message size.
    pub fn buffer_pool_put(&self, buf: Vec<u8>) {
        let _guard = self.exit_lock.read();
        if self.exit_flag.load(Ordering::SeqCst) {
            self.pool.release(buf);
            return;
        }
        let _ = self.req_tx.send(Request::BufferPoolPut { buf });
    }

    /// Instantaneous, approximate count of undelivered records.
    pub fn depth(&self) -> i64 {
        self.depth.load(Ordering::SeqCst)
    }

    /// Discards all pending records. `depth()` is `0` once this returns, and the data directory
    /// holds only a fresh, empty write file.
    pub fn empty(&self) -> Result<()> {
        let _guard = self.exit_lock.read();
        if self.exit_flag.load(Ordering::SeqCst) {
            return Err(QueueError::Exiting);
        }

        let (resp_tx, resp_rx) = crossbeam_channel::bounded(0);
        if self.req_tx.send(Request::Empty { resp: resp_tx }).is_err() {
            return Err(QueueError::Exiting);
        }
        resp_rx.recv().map_err(|_| QueueError::Exiting)?
    }

    /// Advances the read cursor past every record for which `predicate` returns `true`, stopping
    /// at the first one for which it returns `false`, without delivering any of them to the
    /// consumer.
    pub fn fast_forward<F>(&self, predicate: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> bool + Send + 'static,
    {
        let _guard = self.exit_lock.read();
        if self.exit_flag.load(Ordering::SeqCst) {
            return Err(QueueError::Exiting);
        }

        let (resp_tx, resp_rx) = crossbeam_channel::bounded(0);
        let request = Request::FastForward {
            predicate: Box::new(predicate),
            resp: resp_tx,
        };
        if self.req_tx.send(request).is_err() {
            return Err(QueueError::Exiting);
        }
        resp_rx.recv().map_err(|_| QueueError::Exiting)?
    }

    /// Persists a final sync and stops the queue. Subsequent calls to any other method return
    /// [`QueueError::Exiting`].
    pub fn close(self) -> Result<()> {
        self.shut_down(false)
    }

    /// Removes all data and metadata files without a final sync, then stops the queue.
    pub fn delete(self) -> Result<()> {
        self.shut_down(true)
    }

    fn shut_down(self, delete: bool) -> Result<()> {
        let _write_guard = self.exit_lock.write();
        self.exit_flag.store(true, Ordering::SeqCst);

        let (resp_tx, resp_rx) = crossbeam_channel::bounded(0);
        let sent = self.req_tx.send(Request::Shutdown { delete, resp: resp_tx }).is_ok();
        let result = if sent { resp_rx.recv().map_err(|_| QueueError::Exiting)? } else { Ok(()) };

        drop(self.req_tx);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }

        result
    }
}

#[cfg(test)]
mod tests;
