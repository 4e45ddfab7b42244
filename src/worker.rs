//! The single-threaded I/O loop: the one place that touches cursors and file handles.

use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Select, Sender};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::{QueueError, Result};
use crate::files::FileStore;
use crate::pool::BufferPool;

/// A predicate handed to `fast_forward`: `true` means "keep advancing past this record",
/// `false` means "stop here".
pub type Predicate = Box<dyn FnMut(&[u8]) -> bool + Send>;

pub(crate) enum Request {
    Put {
        payload: Vec<u8>,
        resp: Sender<Result<()>>,
    },
    BufferPoolPut {
        buf: Vec<u8>,
    },
    Empty {
        resp: Sender<Result<()>>,
    },
    FastForward {
        predicate: Predicate,
        resp: Sender<Result<()>>,
    },
    /// Sent by `close`/`delete`. `delete == true` removes all files with no final sync;
    /// `delete == false` performs a final sync before the loop terminates.
    Shutdown {
        delete: bool,
        resp: Sender<Result<()>>,
    },
}

/// All state the I/O loop owns exclusively. Nothing outside this module touches these fields.
pub(crate) struct Inner {
    pub(crate) config: Config,
    pub(crate) files: FileStore,
    pub(crate) pool: Arc<BufferPool>,
    pub(crate) depth: Arc<AtomicI64>,

    pub(crate) read_file: Option<BufReader<File>>,
    pub(crate) write_file: Option<File>,

    pub(crate) read_cursor: Cursor,
    pub(crate) write_cursor: Cursor,
    pub(crate) next_read_cursor: Cursor,

    pub(crate) needs_sync: bool,
    pub(crate) ops_since_sync: u64,

    /// The payload decoded at `next_read_cursor` but not yet accepted by the consumer.
    pub(crate) staged: Option<Vec<u8>>,
}

impl Inner {
    fn has_pending(&self) -> bool {
        self.read_cursor < self.write_cursor
    }
}

/// Spawns the I/O loop on its own OS thread and returns handles for communicating with it.
pub(crate) fn spawn(
    config: Config,
    depth: Arc<AtomicI64>,
    pool: Arc<BufferPool>,
) -> (Sender<Request>, Receiver<Vec<u8>>, JoinHandle<()>) {
    let (req_tx, req_rx) = crossbeam_channel::bounded::<Request>(0);
    let (read_tx, read_rx) = crossbeam_channel::bounded::<Vec<u8>>(0);

    let handle = std::thread::Builder::new()
        .name(format!("diskqueue-{}", config.name()))
        .spawn(move || run(config, depth, pool, req_rx, read_tx))
        .expect("failed to spawn disk queue I/O thread");

    (req_tx, read_rx, handle)
}

fn load_initial_state(files: &FileStore, depth: &Arc<AtomicI64>) -> (Cursor, Cursor) {
    match files.load_metadata() {
        Ok(meta) => {
            depth.store(meta.depth, Ordering::SeqCst);
            (
                Cursor::new(meta.read_file_num, meta.read_pos),
                Cursor::new(meta.write_file_num, meta.write_pos),
            )
        }
        Err(crate::metadata::LoadMetadataError::NotFound) => {
            debug!("no metadata file found, starting fresh queue");
            (Cursor::default(), Cursor::default())
        }
        Err(e) => {
            warn!(error = %e, "failed to load metadata, starting fresh queue");
            (Cursor::default(), Cursor::default())
        }
    }
}

fn run(
    config: Config,
    depth: Arc<AtomicI64>,
    pool: Arc<BufferPool>,
    req_rx: Receiver<Request>,
    read_tx: Sender<Vec<u8>>,
) {
    let files = FileStore::new(config.name().to_owned(), config.data_dir().to_owned());
    let (read_cursor, write_cursor) = load_initial_state(&files, &depth);

    let mut inner = Inner {
        config,
        files,
        pool,
        depth,
        read_file: None,
        write_file: None,
        read_cursor,
        write_cursor,
        next_read_cursor: read_cursor,
        needs_sync: false,
        ops_since_sync: 0,
        staged: None,
    };

    inner.check_tail_corruption();

    let sync_timeout = inner.config.sync_timeout();
    let ticker = crossbeam_channel::tick(sync_timeout);

    info!(name = inner.config.name(), "disk queue I/O loop starting");

    loop {
        if inner.ops_since_sync >= inner.config.sync_every() {
            inner.needs_sync = true;
        }
        if inner.needs_sync {
            if let Err(e) = inner.sync() {
                error!(error = %e, "periodic sync failed");
            }
            inner.ops_since_sync = 0;
        }

        if inner.has_pending() && inner.staged.is_none() {
            match inner.read_one() {
                Ok(payload) => inner.staged = Some(payload),
                Err(e) => {
                    warn!(error = %e, "read error, quarantining and skipping");
                    inner.handle_read_error();
                    continue;
                }
            }
        }

        let mut sel = Select::new();
        let req_idx = sel.recv(&req_rx);
        let tick_idx = sel.recv(&ticker);
        let read_idx = inner.staged.as_ref().map(|_| sel.send(&read_tx));

        let op = sel.select();
        match op.index() {
            i if i == req_idx => match op.recv(&req_rx) {
                Ok(request) => {
                    if !handle_request(&mut inner, request) {
                        break;
                    }
                }
                Err(_) => {
                    debug!("request channel closed, stopping I/O loop");
                    break;
                }
            },
            i if i == tick_idx => {
                let _ = op.recv(&ticker);
                if inner.ops_since_sync > 0 {
                    inner.needs_sync = true;
                }
            }
            i if Some(i) == read_idx => {
                let payload = inner.staged.take().expect("read arm selected without staged record");
                match op.send(&read_tx, payload) {
                    Ok(()) => {
                        inner.ops_since_sync += 1;
                        inner.move_forward();
                    }
                    Err(crossbeam_channel::SendError(payload)) => {
                        inner.staged = Some(payload);
                    }
                }
            }
            _ => unreachable!("select returned an index with no matching arm"),
        }
    }

    info!(name = inner.config.name(), "disk queue I/O loop stopped");
}

/// Processes one request. Returns `false` if the loop should terminate afterward.
fn handle_request(inner: &mut Inner, request: Request) -> bool {
    match request {
        Request::Put { payload, resp } => {
            let result = inner.put_one(payload);
            inner.ops_since_sync += 1;
            let _ = resp.send(result);
            true
        }
        Request::BufferPoolPut { buf } => {
            inner.pool.release(buf);
            true
        }
        Request::Empty { resp } => {
            let result = inner.delete_all_files();
            inner.ops_since_sync = 0;
            let _ = resp.send(result);
            true
        }
        Request::FastForward { predicate, resp } => {
            let result = inner.fast_forward(predicate);
            let _ = resp.send(result);
            true
        }
        Request::Shutdown { delete, resp } => {
            let result = if delete { inner.delete_all_files() } else { inner.sync() };
            let _ = resp.send(result);
            false
        }
    }
}

impl Inner {
    fn put_one(&mut self, payload: Vec<u8>) -> Result<()> {
        let len = payload.len();
        if len < self.config.min_msg_size() as usize || len > self.config.max_msg_size() as usize {
            return Err(QueueError::InvalidMessageSize {
                len,
                min: self.config.min_msg_size(),
                max: self.config.max_msg_size(),
            });
        }
        self.write_one(&payload)
    }
}
