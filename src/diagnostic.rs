//! A read-only (and, with explicit operator opt-in, a narrowly write) view over a queue's
//! persisted state, for use by the `diskqueue-fixer` binary rather than by normal producers or
//! consumers. None of this goes through the I/O loop -- it is meant to be run against a queue
//! directory while no `DiskQueue` has it open.

use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::files::FileStore;
use crate::metadata::{LoadMetadataError, Metadata};
use crate::record;

/// The persisted cursors and depth for a queue, as seen from outside the I/O loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub depth: i64,
    pub read_file_num: u64,
    pub read_pos: u64,
    pub write_file_num: u64,
    pub write_pos: u64,
}

impl From<Metadata> for QueueSnapshot {
    fn from(meta: Metadata) -> Self {
        Self {
            depth: meta.depth,
            read_file_num: meta.read_file_num,
            read_pos: meta.read_pos,
            write_file_num: meta.write_file_num,
            write_pos: meta.write_pos,
        }
    }
}

impl From<QueueSnapshot> for Metadata {
    fn from(snap: QueueSnapshot) -> Self {
        Self {
            depth: snap.depth,
            read_file_num: snap.read_file_num,
            read_pos: snap.read_pos,
            write_file_num: snap.write_file_num,
            write_pos: snap.write_pos,
        }
    }
}

/// Reads `config`'s metadata file without opening any data file. Returns `Ok(None)` for a fresh
/// queue that has never persisted metadata.
pub fn load_snapshot(config: &Config) -> Result<Option<QueueSnapshot>> {
    let files = FileStore::new(config.name().to_owned(), config.data_dir().to_owned());
    match files.load_metadata() {
        Ok(meta) => Ok(Some(meta.into())),
        Err(LoadMetadataError::NotFound) => Ok(None),
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()),
    }
}

/// Forces the read cursor forward by exactly one record and persists the result, mirroring a
/// reader that accepted one record without the queue itself running. Intended for manual
/// recovery when a queue is stuck behind a record an operator has decided to discard; callers are
/// expected to have confirmed the queue process is not running.
pub fn advance_read_cursor_by_one(config: &Config) -> Result<QueueSnapshot> {
    let files = FileStore::new(config.name().to_owned(), config.data_dir().to_owned());
    let meta = match files.load_metadata() {
        Ok(meta) => meta,
        Err(LoadMetadataError::NotFound) => Metadata::default(),
        Err(e) => return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()),
    };

    let read_cursor = Cursor::new(meta.read_file_num, meta.read_pos);
    let mut file = files.open_for_read(read_cursor.file_num, read_cursor.pos)?;
    let mut buf = Vec::new();
    let len = record::decode(&mut file, config.min_msg_size(), config.max_msg_size(), &mut buf)
        .map_err(std::io::Error::from)?;

    let mut next = Cursor::new(read_cursor.file_num, read_cursor.pos + record::HEADER_LEN + len as u64);
    if next.pos > config.max_bytes_per_file() {
        next = Cursor::new(next.file_num + 1, 0);
    }

    let new_meta = Metadata {
        depth: meta.depth - 1,
        read_file_num: next.file_num,
        read_pos: next.pos,
        write_file_num: meta.write_file_num,
        write_pos: meta.write_pos,
    };
    files.persist_metadata(&new_meta)?;
    Ok(new_meta.into())
}
