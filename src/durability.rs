//! Flushing, metadata persistence, and reconciliation of corrupt tail state.

use std::sync::atomic::Ordering;

use tracing::{error, warn};

use crate::cursor::Cursor;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::worker::Inner;

impl Inner {
    /// Flushes the write file and atomically rewrites the metadata file. Called on `syncEvery`
    /// cadence, on idle timeout, and whenever a code path sets `needs_sync`.
    pub(crate) fn sync(&mut self) -> Result<()> {
        if let Some(file) = self.write_file.as_ref() {
            if let Err(e) = file.sync_all() {
                self.write_file = None;
                return Err(e.into());
            }
        }

        let meta = Metadata {
            depth: self.depth.load(Ordering::SeqCst),
            read_file_num: self.read_cursor.file_num,
            read_pos: self.read_cursor.pos,
            write_file_num: self.write_cursor.file_num,
            write_pos: self.write_cursor.pos,
        };
        self.files.persist_metadata(&meta)?;
        self.needs_sync = false;
        Ok(())
    }

    /// Reconciles the tail-equal condition: stray depth, or a read cursor that has overtaken
    /// the write cursor. A no-op unless the read cursor has caught up to the write cursor.
    pub(crate) fn check_tail_corruption(&mut self) {
        if self.read_cursor < self.write_cursor {
            return;
        }

        let depth = self.depth.load(Ordering::SeqCst);
        if depth != 0 {
            if depth < 0 {
                error!(depth, "negative depth at queue tail, metadata is corrupt; resetting to zero");
            } else {
                error!(depth, "positive depth at queue tail, data was lost; resetting to zero");
            }
            self.depth.store(0, Ordering::SeqCst);
            self.needs_sync = true;
        }

        if self.read_cursor.file_num > self.write_cursor.file_num || self.read_cursor.pos > self.write_cursor.pos {
            warn!(
                read_file_num = self.read_cursor.file_num,
                read_pos = self.read_cursor.pos,
                write_file_num = self.write_cursor.file_num,
                write_pos = self.write_cursor.pos,
                "read cursor has overtaken write cursor, resetting to an empty tail"
            );
            self.skip_to_next_rw_file();
            self.needs_sync = true;
        }
    }

    /// Closes both handles, removes every file in `[read_file_num, write_file_num]`, and resets
    /// both cursors and depth to a fresh file past the old write frontier.
    pub(crate) fn skip_to_next_rw_file(&mut self) {
        self.read_file = None;
        self.write_file = None;

        if let Some(err) = self
            .files
            .remove_range(self.read_cursor.file_num, self.write_cursor.file_num + 1)
        {
            warn!(error = %err, "failed to remove some files while resetting queue to an empty tail");
        }

        let fresh = Cursor::new(self.write_cursor.file_num + 1, 0);
        self.read_cursor = fresh;
        self.write_cursor = fresh;
        self.next_read_cursor = fresh;
        self.depth.store(0, Ordering::SeqCst);
    }

    /// Discards all pending records: closes handles, removes every data file, and removes the
    /// metadata file (whose absence is not an error).
    pub(crate) fn delete_all_files(&mut self) -> Result<()> {
        if let Some(buf) = self.staged.take() {
            self.pool.release(buf);
        }
        self.skip_to_next_rw_file();
        self.files.remove_metadata()?;
        self.needs_sync = true;
        Ok(())
    }
}
