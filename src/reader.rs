//! Read path: decode the next record, advance the tentative cursor, roll read files.

use tracing::warn;

use crate::cursor::Cursor;
use crate::error::{QueueError, Result};
use crate::record;
use crate::worker::Inner;

impl Inner {
    /// Decodes one record at the tentative read position, advancing `next_read_cursor`.
    ///
    /// Does not touch `read_cursor` -- that only happens once the consumer accepts the record,
    /// in [`Inner::move_forward`].
    pub(crate) fn read_one(&mut self) -> Result<Vec<u8>> {
        if self.read_file.is_none() {
            let file = self
                .files
                .open_for_read(self.next_read_cursor.file_num, self.next_read_cursor.pos)?;
            self.read_file = Some(file);
        }

        let mut buf = self.pool.acquire();
        let read_result = {
            let file = self.read_file.as_mut().expect("read file opened above");
            record::decode(
                file,
                self.config.min_msg_size(),
                self.config.max_msg_size(),
                &mut buf,
            )
        };

        let len = match read_result {
            Ok(len) => len,
            Err(e) => {
                self.read_file = None;
                return Err(QueueError::from(std::io::Error::from(e)));
            }
        };

        buf.truncate(len);

        let mut next = Cursor::new(
            self.next_read_cursor.file_num,
            self.next_read_cursor.pos + record::HEADER_LEN + len as u64,
        );
        if next.pos > self.config.max_bytes_per_file() {
            self.read_file = None;
            next = Cursor::new(next.file_num + 1, 0);
        }
        self.next_read_cursor = next;

        Ok(buf)
    }

    /// Called once the consumer has accepted the staged record.
    pub(crate) fn move_forward(&mut self) {
        let rolled = self.next_read_cursor.file_num != self.read_cursor.file_num;
        let old_file_num = self.read_cursor.file_num;

        self.read_cursor = self.next_read_cursor;
        self.depth.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);

        if rolled {
            self.needs_sync = true;
            if let Some(err) = self.files.remove_range(old_file_num, old_file_num + 1) {
                warn!(file_num = old_file_num, error = %err, "failed to remove rolled-past read file");
            }
        }

        self.check_tail_corruption();
    }

    /// Recovers from an unreadable or malformed record at the read frontier: quarantines the
    /// current read file and advances past it without surfacing the error to any caller.
    pub(crate) fn handle_read_error(&mut self) {
        let bad_file_num = self.next_read_cursor.file_num;

        if bad_file_num == self.write_cursor.file_num {
            self.write_file = None;
            self.write_cursor = Cursor::new(self.write_cursor.file_num + 1, 0);
        }

        self.files.quarantine(bad_file_num);

        self.read_cursor = Cursor::new(bad_file_num + 1, 0);
        self.next_read_cursor = self.read_cursor;
        self.needs_sync = true;

        // Quarantining can land the read cursor exactly on the write cursor (if the bad file was
        // also the active write file, or was the last file before it). Reconcile any stale depth
        // immediately rather than waiting for a delivery that may never come.
        self.check_tail_corruption();
    }
}
