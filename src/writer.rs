//! Write path: append a record at the write cursor, roll write files, force a sync at each roll.

use tracing::error;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::record;
use crate::worker::Inner;

impl Inner {
    /// Appends `payload` at the write cursor. Callers are expected to have already validated
    /// `payload`'s length against the configured bounds.
    pub(crate) fn write_one(&mut self, payload: &[u8]) -> Result<()> {
        if self.write_file.is_none() {
            let file = self
                .files
                .open_for_write(self.write_cursor.file_num, self.write_cursor.pos)?;
            self.write_file = Some(file);
        }

        // Encode into a scratch buffer first so a mid-write I/O failure never leaves a partial
        // header on disk.
        let mut encoded = Vec::with_capacity(record::HEADER_LEN as usize + payload.len());
        record::encode(&mut encoded, payload).map_err(std::io::Error::from)?;

        let write_result = {
            let file = self.write_file.as_mut().expect("write file opened above");
            std::io::Write::write_all(file, &encoded)
        };

        if let Err(e) = write_result {
            self.write_file = None;
            return Err(e.into());
        }

        self.write_cursor.pos += encoded.len() as u64;
        self.depth.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if self.write_cursor.pos > self.config.max_bytes_per_file() {
            self.write_cursor = Cursor::new(self.write_cursor.file_num + 1, 0);
            if let Err(e) = self.sync() {
                // A roll-triggered sync failure is logged, not propagated: the producer whose
                // write caused the roll still sees success if the write itself succeeded.
                error!(error = %e, "sync on file roll failed");
            }
            self.write_file = None;
        }

        Ok(())
    }
}
