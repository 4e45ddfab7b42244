//! Bisects over the file-number axis to skip a prefix of records without streaming them to the
//! consumer, then compacts the files that prefix spanned and recomputes depth.

use std::io::{Seek, SeekFrom};
use std::sync::atomic::Ordering;

use byteorder::{BigEndian, ReadBytesExt};
use tracing::warn;

use crate::cursor::Cursor;
use crate::error::Result;
use crate::record;
use crate::worker::{Inner, Predicate};

impl Inner {
    /// Advances the read cursor to the first record for which `predicate` returns `false`,
    /// without delivering any of the skipped records to the consumer.
    ///
    /// The backward bisection branch starts its linear in-file scan from `begin.pos`. That is
    /// only ever the committed read cursor, which is a record boundary by this crate's own
    /// invariants, or a position a prior iteration of this same bisection already confirmed as a
    /// boundary by successfully decoding a record there -- so it should never be a mid-record
    /// offset. `debug_assert!`s that in debug builds; in release builds it instead falls back to
    /// scanning the file from position `0` rather than trusting a `begin.pos` it couldn't decode.
    pub(crate) fn fast_forward(&mut self, mut predicate: Predicate) -> Result<()> {
        let mut buf = self.pool.acquire();

        let mut begin = self.read_cursor;
        let mut curr = begin;
        let mut last_stop = begin;
        let mut end = self.write_cursor;

        loop {
            let len = match self.peek_at(curr, &mut buf) {
                Some(len) => len,
                None => break,
            };

            if !predicate(&buf[..len]) {
                last_stop = curr;
                end = curr;

                if begin.file_num < curr.file_num {
                    curr.file_num = begin.file_num + (curr.file_num - begin.file_num) / 2;
                    if curr.file_num == begin.file_num {
                        curr.pos = begin.pos;
                        if self.peek_at(curr, &mut buf).is_none() {
                            debug_assert!(
                                false,
                                "begin.pos {} in file {} is not a record boundary",
                                begin.pos, begin.file_num
                            );
                            curr.pos = 0;
                        }
                        last_stop = self.linear_scan(curr, &mut predicate, &mut buf);
                        break;
                    }
                    curr.pos = 0;
                    continue;
                }

                break;
            }

            begin = curr;

            if curr.file_num < end.file_num {
                curr.file_num += (end.file_num - curr.file_num + 1) / 2;
                curr.pos = 0;
                continue;
            }

            if curr.file_num == end.file_num && curr.pos < end.pos {
                last_stop = self.linear_scan(curr, &mut predicate, &mut buf);
                break;
            }

            break;
        }

        self.pool.release(buf);
        self.commit_fast_forward(last_stop)
    }

    /// Decodes a single record at `cursor` through an independent file handle, leaving the
    /// loop's own `read_file` untouched, and returns its length. Any failure (missing file,
    /// EOF, framing error) is treated as "no record here" rather than propagated.
    fn peek_at(&self, cursor: Cursor, buf: &mut Vec<u8>) -> Option<usize> {
        let mut file = self.files.open_for_read(cursor.file_num, cursor.pos).ok()?;
        record::decode(&mut file, self.config.min_msg_size(), self.config.max_msg_size(), buf).ok()
    }

    /// Scans forward from `curr` one record at a time while `predicate` keeps returning `true`,
    /// and returns the position immediately after the last record it advanced past.
    fn linear_scan(&self, mut curr: Cursor, predicate: &mut Predicate, buf: &mut Vec<u8>) -> Cursor {
        let mut last_stop = curr;
        loop {
            let len = match self.peek_at(curr, buf) {
                Some(len) => len,
                None => break,
            };
            if !predicate(&buf[..len]) {
                break;
            }
            curr.pos += record::HEADER_LEN + len as u64;
            last_stop = curr;
        }
        last_stop
    }

    fn commit_fast_forward(&mut self, last_stop: Cursor) -> Result<()> {
        if last_stop == self.read_cursor {
            return Ok(());
        }

        if let Some(buf) = self.staged.take() {
            self.pool.release(buf);
        }

        if self.read_cursor.file_num != last_stop.file_num {
            self.read_file = None;
            if self.write_file.is_some() {
                self.sync()?;
            }
            if let Some(err) = self.files.remove_range(self.read_cursor.file_num, last_stop.file_num) {
                warn!(error = %err, "failed to remove some compacted files during fast-forward");
            }
        }

        // Depth must be recomputed whenever the cursor moved at all, not only when it crossed
        // into a new file: a fast-forward that resolves within the current file still skips
        // records, and depth would otherwise go stale until the next file roll happened to true
        // it back up.
        let new_depth = self.depth_in_range(last_stop, self.write_cursor);
        self.depth.store(new_depth, Ordering::SeqCst);

        self.read_cursor = last_stop;
        self.next_read_cursor = last_stop;
        Ok(())
    }

    fn depth_in_range(&self, from: Cursor, write_cursor: Cursor) -> i64 {
        let mut total = 0i64;
        for file_num in from.file_num..=write_cursor.file_num {
            let start_pos = if file_num == from.file_num { from.pos } else { 0 };
            let end_pos: i64 = if file_num == write_cursor.file_num {
                write_cursor.pos as i64
            } else {
                -1
            };
            total += self.depth_in_file(file_num, start_pos, end_pos);
        }
        total
    }

    /// Counts whole records between `start_pos` and `end_pos` (`-1` meaning "to file end")
    /// without ever materializing a payload.
    fn depth_in_file(&self, file_num: u64, start_pos: u64, end_pos: i64) -> i64 {
        let mut file = match self.files.open_for_read(file_num, start_pos) {
            Ok(f) => f,
            Err(_) => return 0,
        };

        let mut pos = start_pos as i64;
        let mut count = 0i64;

        loop {
            if end_pos >= 0 && end_pos - pos < record::HEADER_LEN as i64 {
                break;
            }
            let len = match file.read_i32::<BigEndian>() {
                Ok(len) => len,
                Err(_) => break,
            };
            if len < 0 {
                break;
            }
            if end_pos >= 0 && end_pos - pos - record::HEADER_LEN as i64 < len as i64 {
                break;
            }
            if file.seek(SeekFrom::Current(i64::from(len))).is_err() {
                break;
            }

            pos += record::HEADER_LEN as i64 + i64::from(len);
            count += 1;
        }

        count
    }
}
